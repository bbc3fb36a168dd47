// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::task::Waker;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;

use crate::Clock;
use crate::timers::{TimerKey, Timers};

/// Controls the flow of time for clocks created from it.
///
/// A new control starts with the wall-clock time frozen at the UNIX epoch and the monotonic
/// time frozen at the moment of construction. Time only moves when [`advance`][Self::advance]
/// is called, or, with [`auto_advance_timers`][Self::auto_advance_timers] enabled, whenever a
/// delay is waiting on a future deadline.
///
/// Available only with the `test-util` feature.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bulwark_clock::ClockControl;
///
/// let control = ClockControl::new();
/// let clock = control.to_clock();
///
/// let stopwatch = clock.stopwatch();
/// control.advance(Duration::from_secs(30));
///
/// assert_eq!(stopwatch.elapsed(), Duration::from_secs(30));
/// ```
///
/// Retry loops can be driven to completion without real waiting:
///
/// ```
/// use std::time::Duration;
///
/// use bulwark_clock::ClockControl;
/// # futures::executor::block_on(async {
///
/// let clock = ClockControl::new().auto_advance_timers(true).to_clock();
///
/// clock.delay(Duration::from_secs(3600)).await;
/// assert_eq!(clock.elapsed(), Duration::from_secs(3600));
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClockControl {
    state: Arc<Mutex<State>>,
}

impl ClockControl {
    /// Creates a new control with time frozen at the UNIX epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new control whose wall-clock time starts at `system_time`.
    ///
    /// The monotonic time base is unaffected; [`Clock::elapsed`] still starts at zero.
    #[must_use]
    pub fn new_at(system_time: SystemTime) -> Self {
        let this = Self::new();
        this.with_state(|s| s.system_time = system_time);
        this
    }

    /// Creates a clock that observes this control.
    #[must_use]
    pub fn to_clock(&self) -> Clock {
        Clock::with_control(self)
    }

    /// Enables or disables automatic advancement to pending delay deadlines.
    ///
    /// When enabled, registering a delay moves time forward to its deadline straight away, so
    /// code that sleeps between retries runs to completion instantly.
    #[must_use]
    pub fn auto_advance_timers(self, enabled: bool) -> Self {
        self.with_state(|s| {
            s.auto_advance_timers = enabled;
            s.evaluate_timers();
        });
        self
    }

    /// Moves time forward by `millis` milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Moves time forward by `duration`, firing every delay whose deadline has passed.
    pub fn advance(&self, duration: Duration) {
        self.with_state(|s| s.advance(duration));
    }

    pub(crate) fn system_time(&self) -> SystemTime {
        self.with_state(|s| s.system_time)
    }

    pub(crate) fn instant(&self) -> Instant {
        self.with_state(|s| s.instant)
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.with_state(|s| s.instant.saturating_duration_since(s.origin))
    }

    pub(crate) fn register_timer(&self, deadline: Instant, waker: Waker) -> TimerKey {
        self.with_state(|s| {
            let key = s.timers.register(deadline, waker);
            s.evaluate_timers();
            key
        })
    }

    pub(crate) fn unregister_timer(&self, key: TimerKey) {
        self.with_state(|s| s.timers.unregister(key));
    }

    #[cfg(test)]
    pub(crate) fn timers_len(&self) -> usize {
        self.with_state(|s| s.timers.len())
    }

    fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut State) -> R,
    {
        f(&mut self.state.lock())
    }
}

impl From<ClockControl> for Clock {
    fn from(control: ClockControl) -> Self {
        control.to_clock()
    }
}

impl From<&ClockControl> for Clock {
    fn from(control: &ClockControl) -> Self {
        control.to_clock()
    }
}

#[derive(Debug)]
struct State {
    origin: Instant,
    instant: Instant,
    system_time: SystemTime,
    timers: Timers,
    auto_advance_timers: bool,
}

impl Default for State {
    fn default() -> Self {
        let now = Instant::now();

        Self {
            origin: now,
            instant: now,
            system_time: SystemTime::UNIX_EPOCH,
            timers: Timers::default(),
            auto_advance_timers: false,
        }
    }
}

impl State {
    fn advance(&mut self, duration: Duration) {
        if duration == Duration::ZERO {
            return;
        }

        // Saturate at the representable range instead of panicking inside a test helper.
        if let (Some(instant), Some(system_time)) = (self.instant.checked_add(duration), self.system_time.checked_add(duration)) {
            self.instant = instant;
            self.system_time = system_time;
        }

        self.evaluate_timers();
    }

    fn evaluate_timers(&mut self) {
        self.timers.fire_due(self.instant);

        if !self.auto_advance_timers {
            return;
        }

        while let Some(next) = self.timers.next_deadline() {
            let step = next.saturating_duration_since(self.instant);

            if step == Duration::ZERO {
                self.timers.fire_due(self.instant);
                continue;
            }

            self.instant = next;
            self.system_time = self.system_time.checked_add(step).unwrap_or(self.system_time);
            self.timers.fire_due(self.instant);
        }
    }
}
