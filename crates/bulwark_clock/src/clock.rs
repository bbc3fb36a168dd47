// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use crate::{Delay, Stopwatch, Timed};

/// Provides the time-related operations consumed by the cache and the connection manager.
///
/// The clock answers two different questions:
///
/// - *What time is it?* [`system_time`][Self::system_time] returns the wall-clock time in UTC. It is
///   used for timestamps attached to log events and can jump when the operating system adjusts
///   its clock.
/// - *How much time has passed?* [`instant`][Self::instant] and [`elapsed`][Self::elapsed] are
///   monotonic. Cache expiry and operation timings are always computed from these.
///
/// Cloning a clock is inexpensive and every clone shares the same underlying state. With the
/// `test-util` feature, a clock created from a `ClockControl` observes every adjustment made
/// through that control.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bulwark_clock::Clock;
///
/// let clock = Clock::new_system();
///
/// let time1 = clock.system_time();
/// let time2 = clock.system_time();
/// assert!(time2 >= time1);
///
/// let stopwatch = clock.stopwatch();
/// assert!(stopwatch.elapsed() < Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct Clock(Arc<ClockState>);

#[derive(Debug)]
pub(crate) enum ClockState {
    System { origin: Instant },
    #[cfg(any(feature = "test-util", test))]
    ClockControl(crate::ClockControl),
}

impl Clock {
    /// Creates a clock backed by the operating system.
    ///
    /// Delays created from this clock are driven by the Tokio timer, so they must be awaited
    /// inside a Tokio runtime with the time driver enabled.
    #[must_use]
    pub fn new_system() -> Self {
        Self(Arc::new(ClockState::System { origin: Instant::now() }))
    }

    /// Creates a frozen clock.
    ///
    /// Equivalent to `ClockControl::new().to_clock()`. Time does not move unless the control is
    /// advanced, so a frozen clock created this way can never be advanced; use a `ClockControl`
    /// directly when the test needs to move time.
    #[cfg(any(feature = "test-util", test))]
    #[must_use]
    pub fn new_frozen() -> Self {
        crate::ClockControl::new().to_clock()
    }

    #[cfg(any(feature = "test-util", test))]
    pub(crate) fn with_control(control: &crate::ClockControl) -> Self {
        Self(Arc::new(ClockState::ClockControl(control.clone())))
    }

    /// Retrieves the current wall-clock time.
    ///
    /// > **Note**: The system time is not monotonic. For measurements, use
    /// > [`stopwatch`][Self::stopwatch] or [`instant`][Self::instant].
    #[must_use]
    pub fn system_time(&self) -> SystemTime {
        match self.state() {
            ClockState::System { .. } => SystemTime::now(),
            #[cfg(any(feature = "test-util", test))]
            ClockState::ClockControl(control) => control.system_time(),
        }
    }

    /// Retrieves the current monotonic [`Instant`].
    ///
    /// > **Important**: Compare instants with [`Instant::saturating_duration_since`] rather than
    /// > `Instant::elapsed`, which bypasses the clock and ignores controlled time.
    #[must_use]
    pub fn instant(&self) -> Instant {
        match self.state() {
            ClockState::System { .. } => Instant::now(),
            #[cfg(any(feature = "test-util", test))]
            ClockState::ClockControl(control) => control.instant(),
        }
    }

    /// Returns the monotonic time that has passed since this clock was created.
    ///
    /// This is the elapsed-time counter used as the time base for expiry decisions.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        match self.state() {
            ClockState::System { origin } => Instant::now().saturating_duration_since(*origin),
            #[cfg(any(feature = "test-util", test))]
            ClockState::ClockControl(control) => control.elapsed(),
        }
    }

    /// Creates a [`Delay`] that completes after `duration` has passed on this clock.
    ///
    /// A zero duration completes immediately.
    #[must_use]
    pub fn delay(&self, duration: Duration) -> Delay {
        Delay::new(self, duration)
    }

    /// Creates a [`Stopwatch`] that starts measuring from the current instant.
    #[must_use]
    pub fn stopwatch(&self) -> Stopwatch {
        Stopwatch::new(self)
    }

    /// Awaits `future` and reports how long it took according to this clock.
    ///
    /// # Examples
    ///
    /// ```
    /// use bulwark_clock::Clock;
    /// # futures::executor::block_on(async {
    ///
    /// let clock = Clock::new_system();
    /// let timed = clock.timed(async { 42 }).await;
    ///
    /// assert_eq!(timed.result, 42);
    /// # });
    /// ```
    pub async fn timed<F, R>(&self, future: F) -> Timed<R>
    where
        F: Future<Output = R>,
    {
        let stopwatch = self.stopwatch();
        let result = future.await;

        Timed {
            result,
            duration: stopwatch.elapsed(),
        }
    }

    pub(crate) fn state(&self) -> &ClockState {
        self.0.as_ref()
    }
}

impl AsRef<Self> for Clock {
    fn as_ref(&self) -> &Self {
        self
    }
}
