// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, Instant};

use crate::Clock;

/// Measures elapsed time against a [`Clock`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bulwark_clock::Clock;
///
/// let clock = Clock::new_system();
/// let stopwatch = clock.stopwatch();
///
/// assert!(stopwatch.elapsed() < Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct Stopwatch {
    clock: Clock,
    start: Instant,
}

impl Stopwatch {
    /// Starts a stopwatch at the clock's current instant.
    #[must_use]
    pub fn new(clock: &Clock) -> Self {
        Self {
            clock: clock.clone(),
            start: clock.instant(),
        }
    }

    /// Returns the time that has passed since the stopwatch started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.clock.instant().saturating_duration_since(self.start)
    }
}

impl From<Stopwatch> for Instant {
    fn from(stopwatch: Stopwatch) -> Self {
        stopwatch.start
    }
}
