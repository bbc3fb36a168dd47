// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(
    test,
    allow(
        clippy::arithmetic_side_effects,
        clippy::unchecked_time_subtraction,
        reason = "allow these lints in tests to improve the readability of the tests"
    )
)]

//! Time primitives shared by the bulwark cache and connection manager.
//!
//! Both core components need two views of time: an absolute wall-clock timestamp for
//! log payloads, and a monotonic counter for expiry and operation timing. Retries also
//! need to wait. [`Clock`] provides all three behind one cheap, cloneable handle so the
//! passage of time can be replaced wholesale in tests.
//!
//! # Overview
//!
//! - [`Clock`] - absolute time via [`Clock::system_time`], monotonic time via
//!   [`Clock::instant`] and [`Clock::elapsed`], delays via [`Clock::delay`].
//! - [`Stopwatch`] - measures elapsed time against a clock.
//! - [`Delay`] - a future that completes once the clock has moved past a deadline.
//! - [`Timed`] - the output of [`Clock::timed`], a value paired with how long it took.
//! - [`DurationExt`] - unit conversions (`minutes`, `hours`, `days`, `months`).
//! - `ClockControl` - manual control over time, available with the `test-util` feature.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use bulwark_clock::{Clock, DurationExt};
//!
//! # fn measure(clock: &Clock) {
//! let ttl = Duration::minutes(15);
//! let deadline = clock.instant() + ttl;
//!
//! let stopwatch = clock.stopwatch();
//! // Perform some operation...
//! let took = stopwatch.elapsed();
//! # let _ = (deadline, took);
//! # }
//! ```
//!
//! # Testing
//!
//! With the `test-util` feature, `ClockControl` freezes time at the UNIX epoch and lets
//! tests move it forward explicitly. Delays registered against a controlled clock complete
//! when time is advanced past their deadline, or immediately when
//! `ClockControl::auto_advance_timers` is enabled.
//!
//! > **Important:** Never enable the `test-util` feature for production code. Only use it in
//! > your `dev-dependencies`.

mod clock;
#[cfg(any(feature = "test-util", test))]
mod clock_control;
mod delay;
mod duration_ext;
mod stopwatch;
mod timed;
#[cfg(any(feature = "test-util", test))]
mod timers;

pub use clock::Clock;
#[cfg(any(feature = "test-util", test))]
pub use clock_control::ClockControl;
pub use delay::Delay;
pub use duration_ext::DurationExt;
pub use stopwatch::Stopwatch;
pub use timed::Timed;
