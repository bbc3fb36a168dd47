// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;
// A month is a fixed 30 days.
const SECS_PER_MONTH: u64 = 30 * SECS_PER_DAY;

/// Unit conversions for [`Duration`].
///
/// Constructors saturate at [`Duration::MAX`] instead of overflowing.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bulwark_clock::DurationExt;
///
/// assert_eq!(Duration::minutes(15), Duration::from_secs(900));
/// assert_eq!(Duration::months(1), Duration::days(30));
/// assert_eq!(Duration::hours(36).as_days(), 1);
/// ```
pub trait DurationExt {
    /// Creates a duration of `minutes` minutes.
    fn minutes(minutes: u64) -> Self;

    /// Creates a duration of `hours` hours.
    fn hours(hours: u64) -> Self;

    /// Creates a duration of `days` days.
    fn days(days: u64) -> Self;

    /// Creates a duration of `months` months of 30 days each.
    fn months(months: u64) -> Self;

    /// Returns the number of whole minutes.
    fn as_minutes(&self) -> u64;

    /// Returns the number of whole hours.
    fn as_hours(&self) -> u64;

    /// Returns the number of whole days.
    fn as_days(&self) -> u64;
}

fn from_units(count: u64, secs_per_unit: u64) -> Duration {
    count.checked_mul(secs_per_unit).map_or(Duration::MAX, Duration::from_secs)
}

#[expect(clippy::integer_division, reason = "whole units are intended")]
impl DurationExt for Duration {
    fn minutes(minutes: u64) -> Self {
        from_units(minutes, SECS_PER_MINUTE)
    }

    fn hours(hours: u64) -> Self {
        from_units(hours, SECS_PER_HOUR)
    }

    fn days(days: u64) -> Self {
        from_units(days, SECS_PER_DAY)
    }

    fn months(months: u64) -> Self {
        from_units(months, SECS_PER_MONTH)
    }

    fn as_minutes(&self) -> u64 {
        self.as_secs() / SECS_PER_MINUTE
    }

    fn as_hours(&self) -> u64 {
        self.as_secs() / SECS_PER_HOUR
    }

    fn as_days(&self) -> u64 {
        self.as_secs() / SECS_PER_DAY
    }
}
