// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Attempts per failure lineage when nothing else is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Pause between two connection attempts when nothing else is configured.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How a connection is re-established after it fails or is lost.
///
/// Every failed open and every lost link counts as one failure. A successful open starts a new
/// lineage. After `max_attempts` consecutive failures the supervisor gives up for good.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bulwark_store::RetryPolicy;
///
/// let policy = RetryPolicy::new(3, Duration::from_secs(1));
///
/// assert_eq!(policy.max_attempts(), 3);
/// assert_eq!(RetryPolicy::default().delay(), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    max_attempts: u32,
    #[serde(rename = "delay_ms", with = "millis")]
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy that tolerates `max_attempts` consecutive failures, pausing `delay` before
    /// each retry.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Consecutive failures tolerated, counting the first one.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The fixed pause before each retry.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub(crate) fn first_attempt(self) -> Attempt {
        Attempt::new(0, self.max_attempts <= 1)
    }
}

/// Position of a connection attempt inside its failure lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Attempt {
    index: u32,
    is_last: bool,
}

impl Attempt {
    #[must_use]
    pub fn new(index: u32, is_last: bool) -> Self {
        Self { index, is_last }
    }

    /// Zero-based position of the attempt.
    #[must_use]
    pub fn index(self) -> u32 {
        self.index
    }

    /// Whether a failure of this attempt ends the lineage.
    #[must_use]
    pub fn is_last(self) -> bool {
        self.is_last
    }

    /// The attempt that follows a failure of this one, or `None` once the cap is reached.
    pub(crate) fn increment(self, max_attempts: u32) -> Option<Self> {
        let next = self.index.saturating_add(1);

        if next >= max_attempts {
            return None;
        }

        Some(Self::new(next, next == max_attempts.saturating_sub(1)))
    }
}

impl Display for Attempt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.index.fmt(f)
    }
}

/// Counts consecutive failures of one connection.
#[derive(Debug)]
pub(crate) struct Lineage {
    policy: RetryPolicy,
    attempt: Attempt,
}

impl Lineage {
    pub(crate) fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempt: policy.first_attempt(),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.attempt = self.policy.first_attempt();
    }

    /// Records a failure of the current attempt and returns the next one, if any is left.
    pub(crate) fn fail(&mut self) -> Option<Attempt> {
        let next = self.attempt.increment(self.policy.max_attempts)?;
        self.attempt = next;
        Some(next)
    }

    /// Number of failures recorded since the lineage started, counting the current attempt.
    pub(crate) fn failures(&self) -> u32 {
        self.attempt.index.saturating_add(1)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn defaults() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay(), Duration::from_secs(5));
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(5)]
    fn lineage_allows_exactly_max_attempts(#[case] max_attempts: u32) {
        let mut lineage = Lineage::new(RetryPolicy::new(max_attempts, DEFAULT_RETRY_DELAY));
        let mut attempts = 1;

        while lineage.fail().is_some() {
            attempts += 1;
        }

        assert_eq!(attempts, max_attempts);
        assert_eq!(lineage.failures(), max_attempts);
    }

    #[test]
    fn zero_cap_still_allows_the_first_attempt() {
        let mut lineage = Lineage::new(RetryPolicy::new(0, DEFAULT_RETRY_DELAY));

        assert_eq!(lineage.fail(), None);
        assert_eq!(lineage.failures(), 1);
    }

    #[test]
    fn last_attempt_is_marked() {
        let mut lineage = Lineage::new(RetryPolicy::new(3, DEFAULT_RETRY_DELAY));

        assert_eq!(lineage.fail(), Some(Attempt::new(1, false)));
        assert_eq!(lineage.fail(), Some(Attempt::new(2, true)));
        assert_eq!(lineage.fail(), None);
    }

    #[test]
    fn reset_starts_a_new_lineage() {
        let mut lineage = Lineage::new(RetryPolicy::new(2, DEFAULT_RETRY_DELAY));

        assert!(lineage.fail().is_some());
        lineage.reset();

        assert_eq!(lineage.failures(), 1);
        assert!(lineage.fail().is_some());
        assert!(lineage.fail().is_none());
    }

    #[test]
    fn deserializes_with_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"delay_ms": 250}"#).unwrap();

        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay(), Duration::from_millis(250));
    }

    #[test]
    fn serializes_delay_in_millis() {
        let json = serde_json::to_value(RetryPolicy::default()).unwrap();

        assert_eq!(json, serde_json::json!({"max_attempts": 5, "delay_ms": 5000}));
    }

    #[test]
    fn attempt_displays_index() {
        assert_eq!(Attempt::new(2, false).to_string(), "2");
    }
}
