// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;
use std::mem;
use std::task::Waker;
use std::time::{Duration, Instant};

/// Identifies a registered one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct TimerKey {
    deadline: Instant,
    // Separates timers that share a deadline.
    sequence: u64,
}

impl TimerKey {
    pub(crate) const fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// One-shot timers ordered by deadline.
///
/// Only controlled clocks register timers; system delays are driven by Tokio.
#[derive(Debug, Default)]
pub(crate) struct Timers {
    wakers: BTreeMap<TimerKey, Waker>,
    next_sequence: u64,
}

impl Timers {
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.wakers.len()
    }

    pub(crate) fn register(&mut self, deadline: Instant, waker: Waker) -> TimerKey {
        self.next_sequence = self.next_sequence.wrapping_add(1);
        let key = TimerKey {
            deadline,
            sequence: self.next_sequence,
        };

        self.wakers.insert(key, waker);
        key
    }

    pub(crate) fn unregister(&mut self, key: TimerKey) {
        self.wakers.remove(&key);
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.wakers.keys().next().map(TimerKey::deadline)
    }

    /// Wakes every timer whose deadline is at or before `now` and returns how many fired.
    pub(crate) fn fire_due(&mut self, now: Instant) -> usize {
        // `split_off` keeps keys strictly greater than the split point in the returned map, so
        // nudge the boundary past `now` to include timers due exactly at `now`.
        let boundary = TimerKey {
            deadline: now.checked_add(Duration::from_nanos(1)).unwrap_or(now),
            sequence: 0,
        };

        let pending = self.wakers.split_off(&boundary);
        let due = mem::replace(&mut self.wakers, pending);
        let fired = due.len();

        for waker in due.into_values() {
            waker.wake();
        }

        fired
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_sharing_a_deadline_get_distinct_keys() {
        let mut timers = Timers::default();
        let deadline = Instant::now() + Duration::from_secs(2);

        let first = timers.register(deadline, Waker::noop().clone());
        let second = timers.register(deadline, Waker::noop().clone());

        assert_ne!(first, second);
        assert_eq!(timers.fire_due(deadline), 2);
        assert_eq!(timers.len(), 0);
    }

    #[test]
    fn fire_due_keeps_future_timers() {
        let mut timers = Timers::default();
        let anchor = Instant::now();

        timers.register(anchor + Duration::from_secs(1), Waker::noop().clone());
        timers.register(anchor + Duration::from_secs(3), Waker::noop().clone());

        assert_eq!(timers.fire_due(anchor + Duration::from_secs(2)), 1);
        assert_eq!(timers.next_deadline(), Some(anchor + Duration::from_secs(3)));
    }

    #[test]
    fn unregister_removes_timer() {
        let mut timers = Timers::default();
        let key = timers.register(Instant::now(), Waker::noop().clone());

        timers.unregister(key);

        assert_eq!(timers.len(), 0);
        assert_eq!(timers.next_deadline(), None);
    }
}
