// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Attribute, Level, Value};

/// An event captured by a [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Severity of the event.
    pub level: Level,
    /// Name of the event.
    pub name: &'static str,
    /// Tags of the observer that emitted the event.
    pub tags: Vec<String>,
    /// Attributes attached to the event.
    pub attributes: Vec<Attribute>,
}

impl RecordedEvent {
    /// Returns the value of the first attribute named `key`.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.iter().find(|a| a.key() == key).map(Attribute::value)
    }
}

/// Keeps emitted events in memory so tests can assert on them.
///
/// Available only with the `test-util` feature. Clones share the same buffer.
///
/// # Examples
///
/// ```
/// use bulwark_clock::Clock;
/// use bulwark_observe::{Observer, Recorder, Sink};
///
/// let recorder = Recorder::new();
/// let observer = Observer::new(Sink::Recording(recorder.clone()), Clock::new_frozen());
///
/// observer.info("cache.miss", &[]);
///
/// assert_eq!(recorder.count("cache.miss"), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl Recorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every recorded event, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().clone()
    }

    /// Returns every recorded event named `name`, oldest first.
    #[must_use]
    pub fn named(&self, name: &str) -> Vec<RecordedEvent> {
        self.events.lock().iter().filter(|e| e.name == name).cloned().collect()
    }

    /// Returns how many events named `name` were recorded.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| e.name == name).count()
    }

    /// Returns whether at least one event named `name` was recorded.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.count(name) > 0
    }

    /// Returns the only event named `name`.
    ///
    /// # Panics
    ///
    /// Panics if there is not exactly one such event.
    #[must_use]
    #[expect(clippy::panic, reason = "test helper that reports assertion failures")]
    pub fn single(&self, name: &str) -> RecordedEvent {
        let mut matching = self.named(name);
        if matching.len() != 1 {
            panic!("expected exactly one '{name}' event, got {}: {:?}", matching.len(), self.events());
        }
        matching.remove(0)
    }

    /// Removes every recorded event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    pub(crate) fn record(&self, level: Level, tags: &[Cow<'static, str>], name: &'static str, attributes: &[Attribute]) {
        self.events.lock().push(RecordedEvent {
            level,
            name,
            tags: tags.iter().map(ToString::to_string).collect(),
            attributes: attributes.to_vec(),
        });
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(Recorder: Send, Sync, Clone);
    }

    #[test]
    fn clones_share_events() {
        let recorder = Recorder::new();
        let clone = recorder.clone();

        clone.record(Level::Info, &[Cow::Borrowed("db")], "store.connected", &[]);

        assert!(recorder.contains("store.connected"));
        assert_eq!(recorder.single("store.connected").tags, ["db"]);

        recorder.clear();
        assert!(clone.events().is_empty());
    }

    #[test]
    #[should_panic]
    fn single_panics_on_duplicates() {
        let recorder = Recorder::new();
        recorder.record(Level::Info, &[], "cache.miss", &[]);
        recorder.record(Level::Info, &[], "cache.miss", &[]);

        let _ = recorder.single("cache.miss");
    }
}
