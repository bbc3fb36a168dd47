// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use bulwark_clock::Clock;

use crate::{Attribute, Sink};

/// Payload text attached by [`Observer::processing_error`].
pub const PROCESSING_ERROR_MESSAGE: &str = "error while processing data, please take appropriate action";

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Fine-grained diagnostics.
    Trace,
    /// Normal operation.
    Info,
    /// Something went wrong but was recovered from.
    Warn,
    /// Something went wrong and needs attention.
    Error,
}

impl Level {
    /// Returns the lowercase name of the level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emits leveled, tag-scoped structured events.
///
/// Cloning an observer is cheap. Scoping creates a new observer that shares the sink and the clock
/// and carries one extra tag.
///
/// # Examples
///
/// ```
/// use bulwark_clock::Clock;
/// use bulwark_observe::{Attribute, Observer, Sink};
///
/// let observer = Observer::new(Sink::Silent, Clock::new_system()).scoped("cache");
///
/// assert_eq!(observer.tags(), ["cache"]);
/// observer.trace("cache.hit", &[Attribute::new("key", "users")]);
/// ```
#[derive(Debug, Clone)]
pub struct Observer {
    tags: Arc<[Cow<'static, str>]>,
    sink: Sink,
    clock: Clock,
}

impl Observer {
    /// Creates a root observer without tags.
    #[must_use]
    pub fn new(sink: Sink, clock: Clock) -> Self {
        Self {
            tags: Arc::from([]),
            sink,
            clock,
        }
    }

    /// Creates an observer that discards every event.
    #[must_use]
    pub fn silent() -> Self {
        Self::new(Sink::Silent, Clock::new_system())
    }

    /// Creates a sub-observer whose events carry `tag` after the tags of this observer.
    #[must_use]
    pub fn scoped(&self, tag: impl Into<Cow<'static, str>>) -> Self {
        let tags: Arc<[Cow<'static, str>]> = self.tags.iter().cloned().chain(std::iter::once(tag.into())).collect();

        Self {
            tags,
            sink: self.sink.clone(),
            clock: self.clock.clone(),
        }
    }

    /// The tags attached to every event emitted by this observer.
    #[must_use]
    pub fn tags(&self) -> &[Cow<'static, str>] {
        &self.tags
    }

    /// The clock used to timestamp processing errors.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Emits an event at `level`.
    pub fn emit(&self, level: Level, name: &'static str, attributes: &[Attribute]) {
        self.sink.emit(level, &self.tags, name, attributes);
    }

    /// Emits a trace event.
    pub fn trace(&self, name: &'static str, attributes: &[Attribute]) {
        self.emit(Level::Trace, name, attributes);
    }

    /// Emits an info event.
    pub fn info(&self, name: &'static str, attributes: &[Attribute]) {
        self.emit(Level::Info, name, attributes);
    }

    /// Emits a warning event.
    pub fn warn(&self, name: &'static str, attributes: &[Attribute]) {
        self.emit(Level::Warn, name, attributes);
    }

    /// Emits an error event.
    pub fn error(&self, name: &'static str, attributes: &[Attribute]) {
        self.emit(Level::Error, name, attributes);
    }

    /// Emits an error event that asks an operator to act on a failure while processing data.
    ///
    /// The event carries `attributes` followed by a `message` of [`PROCESSING_ERROR_MESSAGE`] and
    /// a `date` with the clock's current wall-clock time in RFC 3339 format.
    pub fn processing_error(&self, name: &'static str, attributes: &[Attribute]) {
        let date = jiff::Timestamp::try_from(self.clock.system_time()).map_or_else(|_| String::from("unknown"), |ts| ts.to_string());

        let mut payload = Vec::with_capacity(attributes.len() + 2);
        payload.extend_from_slice(attributes);
        payload.push(Attribute::new("message", PROCESSING_ERROR_MESSAGE));
        payload.push(Attribute::new("date", date));

        self.error(name, &payload);
    }
}

/// Renders tags joined by `/`.
pub(crate) struct DisplayTags<'a>(pub(crate) &'a [Cow<'static, str>]);

impl Display for DisplayTags<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, tag) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("/")?;
            }
            f.write_str(tag)?;
        }
        Ok(())
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use bulwark_clock::ClockControl;

    use super::*;
    use crate::Recorder;

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(Observer: Send, Sync, Clone);
    }

    #[test]
    fn scoped_accumulates_tags() {
        let root = Observer::silent();
        let nested = root.scoped("service").scoped("db");

        assert!(root.tags().is_empty());
        assert_eq!(nested.tags(), ["service", "db"]);
        assert_eq!(DisplayTags(nested.tags()).to_string(), "service/db");
    }

    #[test]
    fn events_carry_level_name_and_tags() {
        let recorder = Recorder::new();
        let observer = Observer::new(Sink::Recording(recorder.clone()), Clock::new_frozen()).scoped("cache");

        observer.trace("cache.hit", &[]);
        observer.info("cache.inserted", &[Attribute::new("key", "a")]);
        observer.warn("cache.refresh_failed", &[]);
        observer.error("cache.broken", &[]);

        let events = recorder.events();
        let levels: Vec<_> = events.iter().map(|e| e.level).collect();
        assert_eq!(levels, [Level::Trace, Level::Info, Level::Warn, Level::Error]);
        assert_eq!(events[1].name, "cache.inserted");
        assert_eq!(events[1].tags, ["cache"]);
        assert_eq!(events[1].attribute("key").and_then(|v| v.as_str()), Some("a"));
    }

    #[test]
    fn processing_error_appends_message_and_date() {
        let control = ClockControl::new_at(SystemTime::UNIX_EPOCH + Duration::from_secs(86_400));
        let recorder = Recorder::new();
        let observer = Observer::new(Sink::Recording(recorder.clone()), control.to_clock());

        observer.processing_error("store.write_failed", &[Attribute::new("collection", "users")]);

        let event = recorder.single("store.write_failed");
        assert_eq!(event.level, Level::Error);
        assert_eq!(event.attribute("collection").and_then(|v| v.as_str()), Some("users"));
        assert_eq!(event.attribute("message").and_then(|v| v.as_str()), Some(PROCESSING_ERROR_MESSAGE));
        assert_eq!(event.attribute("date").and_then(|v| v.as_str()), Some("1970-01-02T00:00:00Z"));
    }

    #[test]
    fn level_names() {
        assert_eq!(Level::Trace.to_string(), "trace");
        assert_eq!(Level::Error.as_str(), "error");
        assert!(Level::Warn > Level::Info);
    }
}
