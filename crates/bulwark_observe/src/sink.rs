// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

use crate::attribute::DisplayAttributes;
use crate::observer::DisplayTags;
use crate::{Attribute, Level};

/// Destination of the events emitted by an [`Observer`][crate::Observer].
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Sink {
    /// Forwards events to the `tracing` subscriber installed by the host.
    Tracing,
    /// Discards every event.
    Silent,
    /// Keeps every event in memory.
    #[cfg(any(feature = "test-util", test))]
    Recording(crate::Recorder),
}

impl Sink {
    pub(crate) fn emit(&self, level: Level, tags: &[Cow<'static, str>], name: &'static str, attributes: &[Attribute]) {
        match self {
            Self::Tracing => emit_tracing(level, tags, name, attributes),
            Self::Silent => {}
            #[cfg(any(feature = "test-util", test))]
            Self::Recording(recorder) => recorder.record(level, tags, name, attributes),
        }
    }
}

fn emit_tracing(level: Level, tags: &[Cow<'static, str>], name: &'static str, attributes: &[Attribute]) {
    let tags = DisplayTags(tags);
    let attributes = DisplayAttributes(attributes);

    // Tracing level must be constant, so the level is selected by macro arm.
    macro_rules! emit_event {
        ($level:ident) => {
            tracing::$level!(observer.tags = %tags, observer.attributes = %attributes, "{name}")
        };
    }

    match level {
        Level::Trace => emit_event!(trace),
        Level::Info => emit_event!(info),
        Level::Warn => emit_event!(warn),
        Level::Error => emit_event!(error),
    }
}
