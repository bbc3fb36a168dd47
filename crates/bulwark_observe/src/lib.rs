// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Leveled, tag-scoped structured events.
//!
//! An [`Observer`] is the logging capability handed to the cache and the connection manager. Every
//! event carries a static name, a list of [`Attribute`]s and the tags of the observer that emitted
//! it. Sub-observers created with [`Observer::scoped`] accumulate tags, so an event emitted by the
//! connection manager of a service reads as `service/db`.
//!
//! Emitting an event never fails and never returns a value. Where events end up is decided by the
//! [`Sink`]:
//!
//! - [`Sink::Tracing`] forwards events to the `tracing` subscriber installed by the host.
//! - [`Sink::Silent`] discards everything.
//! - `Sink::Recording` keeps events in memory for assertions (requires the `test-util` feature).
//!
//! With `test-util`, `LogCapture` collects what the `tracing` sink printed.
//!
//! # Examples
//!
//! ```
//! use bulwark_clock::Clock;
//! use bulwark_observe::{Attribute, Observer, Sink};
//!
//! let root = Observer::new(Sink::Tracing, Clock::new_system());
//! let db = root.scoped("db");
//!
//! db.info("store.connected", &[Attribute::new("address", "primary:27017")]);
//! db.warn("store.retry_scheduled", &[Attribute::new("attempt", 2_u64)]);
//! ```

mod attribute;
mod observer;
#[cfg(any(feature = "test-util", test))]
mod recorder;
mod sink;
#[cfg(any(feature = "test-util", test))]
mod testing;

pub use attribute::{Attribute, Value};
pub use observer::{Level, Observer, PROCESSING_ERROR_MESSAGE};
#[cfg(any(feature = "test-util", test))]
pub use recorder::{RecordedEvent, Recorder};
pub use sink::Sink;
#[cfg(any(feature = "test-util", test))]
pub use testing::{LogCapture, LogCaptureWriter};
