// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Resilient data access for services that read through a cache and write to replicated stores.
//!
//! This crate wires the bulwark building blocks together from one [`DataConfig`]:
//!
//! - [`CacheStore`] serves values for a time-to-live and refreshes expired ones lazily, running at
//!   most one refresh per key. A failed refresh keeps serving the stale value.
//! - [`ConnectionManager`] supervises the primary and backup connections, retries with a fixed
//!   delay up to a hard cap and runs operations on the primary before copying them to backups.
//! - [`Observer`] carries structured events of both to `tracing`.
//! - [`Clock`] is the single source of time, replaceable by a `ClockControl` in tests.
//!
//! # Examples
//!
//! ```no_run
//! # use std::convert::Infallible;
//! # use bulwark::{Connector, LinkEvent};
//! # use futures::stream::{self, Pending};
//! # struct MyDriver;
//! # impl Connector for MyDriver {
//! #     type Handle = String;
//! #     type Error = Infallible;
//! #     type Events = Pending<LinkEvent>;
//! #     async fn open(&self, address: &str) -> Result<(String, Self::Events), Infallible> {
//! #         Ok((address.to_string(), stream::pending()))
//! #     }
//! #     async fn close(&self, _handle: String) -> Result<(), Infallible> { Ok(()) }
//! # }
//! use bulwark::{Clock, DataConfig, DataDependencies, GetOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DataConfig::from_json(r#"{"primary_address": "mongodb://primary:27017"}"#)?;
//! let deps = DataDependencies::bootstrap(&config, MyDriver, Clock::new_system())?;
//!
//! let users = deps
//!     .cache()
//!     .get(&"users".to_string(), || async { Ok::<_, Infallible>(serde_json::json!(["ada"])) }, GetOptions::default())
//!     .await?;
//!
//! let written = deps.store().run(|db| async move { Ok::<_, Infallible>(db.len()) }).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod dependencies;

pub use bulwark_cache::{CacheStore, CacheStoreBuilder, DEFAULT_TTL, GetOptions};
#[cfg(feature = "test-util")]
pub use bulwark_clock::ClockControl;
pub use bulwark_clock::{Clock, DurationExt};
pub use bulwark_observe::{Attribute, Level, Observer, PROCESSING_ERROR_MESSAGE, Sink, Value};
pub use bulwark_store::{
    ConnectTask, ConnectionManager, ConnectionManagerBuilder, ConnectionState, Connector, Diagnostics, FanoutError, LinkEvent,
    RetryPolicy, StoreError,
};
pub use config::{CacheConfig, ConfigError, DataConfig, DiagnosticsConfig};
pub use dependencies::{DataDependencies, DocumentCache};
