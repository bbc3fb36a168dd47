// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Connections to a primary data store and its backups.
//!
//! A [`ConnectionManager`] opens connections through a [`Connector`], keeps them while they are
//! healthy, and re-opens them with a fixed delay when they fail or are lost. It gives up after a
//! bounded number of consecutive failures, publishes [`ConnectionState::Failed`] and logs a
//! processing error. Only an explicit new [`connect`][ConnectionManager::connect] starts over.
//!
//! Writes go through [`run_with_fanout`][ConnectionManager::run_with_fanout]: the operation runs
//! against the primary and decides the result. Once it succeeded, the same operation is started on
//! every backup in the background. Backup failures are logged with the backup's index and never
//! reach the caller.
//!
//! # Retry policy
//!
//! | Event                          | Effect                                              |
//! |--------------------------------|-----------------------------------------------------|
//! | open succeeds                  | connection ranked by connect order; count reset     |
//! | open fails                     | one failure; retry after the delay                  |
//! | link reports an error or closes| connection removed and closed; one failure; retry   |
//! | failures reach `max_attempts`  | `Failed` published; supervisor stops                |
//!
//! Delays run on the [`Clock`][bulwark_clock::Clock] given to the manager, so tests can drive them
//! with a `ClockControl`.
//!
//! # Events
//!
//! Every event is emitted through the manager's [`Observer`][bulwark_observe::Observer] and is
//! named `store.*`, for example `store.connected`, `store.retry_scheduled`,
//! `store.retry_exhausted` and `store.operation`.

mod connector;
mod diagnostics;
mod error;
mod fanout;
mod manager;
mod resources;
mod retry;
mod state;
mod telemetry;
#[cfg(any(feature = "test-util", test))]
mod testing;

pub use connector::{Connector, LinkEvent};
pub use diagnostics::{DEFAULT_IGNORED_PREFIXES, DEFAULT_LOGGED_SOURCES, Diagnostics};
pub use error::{FanoutError, StoreError};
pub use manager::{ConnectTask, ConnectionManager, ConnectionManagerBuilder};
pub use retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryPolicy};
pub use state::ConnectionState;
#[cfg(any(feature = "test-util", test))]
pub use testing::{FakeConnector, FakeError, FakeHandle};
