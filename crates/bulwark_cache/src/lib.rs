// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! In-process time-to-live cache with lazy, single-flight refresh.
//!
//! [`CacheStore`] memoizes the result of an expensive asynchronous supplier per key. Each entry
//! lives for a time-to-live measured on the store's [`Clock`][bulwark_clock::Clock]; expiry is only
//! checked when a key is accessed and there is no background sweep.
//!
//! # Access rules
//!
//! | Entry state                     | Outcome                                                   |
//! |---------------------------------|-----------------------------------------------------------|
//! | absent                          | the supplier runs, its result is stored                   |
//! | fresh                           | the cached value is returned, expiry optionally slides    |
//! | expired, no refresh in flight   | this caller refreshes; the value is overwritten on success |
//! | expired, refresh in flight      | the stale value is returned without waiting               |
//!
//! Concurrent misses for one key are coalesced: the first caller runs its supplier and the rest
//! wait for it, then observe the stored value. Failures are never cached and never shared.
//!
//! A refresh that fails or yields nothing leaves the entry's refresh guard taken. The stale value
//! keeps being served and no other refresh starts for that key until it is removed with
//! [`CacheStore::remove`] or [`CacheStore::clear`].
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use bulwark_cache::{CacheStore, GetOptions};
//! use bulwark_clock::Clock;
//! # futures::executor::block_on(async {
//!
//! let cache = CacheStore::<String, u64>::builder(Clock::new_system())
//!     .default_ttl(Duration::from_secs(60))
//!     .build();
//!
//! let key = "answer".to_string();
//! let value = cache.get(&key, || async { Ok::<_, std::io::Error>(42) }, GetOptions::default()).await?;
//! assert_eq!(value, 42);
//!
//! // The supplier does not run again while the entry is fresh.
//! let value = cache.get(&key, || async { Ok::<_, std::io::Error>(7) }, GetOptions::default()).await?;
//! assert_eq!(value, 42);
//! # Ok::<(), std::io::Error>(())
//! # });
//! ```

mod builder;
mod entry;
mod gate;
mod options;
mod store;
mod telemetry;

pub use builder::{CacheStoreBuilder, DEFAULT_TTL};
pub use options::GetOptions;
pub use store::CacheStore;
