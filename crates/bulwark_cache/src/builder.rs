// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::marker::PhantomData;
use std::time::Duration;

use bulwark_clock::Clock;
use bulwark_observe::Observer;

use crate::CacheStore;

/// Time-to-live used when neither the builder nor the call sets one: 15 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Builds a [`CacheStore`].
///
/// Created by [`CacheStore::builder`].
#[derive(Debug)]
pub struct CacheStoreBuilder<K, V> {
    name: &'static str,
    clock: Clock,
    observer: Option<Observer>,
    default_ttl: Duration,
    _phantom: PhantomData<fn() -> (K, V)>,
}

impl<K, V> CacheStoreBuilder<K, V> {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            name: "default",
            clock,
            observer: None,
            default_ttl: DEFAULT_TTL,
            _phantom: PhantomData,
        }
    }

    /// Names the store in emitted events.
    #[must_use]
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Sets the time-to-live applied when a call does not override it.
    #[must_use]
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the observer that receives `cache.*` events. Events are discarded when unset.
    #[must_use]
    pub fn observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Builds the store.
    #[must_use]
    pub fn build(self) -> CacheStore<K, V> {
        let observer = self.observer.unwrap_or_else(Observer::silent);
        CacheStore::new(self.name, self.clock, observer, self.default_ttl)
    }
}
