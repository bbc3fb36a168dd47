// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use bulwark_clock::Clock;
use bulwark_observe::{Attribute, Observer};
use parking_lot::Mutex;

use crate::entry::Entry;
use crate::gate::Gates;
use crate::telemetry::{CACHE_DURATION, CACHE_NAME, CacheActivity, RefreshFailure};
use crate::{CacheStoreBuilder, GetOptions};

/// Time-to-live cache with single-flight refresh.
///
/// See the [crate documentation][crate] for the access rules. Share a store between tasks by
/// wrapping it in an `Arc`.
#[derive(Debug)]
pub struct CacheStore<K, V> {
    name: &'static str,
    entries: Mutex<HashMap<K, Entry<V>>>,
    gates: Gates<K>,
    clock: Clock,
    observer: Observer,
    default_ttl: Duration,
}

/// What an access found, decided under the entries lock.
enum Lookup<V> {
    Fresh(V),
    Stale(V),
    // The caller flipped the guard and must run its supplier.
    Refresh,
    Miss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Load,
    Refresh,
}

impl<K, V> CacheStore<K, V> {
    /// Creates a builder for a store measured against `clock`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bulwark_cache::{CacheStore, DEFAULT_TTL};
    /// use bulwark_clock::Clock;
    ///
    /// let cache = CacheStore::<String, String>::builder(Clock::new_system()).name("users").build();
    ///
    /// assert_eq!(cache.name(), "users");
    /// assert_eq!(cache.default_ttl(), DEFAULT_TTL);
    /// ```
    #[must_use]
    pub fn builder(clock: Clock) -> CacheStoreBuilder<K, V> {
        CacheStoreBuilder::new(clock)
    }

    pub(crate) fn new(name: &'static str, clock: Clock, observer: Observer, default_ttl: Duration) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
            gates: Gates::default(),
            clock,
            observer,
            default_ttl,
        }
    }

    /// The name reported in events.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The time-to-live used when a call does not override it.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// The clock expiry is measured against.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Removes every entry, releasing any refresh guards left taken.
    pub fn clear(&self) {
        let count = {
            let mut entries = self.entries.lock();
            let count = entries.len();
            entries.clear();
            count
        };

        self.record(CacheActivity::Cleared, &[Attribute::new("cache.count", count)]);
    }

    fn record(&self, activity: CacheActivity, extra: &[Attribute]) {
        let attributes: Vec<_> = std::iter::once(Attribute::new(CACHE_NAME, self.name))
            .chain(extra.iter().cloned())
            .collect();
        self.observer.emit(activity.level(), activity.as_str(), &attributes);
    }
}

impl<K, V> CacheStore<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    /// Returns the cached value for `key`, running `supplier` when the value is missing or due
    /// for a refresh.
    ///
    /// A successful result is stored with an expiry of now plus the time-to-live. With
    /// [`GetOptions::refresh_on_access`], every hit on a fresh entry slides its expiry forward.
    ///
    /// # Errors
    ///
    /// Returns the supplier's error when the supplier ran and failed. Nothing is stored in that
    /// case; a failed refresh leaves the stale value in place.
    ///
    /// # Examples
    ///
    /// ```
    /// use bulwark_cache::{CacheStore, GetOptions};
    /// use bulwark_clock::Clock;
    /// # futures::executor::block_on(async {
    ///
    /// let cache = CacheStore::<&str, String>::builder(Clock::new_system()).build();
    ///
    /// let failed = cache.get(&"user", || async { Err::<String, _>("offline") }, GetOptions::default()).await;
    /// assert_eq!(failed, Err("offline"));
    /// assert!(cache.is_empty());
    /// # });
    /// ```
    pub async fn get<E, Fut>(&self, key: &K, supplier: impl FnOnce() -> Fut, options: GetOptions) -> Result<V, E>
    where
        Fut: Future<Output = Result<V, E>>,
    {
        self.resolve(key, supplier, options, |value: &V| Some(value.clone()), |value| value)
            .await
    }

    /// Like [`get`][Self::get], but the supplier may produce no value.
    ///
    /// `None` is never stored and is handed back to the caller. On the refresh path it is treated
    /// like a failure: the stale value stays and the refresh guard is not released.
    ///
    /// # Errors
    ///
    /// Returns the supplier's error when the supplier ran and failed.
    ///
    /// # Examples
    ///
    /// ```
    /// use bulwark_cache::{CacheStore, GetOptions};
    /// use bulwark_clock::Clock;
    /// # futures::executor::block_on(async {
    ///
    /// let cache = CacheStore::<&str, u32>::builder(Clock::new_system()).build();
    ///
    /// let missing = cache.get_optional(&"a", || async { Ok::<_, ()>(None) }, GetOptions::default()).await;
    /// assert_eq!(missing, Ok(None));
    /// assert!(cache.is_empty());
    /// # });
    /// ```
    pub async fn get_optional<E, Fut>(&self, key: &K, supplier: impl FnOnce() -> Fut, options: GetOptions) -> Result<Option<V>, E>
    where
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        self.resolve(key, supplier, options, |value: &Option<V>| value.clone(), Some)
            .await
    }

    /// Deletes the entry for `key` and reports whether one existed.
    pub fn remove(&self, key: &K) -> bool {
        let removed = self.entries.lock().remove(key).is_some();

        if removed {
            self.record(CacheActivity::Removed, &[]);
        }

        removed
    }

    async fn resolve<T, E, Fut>(
        &self,
        key: &K,
        supplier: impl FnOnce() -> Fut,
        options: GetOptions,
        stored: impl Fn(&T) -> Option<V>,
        cached: impl Fn(V) -> T,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let ttl = options.ttl_override().unwrap_or(self.default_ttl);
        let refresh_on_access = options.is_refresh_on_access();

        match self.lookup(key, ttl, refresh_on_access) {
            Lookup::Fresh(value) | Lookup::Stale(value) => return Ok(cached(value)),
            Lookup::Refresh => return self.supply(key, supplier, ttl, &stored, Phase::Refresh).await,
            Lookup::Miss => self.record(CacheActivity::Miss, &[]),
        }

        // Whoever held the gate before us may have stored the value already.
        let _gate = self.gates.acquire(key).await;

        match self.lookup(key, ttl, refresh_on_access) {
            Lookup::Fresh(value) | Lookup::Stale(value) => Ok(cached(value)),
            Lookup::Refresh => self.supply(key, supplier, ttl, &stored, Phase::Refresh).await,
            Lookup::Miss => self.supply(key, supplier, ttl, &stored, Phase::Load).await,
        }
    }

    fn lookup(&self, key: &K, ttl: Duration, refresh_on_access: bool) -> Lookup<V> {
        let now = self.clock.elapsed();

        let lookup = match self.entries.lock().get_mut(key) {
            None => Lookup::Miss,
            Some(entry) if !entry.is_expired(now) => {
                if refresh_on_access {
                    entry.slide(now, ttl);
                }
                Lookup::Fresh(entry.value.clone())
            }
            Some(entry) if entry.refreshable => {
                entry.refreshable = false;
                Lookup::Refresh
            }
            Some(entry) => Lookup::Stale(entry.value.clone()),
        };

        match &lookup {
            Lookup::Fresh(_) => self.record(CacheActivity::Hit, &[]),
            Lookup::Refresh => {
                self.record(CacheActivity::Expired, &[]);
                self.record(CacheActivity::RefreshLocked, &[]);
            }
            Lookup::Stale(_) => {
                self.record(CacheActivity::Expired, &[]);
                self.record(CacheActivity::Stale, &[]);
            }
            Lookup::Miss => {}
        }

        lookup
    }

    async fn supply<T, E, Fut>(
        &self,
        key: &K,
        supplier: impl FnOnce() -> Fut,
        ttl: Duration,
        stored: &impl Fn(&T) -> Option<V>,
        phase: Phase,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let timed = self.clock.timed(supplier()).await;
        let duration = Attribute::new(CACHE_DURATION, timed.duration);

        match timed.result {
            Ok(output) => {
                if let Some(value) = stored(&output) {
                    self.store(key, value, ttl);
                    self.record(CacheActivity::Inserted, &[duration]);
                } else if phase == Phase::Refresh {
                    self.record(CacheActivity::RefreshFailed, &[duration, RefreshFailure::Empty.attribute()]);
                }
                Ok(output)
            }
            Err(error) => {
                if phase == Phase::Refresh {
                    self.record(CacheActivity::RefreshFailed, &[duration, RefreshFailure::Error.attribute()]);
                }
                Err(error)
            }
        }
    }

    fn store(&self, key: &K, value: V, ttl: Duration) {
        let now = self.clock.elapsed();
        self.entries.lock().insert(key.clone(), Entry::new(value, now, ttl));
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bulwark_clock::ClockControl;
    use bulwark_observe::{Recorder, Sink};
    use futures::executor::block_on;

    use super::*;

    fn store_with(control: &ClockControl, recorder: &Recorder) -> CacheStore<&'static str, &'static str> {
        CacheStore::builder(control.to_clock())
            .name("test")
            .observer(Observer::new(Sink::Recording(recorder.clone()), control.to_clock()))
            .build()
    }

    async fn ok(value: &'static str) -> Result<&'static str, &'static str> {
        Ok(value)
    }

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(CacheStore<String, String>: Send, Sync);
    }

    #[test]
    fn miss_then_hit_events() {
        let control = ClockControl::new();
        let recorder = Recorder::new();
        let cache = store_with(&control, &recorder);

        block_on(async {
            cache.get(&"k", || ok("A"), GetOptions::default()).await.unwrap();
            cache.get(&"k", || ok("B"), GetOptions::default()).await.unwrap();
        });

        let names: Vec<_> = recorder.events().iter().map(|e| e.name).collect();
        assert_eq!(names, ["cache.miss", "cache.inserted", "cache.hit"]);
        assert_eq!(
            recorder.single("cache.inserted").attribute(CACHE_NAME).and_then(|v| v.as_str()),
            Some("test")
        );
    }

    #[test]
    fn refresh_locks_guard_until_supplier_returns() {
        let control = ClockControl::new();
        let recorder = Recorder::new();
        let cache = store_with(&control, &recorder);

        block_on(async {
            cache.get(&"k", || ok("A"), GetOptions::default()).await.unwrap();
            control.advance(DEFAULT_TTL_PLUS_ONE);

            let value = cache
                .get(
                    &"k",
                    || async {
                        // The guard is taken while the supplier runs.
                        assert!(!cache.entries.lock()[&"k"].refreshable);
                        Ok::<_, &str>("B")
                    },
                    GetOptions::default(),
                )
                .await;

            assert_eq!(value, Ok("B"));
            assert!(cache.entries.lock()[&"k"].refreshable);
        });

        assert!(recorder.contains("cache.refresh_locked"));
    }

    #[test]
    fn failed_refresh_keeps_guard_taken() {
        let control = ClockControl::new();
        let recorder = Recorder::new();
        let cache = store_with(&control, &recorder);

        block_on(async {
            cache.get(&"k", || ok("A"), GetOptions::default()).await.unwrap();
            control.advance(DEFAULT_TTL_PLUS_ONE);

            let failed = cache.get(&"k", || async { Err("down") }, GetOptions::default()).await;
            assert_eq!(failed, Err("down"));
        });

        assert!(!cache.entries.lock()[&"k"].refreshable);
        let event = recorder.single("cache.refresh_failed");
        assert_eq!(event.attribute("cache.reason").and_then(|v| v.as_str()), Some("supplier failed"));
    }

    #[test]
    fn clear_releases_everything() {
        let control = ClockControl::new();
        let recorder = Recorder::new();
        let cache = store_with(&control, &recorder);
        let calls = AtomicUsize::new(0);

        block_on(async {
            for key in ["a", "b"] {
                cache
                    .get(
                        &key,
                        || async {
                            calls.fetch_add(1, Ordering::SeqCst);
                            ok(key).await
                        },
                        GetOptions::default(),
                    )
                    .await
                    .unwrap();
            }
        });

        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(recorder.single("cache.cleared").attribute("cache.count").and_then(|v| v.as_u64()), Some(2));
    }

    const DEFAULT_TTL_PLUS_ONE: Duration = Duration::from_secs(15 * 60 + 1);
}
