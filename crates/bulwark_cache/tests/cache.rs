// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for the TTL and single-flight behavior of `CacheStore`.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bulwark_cache::{CacheStore, GetOptions};
use bulwark_clock::{ClockControl, DurationExt};
use bulwark_observe::{Observer, Recorder, Sink};
use futures::executor::block_on;

type Store = CacheStore<String, String>;

fn store(control: &ClockControl) -> Store {
    CacheStore::builder(control.to_clock()).default_ttl(Duration::minutes(15)).build()
}

fn key() -> String {
    "users".to_string()
}

/// A supplier that counts its invocations and yields `value`.
fn counted(calls: &AtomicUsize, value: &'static str) -> impl Future<Output = Result<String, Infallible>> {
    calls.fetch_add(1, Ordering::SeqCst);
    async move { Ok(value.to_string()) }
}

#[test]
fn unknown_key_runs_supplier_once() {
    let control = ClockControl::new();
    let cache = store(&control);
    let calls = AtomicUsize::new(0);

    let value = block_on(cache.get(&key(), || counted(&calls, "A"), GetOptions::default())).unwrap();

    assert_eq!(value, "A");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn fresh_entry_ignores_new_supplier() {
    let control = ClockControl::new();
    let cache = store(&control);
    let calls = AtomicUsize::new(0);

    block_on(async {
        let first = cache.get(&key(), || counted(&calls, "A"), GetOptions::default()).await.unwrap();
        control.advance(Duration::minutes(5));
        let second = cache.get(&key(), || counted(&calls, "B"), GetOptions::default()).await.unwrap();

        assert_eq!(first, "A");
        assert_eq!(second, "A");
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn refresh_on_access_slides_expiry() {
    let control = ClockControl::new();
    let cache = store(&control);
    let calls = AtomicUsize::new(0);
    let sliding = GetOptions::default().refresh_on_access(true);

    block_on(async {
        // Expires at 15 minutes.
        assert_eq!(cache.get(&key(), || counted(&calls, "A"), sliding).await.unwrap(), "A");

        // At 7 minutes the expiry moves to 22 minutes.
        control.advance(Duration::minutes(7));
        assert_eq!(cache.get(&key(), || counted(&calls, "B"), sliding).await.unwrap(), "A");

        // At 16 minutes the first deadline has passed but the extended one has not.
        control.advance(Duration::minutes(9));
        assert_eq!(cache.get(&key(), || counted(&calls, "C"), GetOptions::default()).await.unwrap(), "A");
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn without_refresh_on_access_expiry_stays() {
    let control = ClockControl::new();
    let cache = store(&control);
    let calls = AtomicUsize::new(0);

    block_on(async {
        cache.get(&key(), || counted(&calls, "A"), GetOptions::default()).await.unwrap();
        control.advance(Duration::minutes(7));
        cache.get(&key(), || counted(&calls, "B"), GetOptions::default()).await.unwrap();
        control.advance(Duration::minutes(9));

        let value = cache.get(&key(), || counted(&calls, "C"), GetOptions::default()).await.unwrap();
        assert_eq!(value, "C");
    });

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn expired_entry_refreshes_exactly_once() {
    let control = ClockControl::new();
    let cache = store(&control);
    let calls = AtomicUsize::new(0);

    block_on(async {
        cache.get(&key(), || counted(&calls, "A"), GetOptions::default()).await.unwrap();
        control.advance(Duration::minutes(16));

        let refreshed = cache.get(&key(), || counted(&calls, "B"), GetOptions::default()).await.unwrap();
        let after = cache.get(&key(), || counted(&calls, "C"), GetOptions::default()).await.unwrap();

        assert_eq!(refreshed, "B");
        assert_eq!(after, "B");
    });

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn expiry_boundary_is_inclusive() {
    let control = ClockControl::new();
    let cache = store(&control);
    let calls = AtomicUsize::new(0);

    block_on(async {
        cache.get(&key(), || counted(&calls, "A"), GetOptions::default()).await.unwrap();
        control.advance(Duration::minutes(15));

        let value = cache.get(&key(), || counted(&calls, "B"), GetOptions::default()).await.unwrap();
        assert_eq!(value, "B");
    });
}

#[test]
fn per_call_ttl_overrides_default() {
    let control = ClockControl::new();
    let cache = store(&control);
    let calls = AtomicUsize::new(0);
    let short = GetOptions::default().ttl(Duration::from_secs(10));

    block_on(async {
        cache.get(&key(), || counted(&calls, "A"), short).await.unwrap();
        control.advance(Duration::from_secs(11));

        let value = cache.get(&key(), || counted(&calls, "B"), short).await.unwrap();
        assert_eq!(value, "B");
    });
}

#[test]
fn remove_reports_presence() {
    let control = ClockControl::new();
    let cache = store(&control);
    let calls = AtomicUsize::new(0);

    assert!(!cache.remove(&"unknown".to_string()));

    block_on(async {
        cache.get(&key(), || counted(&calls, "A"), GetOptions::default()).await.unwrap();
        assert!(cache.remove(&key()));
        assert!(!cache.remove(&key()));

        let value = cache.get(&key(), || counted(&calls, "B"), GetOptions::default()).await.unwrap();
        assert_eq!(value, "B");
    });

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn supplier_failure_is_not_cached() {
    let control = ClockControl::new();
    let cache = store(&control);

    block_on(async {
        let failed = cache.get(&key(), || async { Err::<String, _>("unreachable") }, GetOptions::default()).await;
        assert_eq!(failed, Err("unreachable"));
        assert!(cache.is_empty());

        let value = cache.get(&key(), || async { Ok::<_, &str>("A".to_string()) }, GetOptions::default()).await;
        assert_eq!(value, Ok("A".to_string()));
    });
}

#[test]
fn failed_refresh_serves_stale_until_removed() {
    let control = ClockControl::new();
    let recorder = Recorder::new();
    let cache: Store = CacheStore::builder(control.to_clock())
        .observer(Observer::new(Sink::Recording(recorder.clone()), control.to_clock()).scoped("cache"))
        .build();
    let calls = AtomicUsize::new(0);

    block_on(async {
        cache.get(&key(), || counted(&calls, "A"), GetOptions::default()).await.unwrap();
        control.advance(Duration::minutes(16));

        let failed = cache
            .get(
                &key(),
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("timeout")
                },
                GetOptions::default(),
            )
            .await;
        assert_eq!(failed, Err("timeout"));

        // The guard stays taken, so later callers get the stale value and no supplier runs.
        for _ in 0..3 {
            control.advance(Duration::minutes(16));
            let value = cache.get(&key(), || async { Ok::<_, &str>(unreachable_value()) }, GetOptions::default()).await;
            assert_eq!(value, Ok("A".to_string()));
        }

        assert!(cache.remove(&key()));
        let value = cache.get(&key(), || counted(&calls, "B"), GetOptions::default()).await.unwrap();
        assert_eq!(value, "B");
    });

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(recorder.count("cache.refresh_failed"), 1);
    assert_eq!(recorder.count("cache.stale"), 3);
    assert!(recorder.events().iter().all(|e| e.tags == ["cache"]));
}

#[expect(clippy::panic, reason = "marks a supplier that must never run")]
fn unreachable_value() -> String {
    panic!("supplier must not run while the refresh guard is taken")
}

#[test]
fn empty_refresh_keeps_stale_value() {
    let control = ClockControl::new();
    let cache: CacheStore<String, u32> = CacheStore::builder(control.to_clock()).build();

    block_on(async {
        let first = cache.get_optional(&key(), || async { Ok::<_, Infallible>(Some(1)) }, GetOptions::default()).await;
        assert_eq!(first, Ok(Some(1)));

        control.advance(Duration::minutes(16));
        let empty = cache.get_optional(&key(), || async { Ok::<_, Infallible>(None) }, GetOptions::default()).await;
        assert_eq!(empty, Ok(None));

        let stale = cache.get_optional(&key(), || async { Ok::<_, Infallible>(Some(2)) }, GetOptions::default()).await;
        assert_eq!(stale, Ok(Some(1)));
    });
}

#[test]
fn empty_load_is_not_cached() {
    let control = ClockControl::new();
    let cache: CacheStore<String, u32> = CacheStore::builder(control.to_clock()).build();

    block_on(async {
        let empty = cache.get_optional(&key(), || async { Ok::<_, Infallible>(None) }, GetOptions::default()).await;
        assert_eq!(empty, Ok(None));
        assert!(cache.is_empty());

        let value = cache.get_optional(&key(), || async { Ok::<_, Infallible>(Some(5)) }, GetOptions::default()).await;
        assert_eq!(value, Ok(Some(5)));
    });
}

#[tokio::test]
async fn concurrent_misses_run_one_supplier() {
    let control = ClockControl::new();
    let cache = Arc::new(store(&control));
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get(
                        &key(),
                        || async {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            Ok::<_, Infallible>("A".to_string())
                        },
                        GetOptions::default(),
                    )
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), Ok("A".to_string()));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn waiter_loads_after_leader_fails() {
    let control = ClockControl::new();
    let cache = store(&control);
    let leader_key = key();

    let leader = cache.get(
        &leader_key,
        || async {
            tokio::task::yield_now().await;
            Err("leader failed")
        },
        GetOptions::default(),
    );
    let follower = async {
        tokio::task::yield_now().await;
        cache.get(&key(), || async { Ok::<_, &str>("B".to_string()) }, GetOptions::default()).await
    };

    let (leader, follower) = futures::join!(leader, follower);

    assert_eq!(leader, Err("leader failed"));
    assert_eq!(follower, Ok("B".to_string()));
}
