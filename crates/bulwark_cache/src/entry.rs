// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// A cached value.
///
/// `expiry` is an offset on the store clock's elapsed-time counter.
#[derive(Debug)]
pub(crate) struct Entry<V> {
    pub(crate) value: V,
    pub(crate) expiry: Duration,
    // Single-flight guard: false while a refresh for this key has been started.
    pub(crate) refreshable: bool,
}

impl<V> Entry<V> {
    pub(crate) fn new(value: V, now: Duration, ttl: Duration) -> Self {
        Self {
            value,
            expiry: now.saturating_add(ttl),
            refreshable: true,
        }
    }

    pub(crate) fn is_expired(&self, now: Duration) -> bool {
        self.expiry <= now
    }

    pub(crate) fn slide(&mut self, now: Duration, ttl: Duration) {
        self.expiry = now.saturating_add(ttl);
    }
}
