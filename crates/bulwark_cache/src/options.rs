// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Per-call options for [`CacheStore::get`][crate::CacheStore::get].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bulwark_cache::GetOptions;
///
/// let options = GetOptions::default().ttl(Duration::from_secs(30)).refresh_on_access(true);
/// assert_eq!(options.ttl_override(), Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    ttl: Option<Duration>,
    refresh_on_access: bool,
}

impl GetOptions {
    /// Overrides the store's default time-to-live for values written by this call.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Slides the expiry of a fresh entry forward on every hit.
    #[must_use]
    pub fn refresh_on_access(mut self, enabled: bool) -> Self {
        self.refresh_on_access = enabled;
        self
    }

    /// The time-to-live override, if any.
    #[must_use]
    pub fn ttl_override(&self) -> Option<Duration> {
        self.ttl
    }

    /// Whether a hit slides the entry's expiry.
    #[must_use]
    pub fn is_refresh_on_access(&self) -> bool {
        self.refresh_on_access
    }
}
