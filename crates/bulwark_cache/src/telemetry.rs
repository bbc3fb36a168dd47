// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bulwark_observe::{Attribute, Level};

pub(crate) const CACHE_NAME: &str = "cache.name";
pub(crate) const CACHE_DURATION: &str = "cache.duration";
pub(crate) const CACHE_REASON: &str = "cache.reason";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Miss,
    Hit,
    Expired,
    RefreshLocked,
    Stale,
    Inserted,
    RefreshFailed,
    Removed,
    Cleared,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Miss => "cache.miss",
            Self::Hit => "cache.hit",
            Self::Expired => "cache.expired",
            Self::RefreshLocked => "cache.refresh_locked",
            Self::Stale => "cache.stale",
            Self::Inserted => "cache.inserted",
            Self::RefreshFailed => "cache.refresh_failed",
            Self::Removed => "cache.removed",
            Self::Cleared => "cache.cleared",
        }
    }

    pub fn level(self) -> Level {
        match self {
            Self::Miss | Self::Hit | Self::RefreshLocked | Self::Stale => Level::Trace,
            Self::Expired | Self::Inserted | Self::Removed | Self::Cleared => Level::Info,
            Self::RefreshFailed => Level::Warn,
        }
    }
}

/// Why a refresh did not replace the stale value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefreshFailure {
    Error,
    Empty,
}

impl RefreshFailure {
    pub fn attribute(self) -> Attribute {
        let reason = match self {
            Self::Error => "supplier failed",
            Self::Empty => "supplier returned no value",
        };
        Attribute::new(CACHE_REASON, reason)
    }
}
