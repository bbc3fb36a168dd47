// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

/// Driver messages that are never logged, even with diagnostics enabled.
pub const DEFAULT_IGNORED_PREFIXES: &[&str] = &["schedule getMore call"];

/// Driver components whose diagnostics are logged.
pub const DEFAULT_LOGGED_SOURCES: &[&str] = &["Db", "Cursor"];

/// Decides which [`LinkEvent::Diagnostic`][crate::LinkEvent::Diagnostic] messages are logged.
///
/// Diagnostics are off by default. When enabled, a message is logged at trace level if it comes
/// from one of the logged sources and does not start with one of the ignored prefixes. An empty
/// source list admits every source.
///
/// # Examples
///
/// ```
/// use bulwark_store::Diagnostics;
///
/// let diagnostics = Diagnostics::enabled();
///
/// assert!(diagnostics.admits("Db", "collection users"));
/// assert!(!diagnostics.admits("Server", "heartbeat succeeded"));
/// assert!(!diagnostics.admits("Cursor", "schedule getMore call on cursor 7"));
/// assert!(!Diagnostics::default().admits("Db", "collection users"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Diagnostics {
    enabled: bool,
    sources: Vec<String>,
    ignored_prefixes: Vec<String>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            enabled: false,
            sources: DEFAULT_LOGGED_SOURCES.iter().map(|s| (*s).to_string()).collect(),
            ignored_prefixes: DEFAULT_IGNORED_PREFIXES.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

impl Diagnostics {
    /// Diagnostics with the default ignore list, switched on.
    #[must_use]
    pub fn enabled() -> Self {
        Self::default().enable(true)
    }

    /// Switches diagnostics on or off.
    #[must_use]
    pub fn enable(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Replaces the logged sources. Pass an empty list to log every source.
    #[must_use]
    pub fn sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the ignored prefixes.
    #[must_use]
    pub fn ignored_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Whether diagnostics are logged at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns `true` if `message`, emitted by the driver component `source`, should be logged.
    #[must_use]
    pub fn admits(&self, source: &str, message: &str) -> bool {
        self.enabled
            && (self.sources.is_empty() || self.sources.iter().any(|s| s == source))
            && !self.ignored_prefixes.iter().any(|prefix| message.starts_with(prefix.as_str()))
    }
}
