// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use bulwark_cache::DEFAULT_TTL;
use bulwark_store::{DEFAULT_IGNORED_PREFIXES, DEFAULT_LOGGED_SOURCES, Diagnostics, RetryPolicy};
use serde::{Deserialize, Serialize};

/// Settings for [`DataDependencies::bootstrap`][crate::DataDependencies::bootstrap].
///
/// Every field has a default, so a configuration only needs the primary address.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use bulwark::DataConfig;
///
/// let config = DataConfig::from_json(r#"{
///     "primary_address": "mongodb://primary:27017",
///     "backup_addresses": ["mongodb://backup:27017"],
///     "retry": { "max_attempts": 3 }
/// }"#)?;
///
/// assert_eq!(config.retry.max_attempts(), 3);
/// assert_eq!(config.retry.delay(), Duration::from_secs(5));
/// assert_eq!(config.cache.default_ttl(), Duration::from_secs(15 * 60));
/// # Ok::<(), bulwark::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct DataConfig {
    /// Address of the data store every operation runs against first.
    pub primary_address: String,
    /// Addresses of the stores that receive a copy of every successful operation.
    pub backup_addresses: Vec<String>,
    /// Logs storage driver diagnostics at trace level.
    pub debug: bool,
    /// Which storage diagnostics are dropped.
    pub diagnostics: DiagnosticsConfig,
    /// Settings of the document cache.
    pub cache: CacheConfig,
    /// How lost or failed connections are retried.
    pub retry: RetryPolicy,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            primary_address: String::new(),
            backup_addresses: Vec::new(),
            debug: false,
            diagnostics: DiagnosticsConfig::default(),
            cache: CacheConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl DataConfig {
    /// Creates a configuration for `primary_address` with every other setting at its default.
    #[must_use]
    pub fn new(primary_address: impl Into<String>) -> Self {
        Self {
            primary_address: primary_address.into(),
            ..Self::default()
        }
    }

    /// Parses a JSON document and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and any error of [`validate`][Self::validate].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configuration can be used to connect.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty primary or backup address and for a retry policy that allows
    /// no attempt at all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.primary_address.trim().is_empty() {
            return Err(ConfigError::EmptyPrimaryAddress);
        }

        if let Some(index) = self.backup_addresses.iter().position(|a| a.trim().is_empty()) {
            return Err(ConfigError::EmptyBackupAddress { index });
        }

        if self.retry.max_attempts() == 0 {
            return Err(ConfigError::ZeroAttempts);
        }

        Ok(())
    }

    /// The diagnostics filter described by `debug` and `diagnostics`.
    #[must_use]
    pub fn diagnostics_filter(&self) -> Diagnostics {
        Diagnostics::default()
            .enable(self.debug)
            .sources(self.diagnostics.sources.iter().cloned())
            .ignored_prefixes(self.diagnostics.ignored_prefixes.iter().cloned())
    }
}

/// Which storage driver diagnostics are logged when `debug` is on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct DiagnosticsConfig {
    /// Driver components whose messages are logged. Empty means every component.
    pub sources: Vec<String>,
    /// Messages starting with any of these are dropped.
    pub ignored_prefixes: Vec<String>,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_LOGGED_SOURCES.iter().map(|s| (*s).to_string()).collect(),
            ignored_prefixes: DEFAULT_IGNORED_PREFIXES.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

/// Settings of the document cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct CacheConfig {
    /// Time-to-live of cached values, in milliseconds.
    pub default_ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_ms: u64::try_from(DEFAULT_TTL.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl CacheConfig {
    /// [`default_ttl_ms`][Self::default_ttl_ms] as a duration.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }
}

/// Why a [`DataConfig`] was rejected.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The document is not valid JSON or does not match the expected shape.
    #[error("invalid configuration document")]
    Parse(#[from] serde_json::Error),

    /// `primary_address` is missing or blank.
    #[error("the primary address must not be empty")]
    EmptyPrimaryAddress,

    /// An entry of `backup_addresses` is blank.
    #[error("backup address {index} must not be empty")]
    EmptyBackupAddress {
        /// Position of the blank entry.
        index: usize,
    },

    /// `retry.max_attempts` is zero.
    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,
}
