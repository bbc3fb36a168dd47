// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use bulwark_cache::CacheStore;
use bulwark_clock::Clock;
use bulwark_observe::{Attribute, Observer, Sink};
use bulwark_store::{ConnectTask, ConnectionManager, Connector};

use crate::{ConfigError, DataConfig};

/// Cache of JSON documents keyed by name.
pub type DocumentCache = CacheStore<String, serde_json::Value>;

/// The data-access services of a process, created once at startup and passed to call sites.
///
/// Events of the cache are tagged `cache` and events of the connection manager are tagged `db`.
/// Both go to the host's `tracing` subscriber.
#[derive(Debug)]
pub struct DataDependencies<C: Connector> {
    observer: Observer,
    cache: DocumentCache,
    store: ConnectionManager<C>,
    connections: Vec<ConnectTask>,
}

impl<C: Connector> DataDependencies<C> {
    /// Validates `config`, builds the services and starts connecting the primary, then each backup.
    ///
    /// Connecting happens in the background; use [`ConnectionManager::subscribe`] on
    /// [`store`][Self::store] to wait for it.
    ///
    /// # Errors
    ///
    /// Returns the error of [`DataConfig::validate`]. Nothing is connected in that case.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn bootstrap(config: &DataConfig, connector: C, clock: Clock) -> Result<Self, ConfigError> {
        config.validate()?;

        let observer = Observer::new(Sink::Tracing, clock.clone());

        let cache = CacheStore::builder(clock.clone())
            .name("documents")
            .default_ttl(config.cache.default_ttl())
            .observer(observer.scoped("cache"))
            .build();

        let store = ConnectionManager::builder(connector, clock)
            .observer(observer.scoped("db"))
            .retry_policy(config.retry)
            .diagnostics(config.diagnostics_filter())
            .build();

        let connections = std::iter::once(&config.primary_address)
            .chain(&config.backup_addresses)
            .map(|address| store.connect(address.as_str()))
            .collect();

        observer.info(
            "bulwark.bootstrapped",
            &[Attribute::new("backups", config.backup_addresses.len())],
        );

        Ok(Self {
            observer,
            cache,
            store,
            connections,
        })
    }

    /// The untagged root observer.
    #[must_use]
    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// The document cache, tagged `cache`.
    #[must_use]
    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// The connection manager, tagged `db`.
    #[must_use]
    pub fn store(&self) -> &ConnectionManager<C> {
        &self.store
    }

    /// The supervisors started by [`bootstrap`][Self::bootstrap], primary first.
    #[must_use]
    pub fn connections(&self) -> &[ConnectTask] {
        &self.connections
    }

    /// Closes every connection and stops every supervisor.
    pub async fn shutdown(&self) {
        self.store.disconnect().await;
        self.observer.info("bulwark.shut_down", &[]);
    }
}
