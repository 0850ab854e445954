use std::time::Duration;

use sabercat::{CacheConfig, CacheStore, ConfigError};
use tower::Layer;

use crate::service::CacheService;

/// Tower layer that caches full `200 OK` responses by request path.
///
/// The layer owns the store; every service it produces, and every clone of
/// those services, reads and writes the same entries.
#[derive(Clone, Debug)]
pub struct Cache {
    config: CacheConfig,
    store: Option<CacheStore>,
}

impl Cache {
    /// Validates `config` and creates a layer with a fresh store for it.
    ///
    /// A zero `ttl` produces a layer that only passes requests through.
    pub fn new(config: CacheConfig) -> Result<Self, ConfigError> {
        Self::builder().config(config).build()
    }

    /// Creates a new builder.
    pub fn builder() -> CacheBuilder {
        CacheBuilder::default()
    }

    /// Configuration the layer was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Shared store, or `None` when caching is disabled.
    pub fn store(&self) -> Option<&CacheStore> {
        self.store.as_ref()
    }
}

impl<S> Layer<S> for Cache {
    type Service = CacheService<S>;

    fn layer(&self, upstream: S) -> Self::Service {
        CacheService::new(upstream, self.store.clone(), self.config.policy())
    }
}

/// Fluent builder for [`Cache`].
///
/// ```
/// use std::time::Duration;
/// use sabercat_tower::Cache;
///
/// let layer = Cache::builder()
///     .ttl(Duration::from_secs(60))
///     .max_cacheable_size(8 * 1024 * 1024)
///     .build()
///     .unwrap();
/// assert!(layer.store().is_some());
/// ```
#[derive(Debug, Default)]
pub struct CacheBuilder {
    config: CacheConfig,
    store: Option<CacheStore>,
}

impl CacheBuilder {
    /// Sets the entry lifetime. Zero disables caching.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.ttl = ttl;
        self
    }

    /// Sets the largest cacheable `Content-Length`.
    pub fn max_cacheable_size(mut self, bytes: u64) -> Self {
        self.config.max_cacheable_size = bytes;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses an existing store, e.g. one shared with another layer.
    ///
    /// The configured TTL must match the store's.
    pub fn store(mut self, store: CacheStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Validates the configuration and builds the layer.
    pub fn build(self) -> Result<Cache, ConfigError> {
        self.config.validate()?;
        if !self.config.is_enabled() {
            return Ok(Cache {
                config: self.config,
                store: None,
            });
        }

        let store = match self.store {
            Some(store) if store.ttl() != self.config.ttl => {
                return Err(ConfigError::TtlMismatch {
                    store: store.ttl(),
                    config: self.config.ttl,
                });
            }
            Some(store) => store,
            None => CacheStore::new(self.config.ttl),
        };

        Ok(Cache {
            config: self.config,
            store: Some(store),
        })
    }
}
