//! Construction-time cache configuration.
//!
//! `ttl` accepts humantime strings when deserialized (`"30s"`, `"5m"`,
//! `"1h 30m"`). A zero TTL turns the cache off: requests go straight to the
//! wrapped service and no caching headers are added.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::{DEFAULT_MAX_CACHEABLE_SIZE, EligibilityPolicy};

/// Invalid cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A zero size limit would reject every response.
    #[error("max_cacheable_size must be greater than zero")]
    ZeroMaxCacheableSize,
    /// A shared store was supplied whose TTL differs from the configured one.
    #[error("shared store ttl {store:?} differs from configured ttl {config:?}")]
    TtlMismatch {
        /// TTL the store was created with.
        store: Duration,
        /// TTL in the configuration.
        config: Duration,
    },
}

fn default_max_cacheable_size() -> u64 {
    DEFAULT_MAX_CACHEABLE_SIZE
}

/// Cache configuration.
///
/// ```
/// use std::time::Duration;
/// use sabercat::CacheConfig;
///
/// let config = CacheConfig::builder()
///     .ttl(Duration::from_secs(60))
///     .max_cacheable_size(1 << 20)
///     .build()
///     .unwrap();
/// assert!(config.is_enabled());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a stored response is served before the backend is asked again.
    #[serde(default, with = "humantime_serde")]
    pub ttl: Duration,
    /// Largest `Content-Length` that may be stored, in bytes.
    #[serde(default = "default_max_cacheable_size")]
    pub max_cacheable_size: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

impl CacheConfig {
    /// Caches for `ttl` with the default size limit.
    pub fn new(ttl: Duration) -> Self {
        CacheConfig {
            ttl,
            max_cacheable_size: DEFAULT_MAX_CACHEABLE_SIZE,
        }
    }

    /// Configuration that passes every request through.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Creates a new builder.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Whether responses will be stored at all.
    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Eligibility policy matching this configuration.
    pub fn policy(&self) -> EligibilityPolicy {
        EligibilityPolicy::new(self.max_cacheable_size)
    }

    /// Checks the configuration for values that cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_cacheable_size == 0 {
            return Err(ConfigError::ZeroMaxCacheableSize);
        }
        Ok(())
    }
}

/// Builder for [`CacheConfig`].
#[derive(Debug, Clone)]
pub struct CacheConfigBuilder {
    ttl: Duration,
    max_cacheable_size: u64,
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self {
            ttl: Duration::ZERO,
            max_cacheable_size: DEFAULT_MAX_CACHEABLE_SIZE,
        }
    }
}

impl CacheConfigBuilder {
    /// Sets the entry lifetime. Zero disables caching.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the largest cacheable `Content-Length`.
    pub fn max_cacheable_size(mut self, bytes: u64) -> Self {
        self.max_cacheable_size = bytes;
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<CacheConfig, ConfigError> {
        let config = CacheConfig {
            ttl: self.ttl,
            max_cacheable_size: self.max_cacheable_size,
        };
        config.validate()?;
        Ok(config)
    }
}
