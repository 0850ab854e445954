#![warn(missing_docs)]
//! # sabercat
//!
//! In-memory response cache for slow or rate-limited HTTP backends.
//!
//! Full backend responses are remembered by request path for a fixed TTL.
//! This crate holds the protocol-level engine; the Tower middleware that
//! drives it lives in `sabercat-tower`.
//!
//! ## Components
//!
//! - [`CacheKey`] - the request path, and nothing else
//! - [`CachedResponse`] - immutable, validated snapshot of a backend answer
//! - [`CacheStore`] - concurrent key → response map with per-entry TTL
//! - [`EvictionScheduler`] - one-shot delayed deletion per stored entry
//! - [`ResponseCapture`] - in-memory sink the backend writes into before its
//!   output is trusted
//! - [`EligibilityPolicy`] - decides which captures may be stored
//! - [`CacheConfig`] - TTL and size limit
//!
//! ## Fill protocol
//!
//! ```text
//! miss ─▶ backend ─▶ ResponseCapture ─▶ EligibilityPolicy ─┬─ ok ──▶ CacheStore::put ─▶ serve
//!                                                          └─ err ─────────────────────▶ serve
//! ```
//!
//! Rejected captures are still served; they are only kept out of the store.
//! Nothing in this crate retries, and nothing coalesces concurrent misses:
//! two simultaneous misses for one path both reach the backend and the
//! later `put` wins.
//!
//! ## Feature Flags
//!
//! - `metrics` - emit counters and gauges through the `metrics` crate

pub mod capture;
pub mod config;
pub mod eviction;
pub mod key;
pub mod metrics;
pub mod policy;
pub mod response;
pub mod store;

pub use capture::{CapturedResponse, ResponseCapture};
pub use config::{CacheConfig, CacheConfigBuilder, ConfigError};
pub use eviction::{EvictionError, EvictionScheduler};
pub use key::CacheKey;
pub use policy::{DEFAULT_MAX_CACHEABLE_SIZE, EligibilityPolicy, Uncacheable};
pub use response::CachedResponse;
pub use store::CacheStore;
