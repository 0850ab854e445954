//! Metrics declaration and recording.
//!
//! Enable the `metrics` feature to emit:
//!
//! - `sabercat_cache_hit_total` - requests answered from the store (counter)
//! - `sabercat_cache_miss_total` - requests forwarded to the backend (counter)
//! - `sabercat_cache_uncacheable_total` - captures rejected by the policy,
//!   labelled with `reason` (counter)
//! - `sabercat_cache_evicted_total` - entries removed by their timer (counter)
//! - `sabercat_cache_entries` - entries currently stored (gauge)
//!
//! Without the feature every function here is an empty inline call.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

use crate::policy::Uncacheable;

#[cfg(feature = "metrics")]
lazy_static! {
    /// Track number of cache hits.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "sabercat_cache_hit_total",
            "Total number of requests served from the cache."
        );
        "sabercat_cache_hit_total"
    };
    /// Track number of cache misses.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "sabercat_cache_miss_total",
            "Total number of requests forwarded to the backend."
        );
        "sabercat_cache_miss_total"
    };
    /// Track number of captures the eligibility policy refused.
    pub static ref CACHE_UNCACHEABLE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "sabercat_cache_uncacheable_total",
            "Total number of backend responses that were not stored."
        );
        "sabercat_cache_uncacheable_total"
    };
    /// Track number of entries removed by eviction timers.
    pub static ref CACHE_EVICTED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "sabercat_cache_evicted_total",
            "Total number of entries evicted after their TTL."
        );
        "sabercat_cache_evicted_total"
    };
    /// Gauge of stored entries.
    pub static ref CACHE_ENTRIES: &'static str = {
        metrics::describe_gauge!(
            "sabercat_cache_entries",
            "Current number of entries in the cache."
        );
        "sabercat_cache_entries"
    };
}

/// Record a cache hit.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_hit() {
    metrics::counter!(*CACHE_HIT_COUNTER).increment(1);
}

/// Record a cache hit (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_hit() {}

/// Record a cache miss.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_miss() {
    metrics::counter!(*CACHE_MISS_COUNTER).increment(1);
}

/// Record a cache miss (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_miss() {}

/// Record a rejected capture, labelled with the rejection reason.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_uncacheable(reason: &Uncacheable) {
    metrics::counter!(*CACHE_UNCACHEABLE_COUNTER, "reason" => reason.as_str()).increment(1);
}

/// Record a rejected capture (no-op when `metrics` feature disabled).
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_uncacheable(_reason: &Uncacheable) {}

/// Record an entry removed by its eviction timer.
#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_eviction() {
    metrics::counter!(*CACHE_EVICTED_COUNTER).increment(1);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_eviction() {}

/// Record the current number of stored entries.
#[cfg(feature = "metrics")]
#[inline]
pub(crate) fn record_entries(entries: usize) {
    metrics::gauge!(*CACHE_ENTRIES).set(entries as f64);
}

#[cfg(not(feature = "metrics"))]
#[inline]
pub(crate) fn record_entries(_entries: usize) {}
