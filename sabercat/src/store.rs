//! Concurrent path → response store.
//!
//! [`CacheStore`] is a `HashMap` behind a single [`RwLock`]. Lookups take the
//! shared lock and clone the entry out; inserts and deletes take the
//! exclusive lock. The lock only ever guards the map operation itself and
//! is never held across an `.await`, so a slow backend fetch cannot block
//! readers of other keys, or of the same key.
//!
//! Each insert is tagged with a generation number and arms one eviction
//! timer. The timer removes the entry only if that generation is still the
//! one stored, so the timer of an overwritten entry leaves its replacement
//! alone.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::eviction::{EvictionError, EvictionScheduler};
use crate::key::CacheKey;
use crate::metrics;
use crate::response::CachedResponse;

struct Entry {
    generation: u64,
    /// `None` when the TTL reaches past what an `Instant` can represent.
    deadline: Option<Instant>,
    response: CachedResponse,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline.is_none_or(|deadline| deadline > now)
    }
}

struct StoreInner {
    entries: RwLock<HashMap<CacheKey, Entry>>,
    ttl: Duration,
    generation: AtomicU64,
    scheduler: EvictionScheduler,
}

/// In-memory response store with per-entry TTL.
///
/// Cloning is cheap and every clone refers to the same map. Eviction timers
/// hold only a weak reference, so dropping the last clone frees the entries
/// even while timers are still pending.
///
/// ```
/// use std::time::Duration;
/// use bytes::Bytes;
/// use http::{HeaderMap, StatusCode};
/// use sabercat::{CacheKey, CacheStore, CachedResponse};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = CacheStore::new(Duration::from_secs(60));
/// let response = CachedResponse::new(
///     StatusCode::OK,
///     HeaderMap::new(),
///     Bytes::from_static(b"hi"),
///     2,
/// ).unwrap();
///
/// store.put(CacheKey::new("/greeting"), response).unwrap();
/// assert!(store.get(&CacheKey::new("/greeting")).is_some());
/// # }
/// ```
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<StoreInner>,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("ttl", &self.inner.ttl)
            .field("entries", &self.read().len())
            .field("scheduler", &self.inner.scheduler)
            .finish()
    }
}

impl CacheStore {
    /// Creates an empty store whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self::with_scheduler(ttl, EvictionScheduler::new())
    }

    /// Creates an empty store that arms timers through `scheduler`.
    pub fn with_scheduler(ttl: Duration, scheduler: EvictionScheduler) -> Self {
        CacheStore {
            inner: Arc::new(StoreInner {
                entries: RwLock::new(HashMap::new()),
                ttl,
                generation: AtomicU64::new(0),
                scheduler,
            }),
        }
    }

    /// Lifetime of every entry.
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Scheduler arming this store's eviction timers.
    pub fn scheduler(&self) -> &EvictionScheduler {
        &self.inner.scheduler
    }

    /// Returns a copy of the live entry for `key`.
    pub fn get(&self, key: &CacheKey) -> Option<CachedResponse> {
        let now = Instant::now();
        self.read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.response.clone())
    }

    /// Installs or replaces the entry for `key` and arms its eviction timer.
    ///
    /// Fails only when no tokio runtime is available to run the timer; the
    /// entry is withdrawn in that case so nothing outlives its TTL.
    pub fn put(&self, key: CacheKey, response: CachedResponse) -> Result<(), EvictionError> {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let entry = Entry {
            generation,
            deadline: Instant::now().checked_add(self.inner.ttl),
            response,
        };

        let len = {
            let mut entries = self.write();
            entries.insert(key.clone(), entry);
            entries.len()
        };
        metrics::record_entries(len);

        let store = Arc::downgrade(&self.inner);
        let timer_key = key.clone();
        let scheduled = self.inner.scheduler.schedule(&key, self.inner.ttl, move || {
            if let Some(inner) = store.upgrade() {
                CacheStore { inner }.evict(&timer_key, generation);
            }
        });

        if let Err(error) = scheduled {
            self.evict(&key, generation);
            return Err(error);
        }
        Ok(())
    }

    /// Removes the entry for `key`. Returns `false` if there was none.
    pub fn delete(&self, key: &CacheKey) -> bool {
        let (removed, len) = {
            let mut entries = self.write();
            (entries.remove(key).is_some(), entries.len())
        };
        if removed {
            metrics::record_entries(len);
        }
        removed
    }

    /// Whether a live entry exists for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let now = Instant::now();
        self.read().get(key).is_some_and(|entry| entry.is_live(now))
    }

    /// Number of stored entries, including ones whose timer is about to fire.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Timer callback: remove `key` only if it still holds `generation`.
    fn evict(&self, key: &CacheKey, generation: u64) -> bool {
        let (evicted, len) = {
            let mut entries = self.write();
            let current = entries
                .get(key)
                .is_some_and(|entry| entry.generation == generation);
            if current {
                entries.remove(key);
            }
            (current, entries.len())
        };
        trace!(key = %key, generation, evicted, "eviction timer fired");
        if evicted {
            metrics::record_eviction();
            metrics::record_entries(len);
        }
        evicted
    }

    // A panic while holding the lock cannot leave the map half-updated,
    // so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, Entry>> {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, Entry>> {
        self.inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
