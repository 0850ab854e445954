//! One-shot delayed eviction timers.
//!
//! Every stored entry gets exactly one timer. A timer is a tokio task that
//! sleeps for the TTL and then runs its eviction callback once; it owns
//! nothing but what the callback captures. Timers never coordinate with each
//! other, so there is no timer wheel or shared queue to contend on.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;

use crate::key::CacheKey;

/// Failure to arm an eviction timer.
#[derive(Debug, Error)]
pub enum EvictionError {
    /// Timers run on tokio; `put` was called outside of a runtime.
    #[error("no tokio runtime available to run the eviction timer for {0}")]
    NoRuntime(CacheKey),
}

#[derive(Debug, Default)]
struct SchedulerInner {
    scheduled: AtomicU64,
    pending: AtomicUsize,
}

/// Decrements the pending counter when the timer task finishes or is dropped.
struct PendingGuard(Arc<SchedulerInner>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.pending.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Spawns delayed deletions on the current tokio runtime.
///
/// Clones share counters.
#[derive(Debug, Clone, Default)]
pub struct EvictionScheduler {
    inner: Arc<SchedulerInner>,
}

impl EvictionScheduler {
    /// Creates a scheduler with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `evict` once, `delay` from now.
    pub fn schedule<F>(&self, key: &CacheKey, delay: Duration, evict: F) -> Result<(), EvictionError>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = Handle::try_current().map_err(|_| EvictionError::NoRuntime(key.clone()))?;

        self.inner.scheduled.fetch_add(1, Ordering::Relaxed);
        self.inner.pending.fetch_add(1, Ordering::Relaxed);
        let guard = PendingGuard(Arc::clone(&self.inner));

        handle.spawn(async move {
            let _guard = guard;
            tokio::time::sleep(delay).await;
            evict();
        });
        Ok(())
    }

    /// Number of timers armed since creation.
    pub fn scheduled(&self) -> u64 {
        self.inner.scheduled.load(Ordering::Relaxed)
    }

    /// Number of timers that have not fired yet.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Relaxed)
    }
}
