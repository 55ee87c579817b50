// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Performance Optimizer (§4.10): bounded concurrency for spawns and VCC
//! operations, a small LRU+TTL cache for idempotent reads, and a pre-warm
//! pool of ready multiplexer sessions. The third bounded queue the spec
//! names, `message_batch`, is the Reliable Sender's own per-target batching
//! buffer (§4.3) — there's nothing to duplicate here.

use crate::env;
use oj_adapters::SessionAdapter;
use oj_core::Clock;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A concurrency-bounded queue backed by a counting semaphore: at most
/// `limit` operations run at once, the rest wait their turn (§4.10, §5
/// backpressure).
#[derive(Clone)]
pub struct BoundedQueue {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

impl BoundedQueue {
    pub fn new(limit: usize) -> Self {
        Self { semaphore: Arc::new(Semaphore::new(limit.max(1))), limit }
    }

    /// Current configured depth.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// How many slots are free right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Waits for a slot. The returned permit releases it on drop.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore is never closed")
    }

    /// Non-blocking variant used for the high-watermark backpressure check
    /// (§5): `None` means the queue is at capacity and submission should
    /// pause.
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        self.semaphore.clone().try_acquire_owned().ok()
    }
}

struct CacheEntry<V> {
    value: V,
    expires_at_ms: u64,
}

/// Hand-rolled LRU+TTL cache over an `IndexMap`, so eviction can walk
/// insertion order directly instead of maintaining a parallel linked list
/// (§4.10 default: 1000 entries, 60s TTL). Memoizes idempotent reads such
/// as worktree status.
pub struct LruTtlCache<V> {
    capacity: usize,
    ttl_ms: u64,
    entries: Mutex<IndexMap<String, CacheEntry<V>>>,
}

impl<V: Clone> LruTtlCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity: capacity.max(1), ttl_ms: ttl.as_millis() as u64, entries: Mutex::new(IndexMap::new()) }
    }

    /// Returns the cached value if present and not expired, moving it to
    /// the most-recently-used end on hit. A stale entry is evicted on read.
    pub fn get(&self, key: &str, now_ms: u64) -> Option<V> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        if entry.expires_at_ms <= now_ms {
            entries.shift_remove(key);
            return None;
        }
        let value = entry.value.clone();
        // Touch recency: move the hit entry to the back.
        entries.shift_remove(key);
        entries.insert(key.to_string(), CacheEntry { value: value.clone(), expires_at_ms: now_ms + self.ttl_ms });
        Some(value)
    }

    /// Inserts or refreshes `key`, evicting the least-recently-used entry
    /// (the front of the map) when at capacity.
    pub fn put(&self, key: &str, value: V, now_ms: u64) {
        let mut entries = self.entries.lock();
        entries.shift_remove(key);
        if entries.len() >= self.capacity {
            entries.shift_remove_index(0);
        }
        entries.insert(key.to_string(), CacheEntry { value, expires_at_ms: now_ms + self.ttl_ms });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// A pool of multiplexer sessions created ahead of time so `spawn` can skip
/// the session-creation suspension point on its hot path (§4.10).
pub struct PrewarmPool<S: SessionAdapter> {
    session: S,
    target_size: usize,
    prefix: String,
    root: PathBuf,
    ready: Mutex<Vec<String>>,
    next_ordinal: AtomicUsize,
}

impl<S: SessionAdapter> PrewarmPool<S> {
    pub fn new(session: S, target_size: usize, prefix: impl Into<String>, root: PathBuf) -> Self {
        Self {
            session,
            target_size,
            prefix: prefix.into(),
            root,
            ready: Mutex::new(Vec::new()),
            next_ordinal: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.ready.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tops the pool back up to `target_size` by creating fresh sessions.
    pub async fn refill(&self) {
        let deficit = self.target_size.saturating_sub(self.len());
        for _ in 0..deficit {
            let n = self.next_ordinal.fetch_add(1, Ordering::SeqCst);
            let name = format!("{}_prewarm_{n}", self.prefix);
            if self.session.create_session(&name, &self.root).await.is_ok() {
                self.ready.lock().push(name);
            }
        }
    }

    /// Claims a pre-warmed session name, if one is ready; the caller is
    /// responsible for it from here on (renaming, handing it to `spawn`).
    pub fn take(&self) -> Option<String> {
        self.ready.lock().pop()
    }
}

/// Hot-reloadable performance settings (§4.10), updated via the
/// `optimize_settings` RPC verb.
#[derive(Debug, Clone, Copy)]
pub struct PerfSettings {
    pub max_concurrent_spawns: usize,
    pub max_concurrent_vcc_ops: usize,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub prewarm_pool_size: usize,
}

impl Default for PerfSettings {
    fn default() -> Self {
        Self {
            max_concurrent_spawns: env::max_concurrent_spawns(),
            max_concurrent_vcc_ops: env::max_concurrent_vcc_ops(),
            cache_capacity: env::cache_capacity(),
            cache_ttl: env::cache_ttl(),
            prewarm_pool_size: env::prewarm_pool_size(),
        }
    }
}

/// Owns the bounded queues and cache; `optimize_settings` swaps the queues
/// for freshly sized ones rather than mutating semaphore limits in place,
/// since `tokio::sync::Semaphore` has no "shrink" operation.
pub struct PerformanceOptimizer<V> {
    spawn_queue: Mutex<BoundedQueue>,
    vcc_queue: Mutex<BoundedQueue>,
    cache: Mutex<Arc<LruTtlCache<V>>>,
    settings: Mutex<PerfSettings>,
}

impl<V: Clone + Send + Sync + 'static> PerformanceOptimizer<V> {
    pub fn new(settings: PerfSettings) -> Self {
        Self {
            spawn_queue: Mutex::new(BoundedQueue::new(settings.max_concurrent_spawns)),
            vcc_queue: Mutex::new(BoundedQueue::new(settings.max_concurrent_vcc_ops)),
            cache: Mutex::new(Arc::new(LruTtlCache::new(settings.cache_capacity, settings.cache_ttl))),
            settings: Mutex::new(settings),
        }
    }

    pub fn spawn_queue(&self) -> BoundedQueue {
        self.spawn_queue.lock().clone()
    }

    pub fn vcc_queue(&self) -> BoundedQueue {
        self.vcc_queue.lock().clone()
    }

    pub fn cache(&self) -> Arc<LruTtlCache<V>> {
        self.cache.lock().clone()
    }

    pub fn settings(&self) -> PerfSettings {
        *self.settings.lock()
    }

    /// `optimize_settings` (§4.10, §6): hot-reload. Queues already in
    /// flight against the old semaphores drain naturally; the cache is kept
    /// unless its capacity or TTL changed, to avoid discarding warm entries
    /// on an unrelated queue-depth tweak.
    pub fn optimize_settings(&self, new_settings: PerfSettings) {
        let mut settings = self.settings.lock();
        *self.spawn_queue.lock() = BoundedQueue::new(new_settings.max_concurrent_spawns);
        *self.vcc_queue.lock() = BoundedQueue::new(new_settings.max_concurrent_vcc_ops);
        if new_settings.cache_capacity != settings.cache_capacity || new_settings.cache_ttl != settings.cache_ttl {
            *self.cache.lock() = Arc::new(LruTtlCache::new(new_settings.cache_capacity, new_settings.cache_ttl));
        }
        *settings = new_settings;
    }
}

/// Convenience: runs `f` with a cached value for `key` when fresh, else
/// computes, caches, and returns it (§4.10's "memoizes idempotent reads").
pub async fn cached_or_compute<V, C, F, Fut>(
    cache: &LruTtlCache<V>,
    clock: &C,
    key: &str,
    compute: F,
) -> Result<V, oj_core::CoreError>
where
    V: Clone,
    C: Clock,
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<V, oj_core::CoreError>>,
{
    let now = clock.now_ms();
    if let Some(hit) = cache.get(key, now) {
        return Ok(hit);
    }
    let value = compute().await?;
    cache.put(key, value.clone(), now);
    Ok(value)
}

#[cfg(test)]
#[path = "perf_tests.rs"]
mod tests;
