//! First-in first-out eviction decorator

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::error::CacheResult;
use super::key::CacheKey;
use super::provider::{Cache, CacheValue};
use crate::constants::DEFAULT_EVICTION_SIZE;

/// Bounds a delegate by evicting keys in the order they were stored.
///
/// Reads and removals leave the queue alone, so eviction order is strict
/// insertion order. A key stored twice is queued twice. The new entry is
/// written before the oldest is evicted; a failed write evicts nothing.
pub struct FifoCache<C> {
    inner: C,
    queue: Mutex<VecDeque<CacheKey>>,
    size: usize,
}

impl<C: std::fmt::Debug> std::fmt::Debug for FifoCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FifoCache")
            .field("inner", &self.inner)
            .field("size", &self.size)
            .field("queued", &self.queue.lock().len())
            .finish()
    }
}

impl<C: Cache> FifoCache<C> {
    pub fn new(inner: C) -> Self {
        Self::with_size(inner, DEFAULT_EVICTION_SIZE)
    }

    pub fn with_size(inner: C, size: usize) -> Self {
        Self {
            inner,
            queue: Mutex::new(VecDeque::with_capacity(size.min(DEFAULT_EVICTION_SIZE))),
            size,
        }
    }

    pub const fn capacity(&self) -> usize {
        self.size
    }
}

impl<C: Cache> Cache for FifoCache<C> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> CacheResult<()> {
        let mut queue = self.queue.lock();
        self.inner.put(key.clone(), value)?;
        queue.push_back(key.clone());
        if queue.len() <= self.size {
            return Ok(());
        }
        match queue.pop_front() {
            Some(oldest) if oldest != key => {
                tracing::debug!(cache.id = self.inner.id(), cache.key = %oldest, "fifo eviction");
                #[cfg(feature = "metrics")]
                crate::observability::record_cache_eviction(self.inner.id());
                self.inner.remove(&oldest).map(|_| ())
            }
            _ => Ok(()),
        }
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        self.inner.get(key)
    }

    fn remove(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        self.inner.remove(key)
    }

    fn clear(&self) -> CacheResult<()> {
        let mut queue = self.queue.lock();
        queue.clear();
        self.inner.clear()
    }
}
