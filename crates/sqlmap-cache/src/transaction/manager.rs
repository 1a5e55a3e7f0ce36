//! One transactional buffer per shared cache touched by a session

use std::sync::Arc;

use indexmap::IndexMap;

use super::cache::TransactionalCache;
use crate::cache::{Cache, CacheKey, CacheResult, CacheValue};

/// Routes shared-cache traffic of one session through per-cache buffers.
///
/// Buffers are keyed by cache id, created on first use and visited in that
/// order by [`commit_all`](Self::commit_all) and
/// [`rollback_all`](Self::rollback_all). Both end the transaction, so no
/// buffer outlives it.
#[derive(Debug, Default)]
pub struct TransactionalCacheManager {
    buffers: IndexMap<String, TransactionalCache>,
}

impl TransactionalCacheManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer(&mut self, cache: &Arc<dyn Cache>) -> &TransactionalCache {
        self.buffers
            .entry(cache.id().to_string())
            .or_insert_with(|| TransactionalCache::new(Arc::clone(cache)))
    }

    /// Stage a clear of `cache`
    pub fn clear(&mut self, cache: &Arc<dyn Cache>) -> CacheResult<()> {
        self.buffer(cache).clear()
    }

    pub fn get(&mut self, cache: &Arc<dyn Cache>, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        self.buffer(cache).get(key)
    }

    pub fn put(&mut self, cache: &Arc<dyn Cache>, key: CacheKey, value: CacheValue) -> CacheResult<()> {
        self.buffer(cache).put(key, value)
    }

    /// Commit every buffer and forget them. All buffers are visited; the
    /// first failure is returned.
    pub fn commit_all(&mut self) -> CacheResult<()> {
        let mut first_error = None;
        for (id, buffer) in &self.buffers {
            if let Err(e) = buffer.commit() {
                tracing::warn!(cache.id = id.as_str(), error = %e, "transactional cache commit failed");
                first_error.get_or_insert(e);
            }
        }
        self.buffers.clear();
        first_error.map_or(Ok(()), Err)
    }

    /// Roll back every buffer and forget them
    pub fn rollback_all(&mut self) {
        for buffer in self.buffers.values() {
            buffer.rollback();
        }
        self.buffers.clear();
    }

    /// Number of shared caches touched so far
    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }
}
