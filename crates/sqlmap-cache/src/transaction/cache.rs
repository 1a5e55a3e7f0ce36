//! Per-transaction staging buffer over a shared cache

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::Mutex;

use crate::cache::{Cache, CacheError, CacheKey, CacheResult, CacheValue};

#[derive(Debug, Default)]
struct Pending {
    clear_on_commit: bool,
    writes: IndexMap<CacheKey, CacheValue>,
    misses: IndexSet<CacheKey>,
}

/// Buffers writes to a shared cache until the transaction commits.
///
/// Reads go straight to the delegate and never mutate it. Keys that missed
/// are remembered: on commit each one that was not written gets an explicit
/// [`CacheValue::Null`], and on rollback each one is removed, so a blocking
/// delegate releases every lock taken by a miss either way.
pub struct TransactionalCache {
    delegate: Arc<dyn Cache>,
    pending: Mutex<Pending>,
}

impl std::fmt::Debug for TransactionalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self.pending.lock();
        f.debug_struct("TransactionalCache")
            .field("delegate", &self.delegate.id())
            .field("clear_on_commit", &pending.clear_on_commit)
            .field("pending_writes", &pending.writes.len())
            .field("pending_misses", &pending.misses.len())
            .finish()
    }
}

impl TransactionalCache {
    #[must_use]
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self {
            delegate,
            pending: Mutex::new(Pending::default()),
        }
    }

    #[must_use]
    pub fn delegate(&self) -> &Arc<dyn Cache> {
        &self.delegate
    }

    #[must_use]
    pub fn pending_write_count(&self) -> usize {
        self.pending.lock().writes.len()
    }

    #[must_use]
    pub fn pending_miss_count(&self) -> usize {
        self.pending.lock().misses.len()
    }

    #[must_use]
    pub fn is_clear_on_commit(&self) -> bool {
        self.pending.lock().clear_on_commit
    }

    /// Apply the buffered state to the delegate and reset.
    ///
    /// Clears the delegate if a clear was staged, writes staged entries in
    /// the order they were first staged, then writes an explicit null for
    /// every missed key that was not written. Every step is attempted; the
    /// first failure is returned.
    pub fn commit(&self) -> CacheResult<()> {
        let pending = std::mem::take(&mut *self.pending.lock());
        let mut first_error = None;

        if pending.clear_on_commit {
            note_failure(self.delegate.clear(), "clear", self.delegate.id(), &mut first_error);
        }
        let unwritten: Vec<CacheKey> = pending
            .misses
            .into_iter()
            .filter(|key| !pending.writes.contains_key(key))
            .collect();
        for (key, value) in pending.writes {
            note_failure(self.delegate.put(key, value), "put", self.delegate.id(), &mut first_error);
        }
        for key in unwritten {
            let result = self.delegate.put(key, CacheValue::Null);
            note_failure(result, "put null", self.delegate.id(), &mut first_error);
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Discard the buffered state, removing every missed key from the
    /// delegate. Failures are logged and the sweep continues.
    pub fn rollback(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        for key in &pending.misses {
            if let Err(e) = self.delegate.remove(key) {
                tracing::warn!(
                    cache.id = self.delegate.id(),
                    cache.key = %key,
                    error = %e,
                    "Unexpected exception while notifying a rollback to the cache adapter"
                );
            }
        }
    }
}

fn note_failure(
    result: CacheResult<()>,
    operation: &str,
    cache_id: &str,
    first_error: &mut Option<CacheError>,
) {
    if let Err(e) = result {
        tracing::warn!(cache.id = cache_id, cache.operation = operation, error = %e, "commit step failed");
        first_error.get_or_insert(e);
    }
}

impl Cache for TransactionalCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> CacheResult<()> {
        self.pending.lock().writes.insert(key, value);
        Ok(())
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        let value = self.delegate.get(key)?;
        let mut pending = self.pending.lock();
        if value.as_ref().is_none_or(CacheValue::is_null) {
            pending.misses.insert(key.clone());
        }
        if pending.clear_on_commit {
            Ok(None)
        } else {
            Ok(value)
        }
    }

    fn remove(&self, _key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        Ok(None)
    }

    fn clear(&self) -> CacheResult<()> {
        let mut pending = self.pending.lock();
        pending.clear_on_commit = true;
        pending.writes.clear();
        Ok(())
    }
}
