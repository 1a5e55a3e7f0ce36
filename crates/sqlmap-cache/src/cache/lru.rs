//! Least-recently-used eviction decorator

use std::num::NonZeroUsize;

use ::lru::LruCache as LruOrder;
use parking_lot::Mutex;

use super::error::CacheResult;
use super::key::CacheKey;
use super::provider::{Cache, CacheValue};
use crate::constants::DEFAULT_EVICTION_SIZE;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(DEFAULT_EVICTION_SIZE) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// Bounds a delegate to `capacity` keys, evicting the least recently touched.
///
/// Only key recency is tracked here; values live in the delegate, which stays
/// the single source of truth for reads. Writes, removals and evictions reach
/// the delegate while the recency lock is held, so every tracked key is
/// present in the delegate once a write returns.
pub struct LruCache<C> {
    inner: C,
    order: Mutex<LruOrder<CacheKey, ()>>,
}

impl<C: std::fmt::Debug> std::fmt::Debug for LruCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let order = self.order.lock();
        f.debug_struct("LruCache")
            .field("inner", &self.inner)
            .field("capacity", &order.cap())
            .field("tracked", &order.len())
            .finish()
    }
}

impl<C: Cache> LruCache<C> {
    pub fn new(inner: C) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: C, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            order: Mutex::new(LruOrder::new(capacity)),
        }
    }

    /// Change the capacity. Shrinking evicts the oldest keys from the delegate.
    pub fn set_capacity(&self, capacity: NonZeroUsize) -> CacheResult<()> {
        let mut order = self.order.lock();
        while order.len() > capacity.get() {
            match order.pop_lru() {
                Some((key, ())) => self.evict(&key)?,
                None => break,
            }
        }
        order.resize(capacity);
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.order.lock().cap().get()
    }

    fn evict(&self, key: &CacheKey) -> CacheResult<()> {
        tracing::debug!(cache.id = self.inner.id(), cache.key = %key, "lru eviction");
        #[cfg(feature = "metrics")]
        crate::observability::record_cache_eviction(self.inner.id());
        self.inner.remove(key).map(|_| ())
    }
}

impl<C: Cache> Cache for LruCache<C> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> CacheResult<()> {
        // Recency and delegate change together so neither holds a key the
        // other has dropped
        let mut order = self.order.lock();
        self.inner.put(key.clone(), value)?;
        let eldest = order
            .push(key.clone(), ())
            .map(|(evicted, ())| evicted)
            .filter(|evicted| *evicted != key);
        if let Some(eldest) = eldest {
            self.evict(&eldest)?;
        }
        Ok(())
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        self.order.lock().promote(key);
        self.inner.get(key)
    }

    fn remove(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        let mut order = self.order.lock();
        order.pop(key);
        self.inner.remove(key)
    }

    fn clear(&self) -> CacheResult<()> {
        let mut order = self.order.lock();
        order.clear();
        self.inner.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PerpetualCache;

    fn key(n: i64) -> CacheKey {
        CacheKey::from_components([n])
    }

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_default_capacity() {
        let cache = LruCache::new(PerpetualCache::new("lru"));
        assert_eq!(cache.capacity(), 1024);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = LruCache::with_capacity(PerpetualCache::new("lru"), cap(2));
        cache.put(key(1), CacheValue::Null).unwrap();
        cache.put(key(2), CacheValue::Null).unwrap();
        cache.put(key(3), CacheValue::Null).unwrap();

        assert!(cache.get(&key(1)).unwrap().is_none());
        assert!(cache.get(&key(2)).unwrap().is_some());
        assert!(cache.get(&key(3)).unwrap().is_some());
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_get_protects_from_eviction() {
        let cache = LruCache::with_capacity(PerpetualCache::new("lru"), cap(2));
        cache.put(key(1), CacheValue::Null).unwrap();
        cache.put(key(2), CacheValue::Null).unwrap();
        cache.get(&key(1)).unwrap();
        cache.put(key(3), CacheValue::Null).unwrap();

        assert!(cache.get(&key(1)).unwrap().is_some());
        assert!(cache.get(&key(2)).unwrap().is_none());
        assert!(cache.get(&key(3)).unwrap().is_some());
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = LruCache::with_capacity(PerpetualCache::new("lru"), cap(2));
        cache.put(key(1), CacheValue::Null).unwrap();
        cache.put(key(2), CacheValue::Null).unwrap();
        cache.put(key(2), CacheValue::rows(Vec::new())).unwrap();

        assert_eq!(cache.size(), 2);
        assert!(cache.get(&key(1)).unwrap().is_some());
        assert!(cache.get(&key(2)).unwrap().unwrap().as_rows().is_some());
    }

    #[test]
    fn test_shrink_capacity_evicts() {
        let cache = LruCache::with_capacity(PerpetualCache::new("lru"), cap(3));
        for i in 1..=3 {
            cache.put(key(i), CacheValue::Null).unwrap();
        }
        cache.set_capacity(cap(1)).unwrap();

        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.size(), 1);
        assert!(cache.get(&key(3)).unwrap().is_some());
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = LruCache::with_capacity(PerpetualCache::new("lru"), cap(2));
        cache.put(key(1), CacheValue::Null).unwrap();
        cache.put(key(2), CacheValue::Null).unwrap();

        assert!(cache.remove(&key(1)).unwrap().is_some());
        cache.put(key(3), CacheValue::Null).unwrap();
        assert!(cache.get(&key(2)).unwrap().is_some());

        cache.clear().unwrap();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_tracked_keys_match_delegate_under_concurrency() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(LruCache::with_capacity(PerpetualCache::new("lru"), cap(8)));
        let writers: Vec<_> = (0..4i64)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..200 {
                        cache.put(key(t * 1000 + i), CacheValue::Null).unwrap();
                        if i % 50 == 0 {
                            cache.clear().unwrap();
                        }
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let tracked = cache.order.lock().len();
        assert_eq!(tracked, cache.size());
        assert!(tracked <= 8);
    }
}
