//! Non-evicting in-memory store at the bottom of every decorator stack

use std::collections::HashMap;

use parking_lot::RwLock;

use super::error::CacheResult;
use super::key::CacheKey;
use super::provider::{Cache, CacheValue};

/// Thread-safe, unbounded key/value store.
///
/// Holds entries until they are removed or cleared; size limits are the job
/// of the eviction decorators wrapped around it.
pub struct PerpetualCache {
    id: String,
    store: RwLock<HashMap<CacheKey, CacheValue>>,
}

impl std::fmt::Debug for PerpetualCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerpetualCache")
            .field("id", &self.id)
            .field("entry_count", &self.store.read().len())
            .finish_non_exhaustive()
    }
}

impl PerpetualCache {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            store: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn contains_key(&self, key: &CacheKey) -> bool {
        self.store.read().contains_key(key)
    }
}

impl Cache for PerpetualCache {
    fn id(&self) -> &str {
        &self.id
    }

    fn size(&self) -> usize {
        self.store.read().len()
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> CacheResult<()> {
        self.store.write().insert(key, value);
        Ok(())
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        Ok(self.store.read().get(key).cloned())
    }

    fn remove(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        Ok(self.store.write().remove(key))
    }

    fn clear(&self) -> CacheResult<()> {
        self.store.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::types::Row;

    fn key(n: i64) -> CacheKey {
        CacheKey::from_components([n])
    }

    #[test]
    fn test_basic_put_get() {
        let cache = PerpetualCache::new("users");
        cache.put(key(1), CacheValue::rows(vec![Row::new()])).unwrap();

        let value = cache.get(&key(1)).unwrap().unwrap();
        assert_eq!(value.as_rows().unwrap().len(), 1);
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.id(), "users");
    }

    #[test]
    fn test_get_nonexistent_key() {
        let cache = PerpetualCache::new("users");
        assert!(cache.get(&key(1)).unwrap().is_none());
    }

    #[test]
    fn test_explicit_null_is_not_absent() {
        let cache = PerpetualCache::new("users");
        cache.put(key(1), CacheValue::Null).unwrap();

        assert!(cache.contains_key(&key(1)));
        assert!(cache.get(&key(1)).unwrap().unwrap().is_null());
    }

    #[test]
    fn test_remove_returns_previous() {
        let cache = PerpetualCache::new("users");
        cache.put(key(1), CacheValue::Null).unwrap();

        assert!(cache.remove(&key(1)).unwrap().is_some());
        assert!(cache.remove(&key(1)).unwrap().is_none());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_clear() {
        let cache = PerpetualCache::new("users");
        cache.put(key(1), CacheValue::Null).unwrap();
        cache.put(key(2), CacheValue::Null).unwrap();

        cache.clear().unwrap();
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_concurrent_puts() {
        let cache = Arc::new(PerpetualCache::new("users"));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..100 {
                        cache.put(key(t * 1000 + i), CacheValue::Null).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.size(), 400);
    }

    #[test]
    fn test_debug_impl() {
        let cache = PerpetualCache::new("users");
        let debug_str = format!("{cache:?}");
        assert!(debug_str.contains("PerpetualCache"));
        assert!(debug_str.contains("users"));
    }
}
