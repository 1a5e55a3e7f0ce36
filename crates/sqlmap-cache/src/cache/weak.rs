//! Weak-reference eviction decorator

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::error::CacheResult;
use super::key::CacheKey;
use super::provider::{Cache, CacheValue};
use crate::constants::DEFAULT_HARD_LINKS;
use crate::types::{Row, Rows};

/// Stores result lists in the delegate through weak references.
///
/// A bounded ring of strong references keeps the most recently stored or
/// read lists alive. Anything else is reclaimed as soon as the last strong
/// reference held by callers goes away.
///
/// Reclaimed keys are swept from the delegate incrementally: each `get`,
/// `put` and `remove` checks at most [`SWEEP_BATCH`] tracked entries,
/// resuming where the previous pass stopped. A reclaimed entry read by `get`
/// is dropped on the spot, and `size` sweeps every tracked entry.
pub struct WeakCache<C> {
    inner: C,
    hard_links: Mutex<VecDeque<Rows>>,
    hard_link_count: usize,
    tracked: Mutex<Tracked>,
}

/// Tracked entries checked per operation
pub const SWEEP_BATCH: usize = 32;

#[derive(Default)]
struct Tracked {
    entries: IndexMap<CacheKey, Weak<Vec<Row>>>,
    cursor: usize,
}

impl Tracked {
    /// Drop up to `limit` checked entries whose rows are gone
    fn collect_reclaimed(&mut self, limit: usize) -> Vec<CacheKey> {
        let mut dead = Vec::new();
        let mut checked = 0;
        while checked < limit && !self.entries.is_empty() {
            if self.cursor >= self.entries.len() {
                self.cursor = 0;
            }
            let reclaimed = self
                .entries
                .get_index(self.cursor)
                .is_some_and(|(_, weak)| weak.strong_count() == 0);
            if reclaimed {
                // The last entry moves into the cursor slot and is checked next
                if let Some((key, _)) = self.entries.swap_remove_index(self.cursor) {
                    dead.push(key);
                }
            } else {
                self.cursor += 1;
            }
            checked += 1;
        }
        dead
    }

    fn forget(&mut self, key: &CacheKey) {
        self.entries.swap_remove(key);
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

impl<C: std::fmt::Debug> std::fmt::Debug for WeakCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakCache")
            .field("inner", &self.inner)
            .field("hard_link_count", &self.hard_link_count)
            .field("tracked", &self.tracked.lock().entries.len())
            .finish_non_exhaustive()
    }
}

impl<C: Cache> WeakCache<C> {
    pub fn new(inner: C) -> Self {
        Self::with_hard_links(inner, DEFAULT_HARD_LINKS)
    }

    pub fn with_hard_links(inner: C, hard_link_count: usize) -> Self {
        Self {
            inner,
            hard_links: Mutex::new(VecDeque::new()),
            hard_link_count,
            tracked: Mutex::new(Tracked::default()),
        }
    }

    pub const fn hard_link_count(&self) -> usize {
        self.hard_link_count
    }

    fn pin(&self, rows: Rows) {
        if self.hard_link_count == 0 {
            return;
        }
        let mut ring = self.hard_links.lock();
        ring.push_front(rows);
        ring.truncate(self.hard_link_count);
    }

    fn sweep(&self) -> CacheResult<()> {
        self.sweep_up_to(SWEEP_BATCH)
    }

    fn sweep_all(&self) -> CacheResult<()> {
        let limit = self.tracked.lock().entries.len();
        self.sweep_up_to(limit)
    }

    fn sweep_up_to(&self, limit: usize) -> CacheResult<()> {
        let reclaimed = self.tracked.lock().collect_reclaimed(limit);
        for key in &reclaimed {
            tracing::debug!(cache.id = self.inner.id(), cache.key = %key, "weak entry reclaimed");
            #[cfg(feature = "metrics")]
            crate::observability::record_cache_eviction(self.inner.id());
            self.inner.remove(key)?;
        }
        Ok(())
    }

    #[cfg(test)]
    fn tracked_len(&self) -> usize {
        self.tracked.lock().entries.len()
    }
}

fn upgrade(value: CacheValue) -> Option<CacheValue> {
    match value {
        CacheValue::Reclaimable(weak) => weak.upgrade().map(CacheValue::Rows),
        other => Some(other),
    }
}

impl<C: Cache> Cache for WeakCache<C> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn size(&self) -> usize {
        if let Err(e) = self.sweep_all() {
            tracing::warn!(cache.id = self.inner.id(), error = %e, "weak sweep failed");
        }
        self.inner.size()
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> CacheResult<()> {
        self.sweep()?;
        match value {
            CacheValue::Rows(rows) => {
                let weak = Arc::downgrade(&rows);
                self.tracked.lock().entries.insert(key.clone(), weak.clone());
                self.pin(rows);
                self.inner.put(key, CacheValue::Reclaimable(weak))
            }
            other => {
                self.tracked.lock().forget(&key);
                self.inner.put(key, other)
            }
        }
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        self.sweep()?;
        let Some(stored) = self.inner.get(key)? else {
            return Ok(None);
        };
        match upgrade(stored) {
            Some(CacheValue::Rows(rows)) => {
                self.pin(Arc::clone(&rows));
                Ok(Some(CacheValue::Rows(rows)))
            }
            Some(other) => Ok(Some(other)),
            None => {
                self.tracked.lock().forget(key);
                self.inner.remove(key)?;
                Ok(None)
            }
        }
    }

    fn remove(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        self.sweep()?;
        self.tracked.lock().forget(key);
        Ok(self.inner.remove(key)?.and_then(upgrade))
    }

    fn clear(&self) -> CacheResult<()> {
        self.hard_links.lock().clear();
        self.tracked.lock().clear();
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

    fn rows(n: usize) -> CacheValue {
        CacheValue::rows(vec![Row::new(); n])
    }

    #[test]
    fn test_default_hard_links() {
        let cache = WeakCache::new(PerpetualCache::new("weak"));
        assert_eq!(cache.hard_link_count(), 256);
    }

    #[test]
    fn test_pinned_value_survives() {
        let cache = WeakCache::new(PerpetualCache::new("weak"));
        cache.put(key(1), rows(2)).unwrap();

        let value = cache.get(&key(1)).unwrap().unwrap();
        assert_eq!(value.as_rows().unwrap().len(), 2);
    }

    #[test]
    fn test_unpinned_value_is_reclaimed() {
        let cache = WeakCache::with_hard_links(PerpetualCache::new("weak"), 1);
        cache.put(key(1), rows(1)).unwrap();
        cache.put(key(2), rows(1)).unwrap();

        assert!(cache.get(&key(1)).unwrap().is_none());
        assert!(cache.get(&key(2)).unwrap().is_some());
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn test_caller_reference_keeps_value_alive() {
        let cache = WeakCache::with_hard_links(PerpetualCache::new("weak"), 0);
        let held = Arc::new(vec![Row::new()]);
        cache.put(key(1), CacheValue::Rows(Arc::clone(&held))).unwrap();

        assert!(cache.get(&key(1)).unwrap().is_some());
        drop(held);
        assert!(cache.get(&key(1)).unwrap().is_none());
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_explicit_null_is_held_strongly() {
        let cache = WeakCache::with_hard_links(PerpetualCache::new("weak"), 0);
        cache.put(key(1), CacheValue::Null).unwrap();
        assert!(cache.get(&key(1)).unwrap().unwrap().is_null());
    }

    #[test]
    fn test_sweep_checks_a_bounded_batch() {
        let cache = WeakCache::with_hard_links(PerpetualCache::new("weak"), 0);
        let total = SWEEP_BATCH * 3;
        let held: Vec<Rows> = (0..total).map(|_| Arc::new(vec![Row::new()])).collect();
        for (n, rows) in held.iter().enumerate() {
            cache.put(key(n as i64), CacheValue::Rows(Arc::clone(rows))).unwrap();
        }
        assert_eq!(cache.tracked_len(), total);
        drop(held);

        cache.get(&key(-1)).unwrap();
        assert_eq!(cache.tracked_len(), total - SWEEP_BATCH);

        // Reclaimed rows are never returned, swept or not
        assert!(cache.get(&key(total as i64 - 1)).unwrap().is_none());
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.tracked_len(), 0);
    }

    #[test]
    fn test_repeated_sweeps_reach_every_entry() {
        let cache = WeakCache::with_hard_links(PerpetualCache::new("weak"), 0);
        let held = Arc::new(vec![Row::new()]);
        cache.put(key(0), CacheValue::Rows(Arc::clone(&held))).unwrap();
        for n in 1..(SWEEP_BATCH as i64 * 2) {
            cache.put(key(n), rows(1)).unwrap();
        }

        for _ in 0..4 {
            cache.remove(&key(-1)).unwrap();
        }
        assert_eq!(cache.tracked_len(), 1);
        assert_eq!(cache.inner.size(), 1);
        assert!(cache.get(&key(0)).unwrap().is_some());
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = WeakCache::new(PerpetualCache::new("weak"));
        cache.put(key(1), rows(1)).unwrap();
        cache.put(key(2), rows(1)).unwrap();

        let removed = cache.remove(&key(1)).unwrap().unwrap();
        assert!(removed.as_rows().is_some());

        cache.clear().unwrap();
        assert_eq!(cache.size(), 0);
    }
}
