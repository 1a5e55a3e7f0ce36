//! Cache capability trait and stored value type

use std::fmt;
use std::sync::{Arc, Weak};

use super::error::CacheResult;
use super::key::CacheKey;
use crate::types::{Row, Rows};

/// Value held by a shared cache.
///
/// `Null` is an explicit entry that records "this key was looked up and
/// resolved to nothing". It is distinct from an absent entry (`None` from
/// [`Cache::get`]).
#[derive(Debug, Clone)]
pub enum CacheValue {
    Null,
    Rows(Rows),
    /// Weakly held result list, installed by [`WeakCache`](super::WeakCache)
    /// into its delegate
    Reclaimable(Weak<Vec<Row>>),
}

impl CacheValue {
    #[must_use]
    pub fn rows(rows: Vec<Row>) -> Self {
        Self::Rows(Arc::new(rows))
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Strongly held rows, if any
    #[must_use]
    pub fn as_rows(&self) -> Option<&Rows> {
        match self {
            Self::Rows(rows) => Some(rows),
            _ => None,
        }
    }
}

/// Hit statistics collected by [`LoggingCache`](super::LoggingCache)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub requests: u64,
    pub hits: u64,
}

impl CacheStats {
    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.requests - self.hits
    }

    /// Ratio of hits to requests, 0.0 before the first request
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.requests as f64
        }
    }
}

/// Minimal key/value cache capability.
///
/// Every cache behavior (eviction, locking, logging, transactional
/// buffering) implements this trait by wrapping another implementation, so
/// stacks can be composed in any order.
pub trait Cache: Send + Sync + fmt::Debug {
    /// Identity of the cache; decorators report their delegate's identity
    fn id(&self) -> &str;

    /// Number of entries held by the innermost store
    fn size(&self) -> usize;

    fn put(&self, key: CacheKey, value: CacheValue) -> CacheResult<()>;

    fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>>;

    fn remove(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>>;

    fn clear(&self) -> CacheResult<()>;
}

impl<C: Cache + ?Sized> Cache for Arc<C> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> CacheResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        (**self).get(key)
    }

    fn remove(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        (**self).remove(key)
    }

    fn clear(&self) -> CacheResult<()> {
        (**self).clear()
    }
}

impl<C: Cache + ?Sized> Cache for Box<C> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> CacheResult<()> {
        (**self).put(key, value)
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        (**self).get(key)
    }

    fn remove(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        (**self).remove(key)
    }

    fn clear(&self) -> CacheResult<()> {
        (**self).clear()
    }
}
