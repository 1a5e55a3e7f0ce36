//! Hit-ratio accounting decorator

use std::sync::atomic::{AtomicU64, Ordering};

use super::error::CacheResult;
use super::key::CacheKey;
use super::provider::{Cache, CacheStats, CacheValue};

/// Wrapper that counts requests and hits and traces cache traffic.
///
/// Uses debug-level spans so cache keys (which embed SQL text) stay out of
/// production logs. Values and control flow pass through untouched.
pub struct LoggingCache<C> {
    inner: C,
    requests: AtomicU64,
    hits: AtomicU64,
}

impl<C: std::fmt::Debug> std::fmt::Debug for LoggingCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingCache")
            .field("inner", &self.inner)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<C> LoggingCache<C> {
    pub const fn new(inner: C) -> Self {
        Self {
            inner,
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            requests: self.requests.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
        }
    }

    pub fn hit_ratio(&self) -> f64 {
        self.stats().hit_ratio()
    }
}

impl<C: Cache> Cache for LoggingCache<C> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }

    fn put(&self, key: CacheKey, value: CacheValue) -> CacheResult<()> {
        let span = tracing::debug_span!("cache.put", cache.id = self.inner.id(), cache.key = %key);
        let _entered = span.enter();

        let result = self.inner.put(key, value);
        if let Err(ref e) = result {
            tracing::warn!(cache.operation = "put", error = %e);
        }
        result
    }

    fn get(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        let span = tracing::debug_span!("cache.get", cache.id = self.inner.id(), cache.key = %key);
        let _entered = span.enter();

        self.requests.fetch_add(1, Ordering::Relaxed);
        let result = self.inner.get(key);

        match &result {
            Ok(Some(_)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(cache.result = "hit");
                #[cfg(feature = "metrics")]
                crate::observability::record_cache_hit(self.inner.id());
            }
            Ok(None) => {
                tracing::debug!(cache.result = "miss");
                #[cfg(feature = "metrics")]
                crate::observability::record_cache_miss(self.inner.id());
            }
            Err(e) => {
                tracing::warn!(cache.result = "error", error = %e);
            }
        }
        let ratio = self.hit_ratio();
        tracing::debug!(cache.hit_ratio = ratio, "Cache Hit Ratio [{}]: {ratio}", self.inner.id());

        result
    }

    fn remove(&self, key: &CacheKey) -> CacheResult<Option<CacheValue>> {
        let span =
            tracing::debug_span!("cache.remove", cache.id = self.inner.id(), cache.key = %key);
        let _entered = span.enter();

        let result = self.inner.remove(key);
        match &result {
            Ok(removed) => tracing::debug!(cache.operation = "remove", cache.removed = removed.is_some()),
            Err(e) => tracing::warn!(cache.operation = "remove", error = %e),
        }
        result
    }

    fn clear(&self) -> CacheResult<()> {
        let span = tracing::debug_span!("cache.clear", cache.id = self.inner.id());
        let _entered = span.enter();

        let result = self.inner.clear();
        if let Err(ref e) = result {
            tracing::warn!(cache.operation = "clear", error = %e);
        }
        result
    }
}
