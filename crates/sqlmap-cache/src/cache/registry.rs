//! Shared caches, one per mapper namespace

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::config::CacheConfig;
use super::create_cache;
use super::error::CacheResult;
use super::provider::Cache;

/// Holds one shared cache per namespace, built on first use.
///
/// A namespace with its own [`CacheConfig`] gets that stack; every other
/// namespace gets the default.
pub struct CacheRegistry {
    default: CacheConfig,
    overrides: HashMap<String, CacheConfig>,
    caches: RwLock<HashMap<String, Arc<dyn Cache>>>,
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut namespaces: Vec<String> = self.caches.read().keys().cloned().collect();
        namespaces.sort();
        f.debug_struct("CacheRegistry")
            .field("default", &self.default)
            .field("overrides", &self.overrides.len())
            .field("namespaces", &namespaces)
            .finish()
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl CacheRegistry {
    #[must_use]
    pub fn new(default: CacheConfig) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
            caches: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: HashMap<String, CacheConfig>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Configuration used for `namespace`
    #[must_use]
    pub fn config_for(&self, namespace: &str) -> &CacheConfig {
        self.overrides.get(namespace).unwrap_or(&self.default)
    }

    /// Shared cache for `namespace`, created on first request
    pub fn cache(&self, namespace: &str) -> Arc<dyn Cache> {
        if let Some(cache) = self.caches.read().get(namespace) {
            return Arc::clone(cache);
        }

        let mut caches = self.caches.write();
        let cache = caches.entry(namespace.to_string()).or_insert_with(|| {
            let config = self.config_for(namespace);
            tracing::debug!(
                cache.id = namespace,
                cache.eviction = config.eviction.as_str(),
                cache.size = config.size,
                cache.blocking = config.blocking,
                "Creating shared cache"
            );
            create_cache(namespace, config)
        });
        Arc::clone(cache)
    }

    /// Already-created cache for `namespace`, if any
    #[must_use]
    pub fn get(&self, namespace: &str) -> Option<Arc<dyn Cache>> {
        self.caches.read().get(namespace).cloned()
    }

    /// Namespaces with a created cache, sorted
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Clear every created cache, stopping at the first failure
    pub fn clear_all(&self) -> CacheResult<()> {
        let caches: Vec<Arc<dyn Cache>> = self.caches.read().values().cloned().collect();
        for cache in caches {
            cache.clear()?;
        }
        Ok(())
    }
}
