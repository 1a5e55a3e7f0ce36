//! Loads that wait for an in-flight query to resolve

use super::local::{LocalCache, LocalLookup};
use crate::cache::CacheKey;
use crate::types::Rows;

/// Receives the rows of a resolved key
pub type LoadTarget = Box<dyn FnOnce(Rows) + Send>;

pub(crate) struct DeferredLoad {
    key: CacheKey,
    target: LoadTarget,
}

impl std::fmt::Debug for DeferredLoad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredLoad")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl DeferredLoad {
    pub(crate) fn new(key: CacheKey, target: LoadTarget) -> Self {
        Self { key, target }
    }

    /// Hand the resolved rows to the target. A key that is still absent or
    /// in flight is skipped with a warning.
    pub(crate) fn load(self, local: &LocalCache) -> bool {
        match local.lookup(&self.key) {
            LocalLookup::Resolved(rows) => {
                (self.target)(rows);
                true
            }
            state => {
                tracing::warn!(
                    cache.key = %self.key,
                    local.state = ?state,
                    "deferred load skipped: key not resolved"
                );
                false
            }
        }
    }
}
