//! Shared (second-level) cache layer
//!
//! Every behavior is a decorator over the [`Cache`] capability, so a stack is
//! assembled by wrapping:
//!
//! - [`PerpetualCache`] - unbounded store at the bottom of every stack
//! - [`LruCache`], [`FifoCache`], [`WeakCache`] - eviction policies
//! - [`LoggingCache`] - hit/miss accounting and tracing
//! - [`BlockingCache`] - per-key locking so one caller computes a miss
//!
//! [`create_cache`] builds a stack from a [`CacheConfig`]; [`CacheRegistry`]
//! keeps one per namespace.

mod blocking;
mod config;
mod error;
mod fifo;
mod key;
mod logging;
mod lru;
mod perpetual;
mod provider;
mod registry;
mod weak;

use std::num::NonZeroUsize;
use std::sync::Arc;

pub use self::lru::LruCache;
pub use blocking::BlockingCache;
pub use config::{CacheConfig, EvictionPolicy, ParseEvictionPolicyError};
pub use error::{CacheError, CacheResult};
pub use fifo::FifoCache;
pub use key::CacheKey;
pub use logging::LoggingCache;
pub use perpetual::PerpetualCache;
pub use provider::{Cache, CacheStats, CacheValue};
pub use registry::CacheRegistry;
pub use weak::WeakCache;

/// Create a shared cache stack based on configuration.
///
/// Layers from the inside out: perpetual store, eviction policy, logging,
/// blocking.
#[must_use]
pub fn create_cache(id: impl Into<String>, config: &CacheConfig) -> Arc<dyn Cache> {
    let store = PerpetualCache::new(id);

    let evicting: Box<dyn Cache> = match config.eviction {
        EvictionPolicy::Lru => {
            let capacity = NonZeroUsize::new(config.size).unwrap_or(NonZeroUsize::MIN);
            Box::new(LruCache::with_capacity(store, capacity))
        }
        EvictionPolicy::Fifo => Box::new(FifoCache::with_size(store, config.size.max(1))),
        EvictionPolicy::Weak => Box::new(WeakCache::with_hard_links(store, config.size)),
        EvictionPolicy::None => Box::new(store),
    };

    let logged: Box<dyn Cache> = if config.logging {
        Box::new(LoggingCache::new(evicting))
    } else {
        evicting
    };

    if config.blocking {
        Arc::new(BlockingCache::new(logged).with_timeout(config.blocking_timeout))
    } else {
        Arc::from(logged)
    }
}
