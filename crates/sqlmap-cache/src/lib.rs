//! Query-result caching engine for SQL mappers
//!
//! Two tiers sit between a session and the store: a per-session local cache
//! owned by the [`Executor`](executor::Executor) and shared caches built as
//! decorator stacks per namespace. Shared-cache writes are buffered per
//! transaction and become visible on commit.

pub mod cache;
pub mod config;
mod constants;
mod error;
pub mod executor;
pub mod observability;
pub mod transaction;
pub mod types;
pub mod value;

pub use cache::{
    BlockingCache, Cache, CacheConfig, CacheError, CacheKey, CacheRegistry, CacheResult,
    CacheStats, CacheValue, EvictionPolicy, FifoCache, LoggingCache, LruCache, PerpetualCache,
    WeakCache, create_cache,
};
pub use config::{Config, ConfigBuilder, LogConfig};
pub use error::{Error, Result};
pub use executor::{
    BoundSql, Executor, ExecutorSettings, LocalCacheScope, MappedStatement, QueryOutput,
    StatementRunner,
};
pub use transaction::{TransactionalCache, TransactionalCacheManager};
pub use types::*;
pub use value::Value;
