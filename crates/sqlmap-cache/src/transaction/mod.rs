//! Transactional buffering of shared-cache writes

mod cache;
mod manager;

pub use cache::TransactionalCache;
pub use manager::TransactionalCacheManager;
