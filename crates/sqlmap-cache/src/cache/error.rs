//! Cache error types

use std::time::Duration;

use thiserror::Error;

/// Cache operation errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Couldn't get a lock in {timeout:?} for the key {key} at the cache {cache}")]
    LockTimeout {
        cache: String,
        key: String,
        timeout: Duration,
    },

    #[error("Got interrupted while trying to acquire lock for key {key} at the cache {cache}")]
    Interrupted { cache: String, key: String },

    #[error("Cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    #[must_use]
    pub const fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
