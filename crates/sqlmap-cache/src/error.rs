use thiserror::Error;

use crate::cache::CacheError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Executor was closed.")]
    ExecutorClosed,

    #[error("Circular query: statement {0} is already being executed for the same key")]
    CircularQuery(String),

    #[error(
        "Caching stored procedures with OUT params is not supported. Please configure use_cache=false in {0} statement."
    )]
    OutParamsNotCacheable(String),
}

impl Error {
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    #[must_use]
    pub const fn is_cache(&self) -> bool {
        matches!(self, Self::Cache(_))
    }

    #[must_use]
    pub const fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::Cache(e) if e.is_lock_timeout())
    }

    #[must_use]
    pub const fn is_query(&self) -> bool {
        matches!(self, Self::Query(_))
    }

    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::ExecutorClosed)
    }

    #[must_use]
    pub const fn is_circular_query(&self) -> bool {
        matches!(self, Self::CircularQuery(_))
    }

    #[must_use]
    pub const fn is_out_params_not_cacheable(&self) -> bool {
        matches!(self, Self::OutParamsNotCacheable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
