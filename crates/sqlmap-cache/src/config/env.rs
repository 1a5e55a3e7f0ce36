//! Environment variable loading for configuration

use std::env;
use std::time::Duration;

use super::builder::ConfigBuilder;
use crate::Result;
use crate::cache::EvictionPolicy;
use crate::executor::LocalCacheScope;

/// Environment variable names
mod vars {
    pub const SQLMAP_CACHE_ENABLED: &str = "SQLMAP_CACHE_ENABLED";
    pub const SQLMAP_LOCAL_CACHE_SCOPE: &str = "SQLMAP_LOCAL_CACHE_SCOPE";
    pub const SQLMAP_ENVIRONMENT: &str = "SQLMAP_ENVIRONMENT";
    pub const SQLMAP_CACHE_EVICTION: &str = "SQLMAP_CACHE_EVICTION";
    pub const SQLMAP_CACHE_SIZE: &str = "SQLMAP_CACHE_SIZE";
    pub const SQLMAP_CACHE_BLOCKING: &str = "SQLMAP_CACHE_BLOCKING";
    pub const SQLMAP_CACHE_BLOCKING_TIMEOUT_MS: &str = "SQLMAP_CACHE_BLOCKING_TIMEOUT_MS";
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const SQLMAP_JSON_LOGS: &str = "SQLMAP_JSON_LOGS";
}

/// Load configuration from environment variables
pub fn load_from_env(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    if let Ok(val) = env::var(vars::SQLMAP_CACHE_ENABLED) {
        builder = builder.cache_enabled(parse_bool(&val));
    }

    if let Ok(scope_str) = env::var(vars::SQLMAP_LOCAL_CACHE_SCOPE) {
        let scope = scope_str.parse::<LocalCacheScope>().map_err(|e| {
            crate::Error::Config(format!("Invalid {}: {}", vars::SQLMAP_LOCAL_CACHE_SCOPE, e))
        })?;
        builder = builder.local_cache_scope(scope);
    }

    if let Ok(environment_id) = env::var(vars::SQLMAP_ENVIRONMENT) {
        let environment_id = Some(environment_id).filter(|id| !id.is_empty());
        builder = builder.environment_id(environment_id);
    }

    // Default cache stack
    if let Ok(eviction_str) = env::var(vars::SQLMAP_CACHE_EVICTION) {
        let eviction = eviction_str.parse::<EvictionPolicy>().map_err(|e| {
            crate::Error::Config(format!("Invalid {}: {}", vars::SQLMAP_CACHE_EVICTION, e))
        })?;
        builder = builder.eviction(eviction);
    }

    if let Ok(size_str) = env::var(vars::SQLMAP_CACHE_SIZE)
        && let Ok(size) = size_str.parse::<usize>()
    {
        builder = builder.cache_size(size);
    }

    if let Ok(val) = env::var(vars::SQLMAP_CACHE_BLOCKING) {
        builder = builder.blocking(parse_bool(&val));
    }

    if let Ok(timeout_str) = env::var(vars::SQLMAP_CACHE_BLOCKING_TIMEOUT_MS)
        && let Ok(ms) = timeout_str.parse::<u64>()
    {
        builder = builder.blocking_timeout((ms > 0).then(|| Duration::from_millis(ms)));
    }

    // Logging
    if let Ok(level) = env::var(vars::RUST_LOG) {
        builder = builder.log_level(level);
    }

    if let Ok(val) = env::var(vars::SQLMAP_JSON_LOGS) {
        builder = builder.json_logs(parse_bool(&val));
    }

    Ok(builder)
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
