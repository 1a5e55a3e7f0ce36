//! Configuration builder

use std::collections::HashMap;
use std::time::Duration;

use crate::Error;
use crate::cache::{CacheConfig, CacheRegistry, EvictionPolicy};
use crate::executor::{ExecutorSettings, LocalCacheScope};

/// Engine configuration: session settings, logging, and shared cache stacks
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: ExecutorSettings,
    pub log: LogConfig,
    /// Stack used by every namespace without an override
    pub cache: CacheConfig,
    pub namespaces: HashMap<String, CacheConfig>,
}

impl Config {
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    #[must_use]
    pub const fn cache_enabled(&self) -> bool {
        self.settings.cache_enabled
    }

    #[must_use]
    pub const fn local_cache_scope(&self) -> LocalCacheScope {
        self.settings.local_cache_scope
    }

    #[must_use]
    pub const fn log(&self) -> &LogConfig {
        &self.log
    }

    #[must_use]
    pub const fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    /// Settings for a new executor session
    #[must_use]
    pub fn executor_settings(&self) -> ExecutorSettings {
        self.settings.clone()
    }

    /// Registry that builds shared caches from this configuration
    #[must_use]
    pub fn cache_registry(&self) -> CacheRegistry {
        CacheRegistry::new(self.cache).with_overrides(self.namespaces.clone())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Configuration builder with fluent API
#[derive(Debug)]
pub struct ConfigBuilder {
    settings: ExecutorSettings,
    log_level: String,
    json_logs: bool,
    cache: CacheConfig,
    namespaces: HashMap<String, CacheConfig>,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: ExecutorSettings::new(),
            log_level: String::new(),
            json_logs: false,
            cache: CacheConfig::new(),
            namespaces: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn cache_enabled(mut self, enabled: bool) -> Self {
        self.settings.cache_enabled = enabled;
        self
    }

    #[must_use]
    pub const fn local_cache_scope(mut self, scope: LocalCacheScope) -> Self {
        self.settings.local_cache_scope = scope;
        self
    }

    #[must_use]
    pub fn environment_id(mut self, environment_id: Option<String>) -> Self {
        self.settings.environment_id = environment_id;
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: String) -> Self {
        self.log_level = level;
        self
    }

    #[must_use]
    pub const fn json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    // Default cache stack

    /// Replace the default cache stack
    #[must_use]
    pub const fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    #[must_use]
    pub const fn eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.cache.eviction = eviction;
        self
    }

    #[must_use]
    pub const fn cache_size(mut self, size: usize) -> Self {
        self.cache.size = size;
        self
    }

    #[must_use]
    pub const fn blocking(mut self, blocking: bool) -> Self {
        self.cache.blocking = blocking;
        self
    }

    /// Maximum wait for a key lock; `None` waits forever
    #[must_use]
    pub const fn blocking_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.cache.blocking_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn cache_logging(mut self, logging: bool) -> Self {
        self.cache.logging = logging;
        self
    }

    /// Use `config` for the shared cache of `namespace`
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>, config: CacheConfig) -> Self {
        self.namespaces.insert(namespace.into(), config);
        self
    }

    /// Build the configuration
    pub fn build(self) -> crate::Result<Config> {
        validate_cache("default", &self.cache)?;
        for (namespace, config) in &self.namespaces {
            validate_cache(namespace, config)?;
        }

        let log_level = if self.log_level.is_empty() {
            "info".to_string()
        } else {
            self.log_level
        };

        Ok(Config {
            settings: self.settings,
            log: LogConfig {
                log_level,
                json_logs: self.json_logs,
            },
            cache: self.cache,
            namespaces: self.namespaces,
        })
    }
}

fn validate_cache(name: &str, config: &CacheConfig) -> crate::Result<()> {
    let bounded = matches!(config.eviction, EvictionPolicy::Lru | EvictionPolicy::Fifo);
    if bounded && config.size == 0 {
        return Err(Error::Config(format!(
            "cache '{name}': {} eviction size must be greater than zero",
            config.eviction.as_str()
        )));
    }
    Ok(())
}
