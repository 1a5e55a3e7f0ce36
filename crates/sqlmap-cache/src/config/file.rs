//! TOML configuration file loading

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::builder::ConfigBuilder;
use crate::Result;
use crate::cache::{CacheConfig, EvictionPolicy};
use crate::executor::LocalCacheScope;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./sqlmap-cache.toml",
    "~/.config/sqlmap-cache/config.toml",
    "/etc/sqlmap-cache/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    builder = apply_file_config(builder, file_config)?;
    Ok(builder)
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    // Session settings
    if let Some(settings) = config.settings {
        if let Some(enabled) = settings.cache_enabled {
            builder = builder.cache_enabled(enabled);
        }

        if let Some(scope) = settings.local_cache_scope {
            let scope = scope
                .parse::<LocalCacheScope>()
                .map_err(|e| crate::Error::Config(format!("settings.local_cache_scope: {e}")))?;
            builder = builder.local_cache_scope(scope);
        }

        if let Some(environment_id) = settings.environment_id {
            builder = builder.environment_id(Some(environment_id));
        }
    }

    // Logging
    if let Some(logging) = config.logging {
        if let Some(level) = logging.log_level {
            builder = builder.log_level(level);
        }

        if let Some(json) = logging.json_logs {
            builder = builder.json_logs(json);
        }
    }

    // Default stack, then namespace overrides layered on top of it
    let mut default = CacheConfig::new();
    if let Some(cache) = config.cache {
        default = cache.apply_to(default)?;
        builder = builder.cache(default);
    }

    for (namespace, section) in config.namespaces {
        let stack = section
            .apply_to(default)
            .map_err(|e| crate::Error::Config(format!("namespace '{namespace}': {e}")))?;
        builder = builder.namespace(namespace, stack);
    }

    Ok(builder)
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    settings: Option<SettingsConfig>,
    logging: Option<LoggingConfig>,
    cache: Option<CacheSection>,
    #[serde(default)]
    namespaces: HashMap<String, CacheSection>,
}

#[derive(Debug, Deserialize)]
struct SettingsConfig {
    cache_enabled: Option<bool>,
    local_cache_scope: Option<String>,
    environment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoggingConfig {
    log_level: Option<String>,
    json_logs: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CacheSection {
    eviction: Option<String>,
    size: Option<usize>,
    blocking: Option<bool>,
    blocking_timeout_ms: Option<u64>,
    logging: Option<bool>,
}

impl CacheSection {
    fn apply_to(self, mut config: CacheConfig) -> Result<CacheConfig> {
        if let Some(eviction) = self.eviction {
            config.eviction = eviction
                .parse::<EvictionPolicy>()
                .map_err(|e| crate::Error::Config(e.to_string()))?;
        }
        if let Some(size) = self.size {
            config.size = size;
        }
        if let Some(blocking) = self.blocking {
            config.blocking = blocking;
        }
        if let Some(ms) = self.blocking_timeout_ms {
            config.blocking_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(logging) = self.logging {
            config.logging = logging;
        }
        Ok(config)
    }
}
