//! Configuration management
//!
//! Supports configuration loading with precedence: env > file > defaults

mod builder;
mod env;
mod file;

pub use builder::{Config, ConfigBuilder, LogConfig};

use crate::Result;

/// Load configuration with precedence: env > file > defaults
pub fn load_config() -> Result<ConfigBuilder> {
    let mut builder = ConfigBuilder::new();

    // Load from config file if exists
    if let Some(path) = file::find_config_file() {
        tracing::info!("Loading configuration from {}", path.display());
        builder = file::load_from_file(&path, builder)?;
    }

    // Override with environment variables
    builder = env::load_from_env(builder)?;

    Ok(builder)
}

/// Load configuration from a specific file path
pub fn load_config_from_path(path: &std::path::Path) -> Result<ConfigBuilder> {
    tracing::info!("Loading configuration from {}", path.display());
    let mut builder = file::load_from_file(path, ConfigBuilder::new())?;

    // Override with environment variables
    builder = env::load_from_env(builder)?;

    Ok(builder)
}
