//! Logging and metrics for the cache engine

#[cfg(feature = "metrics")]
mod metrics;

#[cfg(feature = "metrics")]
pub use self::metrics::{describe_metrics, record_cache_eviction, record_cache_hit, record_cache_miss};

use crate::Result;
use crate::config::LogConfig;
use crate::constants::SERVICE_NAME;
use crate::error::Error;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured level. Fails if a global subscriber is
/// already set.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))?;

    #[cfg(feature = "metrics")]
    describe_metrics();

    tracing::info!(service = SERVICE_NAME, json = config.json_logs, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_only_once() {
        let config = LogConfig {
            log_level: "warn".to_string(),
            json_logs: false,
        };

        // Another test may have installed a subscriber first
        let first = init_logging(&config);
        let second = init_logging(&config);
        assert!(second.is_err());
        assert!(second.unwrap_err().is_config());
        drop(first);
    }

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }
}
