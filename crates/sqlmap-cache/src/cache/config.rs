//! Cache configuration types

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::constants::DEFAULT_EVICTION_SIZE;

/// Eviction policy applied around the perpetual store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    #[default]
    Lru,
    Fifo,
    Weak,
    /// Unbounded; entries stay until removed or cleared
    None,
}

impl EvictionPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lru => "lru",
            Self::Fifo => "fifo",
            Self::Weak => "weak",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown eviction policy '{0}', expected one of: lru, fifo, weak, none")]
pub struct ParseEvictionPolicyError(pub String);

impl FromStr for EvictionPolicy {
    type Err = ParseEvictionPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lru" => Ok(Self::Lru),
            "fifo" => Ok(Self::Fifo),
            "weak" | "soft" => Ok(Self::Weak),
            "none" | "perpetual" => Ok(Self::None),
            other => Err(ParseEvictionPolicyError(other.to_string())),
        }
    }
}

/// Shape of one shared cache's decorator stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub eviction: EvictionPolicy,
    /// Capacity for LRU/FIFO; number of pinned strong references for weak
    pub size: usize,
    /// Serialize concurrent misses per key
    pub blocking: bool,
    /// Maximum wait for a key lock; `None` waits forever
    pub blocking_timeout: Option<Duration>,
    /// Count hits and trace traffic
    pub logging: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            eviction: EvictionPolicy::Lru,
            size: DEFAULT_EVICTION_SIZE,
            blocking: false,
            blocking_timeout: None,
            logging: true,
        }
    }

    #[must_use]
    pub const fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    #[must_use]
    pub const fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub const fn with_blocking(mut self, timeout: Option<Duration>) -> Self {
        self.blocking = true;
        self.blocking_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_policy_from_str() {
        assert_eq!("lru".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lru);
        assert_eq!("LRU".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lru);
        assert_eq!("Fifo".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Fifo);
        assert_eq!("weak".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Weak);
        assert_eq!("soft".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Weak);
        assert_eq!(" none ".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::None);
    }

    #[test]
    fn test_eviction_policy_from_str_unknown() {
        let err = "random".parse::<EvictionPolicy>().unwrap_err();
        assert_eq!(err, ParseEvictionPolicyError("random".to_string()));
        assert!(err.to_string().contains("lru, fifo, weak, none"));
    }

    #[test]
    fn test_eviction_policy_round_trips_name() {
        for policy in [
            EvictionPolicy::Lru,
            EvictionPolicy::Fifo,
            EvictionPolicy::Weak,
            EvictionPolicy::None,
        ] {
            assert_eq!(policy.as_str().parse::<EvictionPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.eviction, EvictionPolicy::Lru);
        assert_eq!(config.size, 1024);
        assert!(!config.blocking);
        assert!(config.blocking_timeout.is_none());
        assert!(config.logging);
        assert_eq!(config, CacheConfig::new());
    }

    #[test]
    fn test_cache_config_builders() {
        let config = CacheConfig::new()
            .with_eviction(EvictionPolicy::Fifo)
            .with_size(10)
            .with_blocking(Some(Duration::from_millis(500)))
            .with_logging(false);
        assert_eq!(config.eviction, EvictionPolicy::Fifo);
        assert_eq!(config.size, 10);
        assert!(config.blocking);
        assert_eq!(config.blocking_timeout, Some(Duration::from_millis(500)));
        assert!(!config.logging);
    }
}
