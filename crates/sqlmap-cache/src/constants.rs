//! Constants shared by the cache layers

/// Multiplier applied to the running hash on every key update
pub const KEY_MULTIPLIER: i32 = 37;

/// Initial hash of an empty cache key
pub const KEY_SEED: i32 = 17;

/// Default capacity of the LRU and FIFO eviction decorators
pub const DEFAULT_EVICTION_SIZE: usize = 1024;

/// Default number of strong references pinned by the weak decorator
pub const DEFAULT_HARD_LINKS: usize = 256;

/// Row limit meaning "no limit"
pub const NO_ROW_LIMIT: usize = i32::MAX as usize;

/// Service name used for spans and the default log target
pub const SERVICE_NAME: &str = "sqlmap-cache";
