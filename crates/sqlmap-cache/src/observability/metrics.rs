//! Cache counters published through the `metrics` facade
//!
//! No exporter is installed here; the embedding application installs a
//! recorder and these counters flow to it.

use metrics::{counter, describe_counter};

const METRIC_CACHE_HITS: &str = "sqlmap_cache_hits_total";
const METRIC_CACHE_MISSES: &str = "sqlmap_cache_misses_total";
const METRIC_CACHE_EVICTIONS: &str = "sqlmap_cache_evictions_total";

/// Attach descriptions to the cache counters of the installed recorder.
pub fn describe_metrics() {
    describe_counter!(METRIC_CACHE_HITS, "Total shared cache hits");
    describe_counter!(METRIC_CACHE_MISSES, "Total shared cache misses");
    describe_counter!(METRIC_CACHE_EVICTIONS, "Total shared cache evictions");
}

/// Record a cache hit.
pub fn record_cache_hit(cache_id: &str) {
    counter!(METRIC_CACHE_HITS, "cache" => cache_id.to_owned()).increment(1);
}

/// Record a cache miss.
pub fn record_cache_miss(cache_id: &str) {
    counter!(METRIC_CACHE_MISSES, "cache" => cache_id.to_owned()).increment(1);
}

/// Record a cache eviction.
pub fn record_cache_eviction(cache_id: &str) {
    counter!(METRIC_CACHE_EVICTIONS, "cache" => cache_id.to_owned()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_recorder_is_noop() {
        describe_metrics();
        record_cache_hit("users");
        record_cache_miss("users");
        record_cache_eviction("users");
    }
}
