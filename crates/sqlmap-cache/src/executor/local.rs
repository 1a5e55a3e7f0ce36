//! Session-scope (local) cache

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::cache::CacheKey;
use crate::types::{ParameterBag, Rows};

/// Lifetime of the local cache inside a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalCacheScope {
    /// Kept until commit, rollback, an update, or an explicit clear
    #[default]
    Session,
    /// Cleared after every top-level query
    Statement,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown local cache scope '{0}', expected one of: session, statement")]
pub struct ParseLocalCacheScopeError(pub String);

impl FromStr for LocalCacheScope {
    type Err = ParseLocalCacheScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "session" => Ok(Self::Session),
            "statement" => Ok(Self::Statement),
            other => Err(ParseLocalCacheScopeError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
enum LocalEntry {
    Placeholder,
    Resolved(Rows),
}

/// State of a key in the local cache
#[derive(Debug, Clone)]
pub enum LocalLookup {
    Absent,
    /// A query for this key is currently executing
    InFlight,
    Resolved(Rows),
}

impl LocalLookup {
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }

    #[must_use]
    pub const fn rows(&self) -> Option<&Rows> {
        match self {
            Self::Resolved(rows) => Some(rows),
            _ => None,
        }
    }
}

/// Per-session result cache plus the callable OUT-parameter cache.
///
/// Owned by a single executor, so no locking.
#[derive(Debug, Default)]
pub(crate) struct LocalCache {
    entries: HashMap<CacheKey, LocalEntry>,
    out_params: HashMap<CacheKey, ParameterBag>,
}

impl LocalCache {
    pub(crate) fn lookup(&self, key: &CacheKey) -> LocalLookup {
        match self.entries.get(key) {
            None => LocalLookup::Absent,
            Some(LocalEntry::Placeholder) => LocalLookup::InFlight,
            Some(LocalEntry::Resolved(rows)) => LocalLookup::Resolved(Arc::clone(rows)),
        }
    }

    pub(crate) fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn mark_in_flight(&mut self, key: CacheKey) {
        self.entries.insert(key, LocalEntry::Placeholder);
    }

    pub(crate) fn resolve(&mut self, key: CacheKey, rows: Rows) {
        self.entries.insert(key, LocalEntry::Resolved(rows));
    }

    pub(crate) fn remove(&mut self, key: &CacheKey) {
        self.entries.remove(key);
    }

    pub(crate) fn store_out_params(&mut self, key: CacheKey, params: ParameterBag) {
        self.out_params.insert(key, params);
    }

    pub(crate) fn out_params(&self, key: &CacheKey) -> Option<&ParameterBag> {
        self.out_params.get(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.out_params.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Row;
    use crate::value::Value;

    fn key(n: i64) -> CacheKey {
        CacheKey::from_components([n])
    }

    #[test]
    fn test_scope_from_str() {
        assert_eq!("statement".parse::<LocalCacheScope>().unwrap(), LocalCacheScope::Statement);
        assert_eq!("STATEMENT".parse::<LocalCacheScope>().unwrap(), LocalCacheScope::Statement);
        assert_eq!("session".parse::<LocalCacheScope>().unwrap(), LocalCacheScope::Session);
        assert_eq!(" Session ".parse::<LocalCacheScope>().unwrap(), LocalCacheScope::Session);

        let err = "statment".parse::<LocalCacheScope>().unwrap_err();
        assert_eq!(err, ParseLocalCacheScopeError("statment".to_string()));
        assert!("".parse::<LocalCacheScope>().is_err());
    }

    #[test]
    fn test_three_states() {
        let mut local = LocalCache::default();
        assert!(local.lookup(&key(1)).is_absent());

        local.mark_in_flight(key(1));
        assert!(local.lookup(&key(1)).is_in_flight());
        assert!(local.contains(&key(1)));

        local.resolve(key(1), Arc::new(vec![Row::new()]));
        assert_eq!(local.lookup(&key(1)).rows().map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_remove_placeholder() {
        let mut local = LocalCache::default();
        local.mark_in_flight(key(1));
        local.remove(&key(1));
        assert!(local.lookup(&key(1)).is_absent());
        assert_eq!(local.len(), 0);
    }

    #[test]
    fn test_clear_drops_out_params() {
        let mut local = LocalCache::default();
        let mut bag = ParameterBag::new();
        bag.insert("total".to_string(), Value::Int(3));
        local.store_out_params(key(1), bag);
        local.resolve(key(1), Arc::new(Vec::new()));

        assert!(local.out_params(&key(1)).is_some());
        local.clear();
        assert!(local.out_params(&key(1)).is_none());
        assert_eq!(local.len(), 0);
    }
}
