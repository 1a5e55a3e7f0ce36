//! Row, parameter and paging types exchanged with the query runner

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::constants::NO_ROW_LIMIT;
use crate::value::Value;

/// A result row: column name to value
pub type Row = BTreeMap<String, Value>;

/// Output parameters of a callable statement: parameter name to value
pub type ParameterBag = BTreeMap<String, Value>;

/// Shared, immutable result list as stored in both cache tiers
pub type Rows = Arc<Vec<Row>>;

/// Paging window applied to a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowBounds {
    pub offset: usize,
    pub limit: usize,
}

impl RowBounds {
    /// No offset, no limit
    pub const DEFAULT: Self = Self {
        offset: 0,
        limit: NO_ROW_LIMIT,
    };

    #[must_use]
    pub const fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.offset == 0 && self.limit == NO_ROW_LIMIT
    }
}

impl Default for RowBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_bounds_default_is_unbounded() {
        let bounds = RowBounds::default();
        assert_eq!(bounds.offset, 0);
        assert_eq!(bounds.limit, NO_ROW_LIMIT);
        assert!(bounds.is_unbounded());
    }

    #[test]
    fn test_row_bounds_new() {
        let bounds = RowBounds::new(10, 20);
        assert_eq!(bounds.offset, 10);
        assert_eq!(bounds.limit, 20);
        assert!(!bounds.is_unbounded());
    }
}
