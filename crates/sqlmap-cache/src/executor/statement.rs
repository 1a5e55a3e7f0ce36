//! Statement descriptors and bound parameters handed to the executor

use std::sync::Arc;

use crate::cache::Cache;
use crate::types::ParameterBag;
use crate::value::Value;

/// SQL command kind of a mapped statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlCommandKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl SqlCommandKind {
    #[must_use]
    pub const fn is_select(&self) -> bool {
        matches!(self, Self::Select)
    }
}

/// How the statement is sent to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatementType {
    Statement,
    #[default]
    Prepared,
    /// Stored procedure call; may return OUT parameters
    Callable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

/// One `?` placeholder of a bound statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMapping {
    pub name: String,
    pub mode: ParameterMode,
    pub value: Value,
}

impl ParameterMapping {
    pub fn input(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            mode: ParameterMode::In,
            value: value.into(),
        }
    }

    pub fn output(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: ParameterMode::Out,
            value: Value::Null,
        }
    }

    pub fn in_out(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            mode: ParameterMode::InOut,
            value: value.into(),
        }
    }
}

/// SQL text with its ordered parameter mappings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSql {
    sql: String,
    parameters: Vec<ParameterMapping>,
}

impl BoundSql {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, mapping: ParameterMapping) -> Self {
        self.parameters.push(mapping);
        self
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn parameters(&self) -> &[ParameterMapping] {
        &self.parameters
    }

    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    /// Values that identify the query: every parameter that is not OUT-only
    pub fn key_values(&self) -> impl Iterator<Item = Value> + '_ {
        self.parameters
            .iter()
            .filter(|p| p.mode != ParameterMode::Out)
            .map(|p| p.value.clone())
    }

    #[must_use]
    pub fn has_out_params(&self) -> bool {
        self.parameters.iter().any(|p| p.mode != ParameterMode::In)
    }

    /// Current values of the OUT and INOUT parameters
    #[must_use]
    pub fn out_params(&self) -> ParameterBag {
        self.parameters
            .iter()
            .filter(|p| p.mode != ParameterMode::In)
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }

    /// Copy values from `bag` into the matching OUT and INOUT parameters
    pub fn apply_out_params(&mut self, bag: &ParameterBag) {
        for mapping in &mut self.parameters {
            if mapping.mode == ParameterMode::In {
                continue;
            }
            if let Some(value) = bag.get(&mapping.name) {
                mapping.value = value.clone();
            }
        }
    }
}

/// Descriptor of one mapped statement.
///
/// Selects default to reading the shared cache; every other command defaults
/// to flushing it.
#[derive(Debug, Clone)]
pub struct MappedStatement {
    id: String,
    kind: SqlCommandKind,
    statement_type: StatementType,
    cache: Option<Arc<dyn Cache>>,
    use_cache: bool,
    flush_cache_required: bool,
}

impl MappedStatement {
    pub fn new(id: impl Into<String>, kind: SqlCommandKind) -> Self {
        let is_select = kind.is_select();
        Self {
            id: id.into(),
            kind,
            statement_type: StatementType::default(),
            cache: None,
            use_cache: is_select,
            flush_cache_required: !is_select,
        }
    }

    pub fn select(id: impl Into<String>) -> Self {
        Self::new(id, SqlCommandKind::Select)
    }

    pub fn insert(id: impl Into<String>) -> Self {
        Self::new(id, SqlCommandKind::Insert)
    }

    pub fn update(id: impl Into<String>) -> Self {
        Self::new(id, SqlCommandKind::Update)
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self::new(id, SqlCommandKind::Delete)
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub const fn with_statement_type(mut self, statement_type: StatementType) -> Self {
        self.statement_type = statement_type;
        self
    }

    #[must_use]
    pub const fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    #[must_use]
    pub const fn with_flush_cache(mut self, flush: bool) -> Self {
        self.flush_cache_required = flush;
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn kind(&self) -> SqlCommandKind {
        self.kind
    }

    #[must_use]
    pub const fn statement_type(&self) -> StatementType {
        self.statement_type
    }

    #[must_use]
    pub const fn is_callable(&self) -> bool {
        matches!(self.statement_type, StatementType::Callable)
    }

    #[must_use]
    pub const fn cache(&self) -> Option<&Arc<dyn Cache>> {
        self.cache.as_ref()
    }

    #[must_use]
    pub const fn use_cache(&self) -> bool {
        self.use_cache
    }

    #[must_use]
    pub const fn flush_cache_required(&self) -> bool {
        self.flush_cache_required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_defaults() {
        let statement = MappedStatement::select("selectUser");
        assert_eq!(statement.id(), "selectUser");
        assert_eq!(statement.kind(), SqlCommandKind::Select);
        assert_eq!(statement.statement_type(), StatementType::Prepared);
        assert!(statement.use_cache());
        assert!(!statement.flush_cache_required());
        assert!(statement.cache().is_none());
    }

    #[test]
    fn test_write_defaults() {
        for statement in [
            MappedStatement::insert("i"),
            MappedStatement::update("u"),
            MappedStatement::delete("d"),
        ] {
            assert!(!statement.use_cache());
            assert!(statement.flush_cache_required());
        }
    }

    #[test]
    fn test_builders() {
        let statement = MappedStatement::select("callTotals")
            .with_statement_type(StatementType::Callable)
            .with_use_cache(false)
            .with_flush_cache(true);
        assert!(statement.is_callable());
        assert!(!statement.use_cache());
        assert!(statement.flush_cache_required());
    }

    #[test]
    fn test_key_values_skip_out_params() {
        let bound = BoundSql::new("{call totals(?, ?, ?)}")
            .with_parameter(ParameterMapping::input("id", 7i64))
            .with_parameter(ParameterMapping::output("total"))
            .with_parameter(ParameterMapping::in_out("count", 2i64));

        let values: Vec<Value> = bound.key_values().collect();
        assert_eq!(values, vec![Value::Int(7), Value::Int(2)]);
        assert!(bound.has_out_params());
    }

    #[test]
    fn test_apply_out_params() {
        let mut bound = BoundSql::new("{call totals(?, ?)}")
            .with_parameter(ParameterMapping::input("id", 7i64))
            .with_parameter(ParameterMapping::output("total"));

        let mut bag = ParameterBag::new();
        bag.insert("total".to_string(), Value::Int(42));
        bag.insert("id".to_string(), Value::Int(0));
        bound.apply_out_params(&bag);

        assert_eq!(bound.parameter("total"), Some(&Value::Int(42)));
        assert_eq!(bound.parameter("id"), Some(&Value::Int(7)));
        assert_eq!(bound.out_params().len(), 1);
    }

    #[test]
    fn test_no_out_params() {
        let bound = BoundSql::new("SELECT 1").with_parameter(ParameterMapping::input("id", 1i64));
        assert!(!bound.has_out_params());
        assert!(bound.out_params().is_empty());
        assert_eq!(bound.sql(), "SELECT 1");
    }
}
