//! Cache key fingerprint for query results

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::constants::{KEY_MULTIPLIER, KEY_SEED};
use crate::types::RowBounds;
use crate::value::Value;

/// Order-sensitive composite fingerprint of a query's identity.
///
/// Every component folded in with [`update`](Self::update) changes the
/// running hash, the checksum and the count. The hash weights each component
/// by its position, so `(a, b)` and `(b, a)` produce different keys, as do
/// repeated values.
///
/// Two keys are equal when their accumulated state matches and their
/// components are pairwise equal. [`Hash`] only uses the accumulated hash.
#[derive(Debug, Clone)]
pub struct CacheKey {
    multiplier: i32,
    hashcode: i32,
    checksum: i64,
    count: i32,
    components: Vec<Value>,
}

impl CacheKey {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            multiplier: KEY_MULTIPLIER,
            hashcode: KEY_SEED,
            checksum: 0,
            count: 0,
            components: Vec::new(),
        }
    }

    /// Build a key from a sequence of components, folded in order
    #[must_use]
    pub fn from_components<I, V>(components: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut key = Self::new();
        key.update_all(components);
        key
    }

    /// Key identifying one execution of a statement.
    ///
    /// Folds, in order: statement id, offset, limit, SQL text, every
    /// parameter value, then the environment id when one is configured.
    #[must_use]
    pub fn for_query<I>(
        statement_id: &str,
        bounds: RowBounds,
        sql: &str,
        parameters: I,
        environment_id: Option<&str>,
    ) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut key = Self::new();
        key.update(statement_id);
        key.update(bounds.offset);
        key.update(bounds.limit);
        key.update(sql);
        key.update_all(parameters);
        if let Some(env) = environment_id {
            key.update(env);
        }
        key
    }

    /// Fold one component into the key
    pub fn update(&mut self, component: impl Into<Value>) {
        let component = component.into();
        let mut base = component.structural_hash();

        self.count = self.count.wrapping_add(1);
        self.checksum = self.checksum.wrapping_add(i64::from(base));
        base = base.wrapping_mul(self.count);
        self.hashcode = self.multiplier.wrapping_mul(self.hashcode).wrapping_add(base);

        self.components.push(component);
    }

    /// Fold a sequence of components, in order
    pub fn update_all<I, V>(&mut self, components: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        for component in components {
            self.update(component);
        }
    }

    /// Number of components folded in so far
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.components.len()
    }

    #[must_use]
    pub const fn hashcode(&self) -> i32 {
        self.hashcode
    }

    #[must_use]
    pub const fn checksum(&self) -> i64 {
        self.checksum
    }

    #[must_use]
    pub fn components(&self) -> &[Value] {
        &self.components
    }
}

impl Default for CacheKey {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.hashcode == other.hashcode
            && self.checksum == other.checksum
            && self.count == other.count
            && self
                .components
                .iter()
                .zip(&other.components)
                .all(|(a, b)| a == b)
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i32(self.hashcode);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hashcode, self.checksum)?;
        for component in &self.components {
            write!(f, ":{component}")?;
        }
        Ok(())
    }
}
