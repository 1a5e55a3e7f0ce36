//! Session executor: local cache, shared-cache buffers and the query runner
//!
//! A query is reduced to a [`CacheKey`] and looked up in the session's local
//! cache, then in the statement's shared cache through the session's
//! [`TransactionalCacheManager`]. Only a miss at both levels reaches the
//! [`StatementRunner`]; its rows are stored at both levels.

mod deferred;
mod local;
mod statement;

use std::sync::Arc;

pub use deferred::LoadTarget;
pub use local::{LocalCacheScope, LocalLookup, ParseLocalCacheScopeError};
pub use statement::{
    BoundSql, MappedStatement, ParameterMapping, ParameterMode, SqlCommandKind, StatementType,
};

use self::deferred::DeferredLoad;
use self::local::LocalCache;
use crate::cache::{Cache, CacheKey, CacheValue};
use crate::error::{Error, Result};
use crate::transaction::TransactionalCacheManager;
use crate::types::{ParameterBag, Row, RowBounds, Rows};

/// Rows and OUT parameters produced by one statement execution
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    pub rows: Vec<Row>,
    pub out_params: Option<ParameterBag>,
}

impl QueryOutput {
    #[must_use]
    pub const fn rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            out_params: None,
        }
    }

    #[must_use]
    pub fn with_out_params(mut self, out_params: ParameterBag) -> Self {
        self.out_params = Some(out_params);
        self
    }
}

/// Executes statements against the backing store.
///
/// `query` receives the executor so result mapping can issue nested queries
/// and deferred loads through the same session.
pub trait StatementRunner {
    fn query(
        &mut self,
        executor: &mut Executor,
        statement: &MappedStatement,
        bound: &BoundSql,
        bounds: RowBounds,
    ) -> Result<QueryOutput>;

    fn update(&mut self, statement: &MappedStatement, bound: &BoundSql) -> Result<u64>;
}

/// Session-level switches for an [`Executor`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Use shared caches at all
    pub cache_enabled: bool,
    pub local_cache_scope: LocalCacheScope,
    /// Folded into every cache key when set
    pub environment_id: Option<String>,
}

impl ExecutorSettings {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cache_enabled: true,
            local_cache_scope: LocalCacheScope::Session,
            environment_id: None,
        }
    }

    #[must_use]
    pub const fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    #[must_use]
    pub const fn with_local_cache_scope(mut self, scope: LocalCacheScope) -> Self {
        self.local_cache_scope = scope;
        self
    }

    #[must_use]
    pub fn with_environment_id(mut self, environment_id: impl Into<String>) -> Self {
        self.environment_id = Some(environment_id.into());
        self
    }
}

/// One session's view of the cache hierarchy.
///
/// Not shared between threads; shared caches referenced by statements are.
#[derive(Debug)]
pub struct Executor {
    settings: ExecutorSettings,
    local: LocalCache,
    tx_caches: TransactionalCacheManager,
    deferred: Vec<DeferredLoad>,
    query_stack: usize,
    closed: bool,
}

impl Executor {
    #[must_use]
    pub fn new(settings: ExecutorSettings) -> Self {
        Self {
            settings,
            local: LocalCache::default(),
            tx_caches: TransactionalCacheManager::new(),
            deferred: Vec::new(),
            query_stack: 0,
            closed: false,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::ExecutorClosed)
        } else {
            Ok(())
        }
    }

    /// Key identifying `statement` run with `bound` inside `bounds`
    pub fn create_cache_key(
        &self,
        statement: &MappedStatement,
        bound: &BoundSql,
        bounds: RowBounds,
    ) -> Result<CacheKey> {
        self.ensure_open()?;
        Ok(CacheKey::for_query(
            statement.id(),
            bounds,
            bound.sql(),
            bound.key_values(),
            self.settings.environment_id.as_deref(),
        ))
    }

    /// Run a select through both cache levels.
    ///
    /// OUT and INOUT values of a callable statement are written back into
    /// `bound`, whether they come from the store or from the local cache.
    pub fn query(
        &mut self,
        runner: &mut dyn StatementRunner,
        statement: &MappedStatement,
        bound: &mut BoundSql,
        bounds: RowBounds,
    ) -> Result<Rows> {
        let key = self.create_cache_key(statement, bound, bounds)?;
        self.query_with_key(runner, statement, bound, bounds, &key)
    }

    /// [`query`](Self::query) with a precomputed key
    pub fn query_with_key(
        &mut self,
        runner: &mut dyn StatementRunner,
        statement: &MappedStatement,
        bound: &mut BoundSql,
        bounds: RowBounds,
        key: &CacheKey,
    ) -> Result<Rows> {
        self.ensure_open()?;
        let span = tracing::debug_span!(
            "executor.query",
            statement.id = statement.id(),
            query.depth = self.query_stack,
        );
        let _entered = span.enter();

        if self.query_stack == 0 && statement.flush_cache_required() {
            self.clear_local_cache();
        }
        self.flush_shared_if_required(statement)?;

        self.query_stack += 1;
        let result = self.query_levels(runner, statement, bound, bounds, key);
        self.query_stack -= 1;

        if self.query_stack == 0 {
            let deferred = std::mem::take(&mut self.deferred);
            if result.is_ok() {
                for load in deferred {
                    load.load(&self.local);
                }
            }
            if self.settings.local_cache_scope == LocalCacheScope::Statement {
                self.clear_local_cache();
            }
        }
        result
    }

    fn query_levels(
        &mut self,
        runner: &mut dyn StatementRunner,
        statement: &MappedStatement,
        bound: &mut BoundSql,
        bounds: RowBounds,
        key: &CacheKey,
    ) -> Result<Rows> {
        match self.local.lookup(key) {
            LocalLookup::Resolved(rows) => {
                tracing::debug!(cache.level = "local", cache.result = "hit");
                if statement.is_callable()
                    && let Some(params) = self.local.out_params(key)
                {
                    bound.apply_out_params(params);
                }
                return Ok(rows);
            }
            LocalLookup::InFlight => {
                return Err(Error::CircularQuery(statement.id().to_string()));
            }
            LocalLookup::Absent => {}
        }

        let shared = self.shared_cache_for(statement, bound)?;
        if let Some(cache) = &shared
            && let Some(CacheValue::Rows(rows)) = self.tx_caches.get(cache, key)?
        {
            tracing::debug!(cache.level = "shared", cache.id = cache.id(), cache.result = "hit");
            self.local.resolve(key.clone(), Arc::clone(&rows));
            return Ok(rows);
        }

        let rows = self.query_from_store(runner, statement, bound, bounds, key)?;
        if let Some(cache) = &shared {
            self.tx_caches
                .put(cache, key.clone(), CacheValue::Rows(Arc::clone(&rows)))?;
        }
        Ok(rows)
    }

    fn flush_shared_if_required(&mut self, statement: &MappedStatement) -> Result<()> {
        if self.settings.cache_enabled
            && statement.flush_cache_required()
            && let Some(cache) = statement.cache()
        {
            self.tx_caches.clear(cache)?;
        }
        Ok(())
    }

    fn shared_cache_for(
        &self,
        statement: &MappedStatement,
        bound: &BoundSql,
    ) -> Result<Option<Arc<dyn Cache>>> {
        if !self.settings.cache_enabled || !statement.use_cache() {
            return Ok(None);
        }
        let Some(cache) = statement.cache() else {
            return Ok(None);
        };
        if statement.is_callable() && bound.has_out_params() {
            return Err(Error::OutParamsNotCacheable(statement.id().to_string()));
        }
        Ok(Some(Arc::clone(cache)))
    }

    fn query_from_store(
        &mut self,
        runner: &mut dyn StatementRunner,
        statement: &MappedStatement,
        bound: &mut BoundSql,
        bounds: RowBounds,
        key: &CacheKey,
    ) -> Result<Rows> {
        self.local.mark_in_flight(key.clone());
        let output = match runner.query(self, statement, bound, bounds) {
            Ok(output) => output,
            Err(e) => {
                self.local.remove(key);
                return Err(e);
            }
        };
        tracing::debug!(cache.level = "store", rows = output.rows.len(), "query executed");

        let rows: Rows = Arc::new(output.rows);
        self.local.resolve(key.clone(), Arc::clone(&rows));
        if statement.is_callable() {
            let params = output.out_params.unwrap_or_else(|| bound.out_params());
            bound.apply_out_params(&params);
            self.local.store_out_params(key.clone(), params);
        }
        Ok(rows)
    }

    /// Run an insert, update or delete.
    ///
    /// Clears the local cache and, when the statement requires a flush,
    /// stages a clear of its shared cache.
    pub fn update(
        &mut self,
        runner: &mut dyn StatementRunner,
        statement: &MappedStatement,
        bound: &BoundSql,
    ) -> Result<u64> {
        self.ensure_open()?;
        self.flush_shared_if_required(statement)?;
        self.clear_local_cache();
        runner.update(statement, bound)
    }

    /// Deliver the rows of `key` to `target` once they are resolved.
    ///
    /// Runs at once when the key is already resolved locally; otherwise the
    /// load waits until the outermost query of this session completes.
    pub fn defer_load<F>(&mut self, key: CacheKey, target: F) -> Result<()>
    where
        F: FnOnce(Rows) + Send + 'static,
    {
        self.ensure_open()?;
        match self.local.lookup(&key) {
            LocalLookup::Resolved(rows) => target(rows),
            _ => self.deferred.push(DeferredLoad::new(key, Box::new(target))),
        }
        Ok(())
    }

    /// True when the local cache holds `key`, including an in-flight entry
    #[must_use]
    pub fn is_cached(&self, key: &CacheKey) -> bool {
        self.local.contains(key)
    }

    #[must_use]
    pub fn lookup_local(&self, key: &CacheKey) -> LocalLookup {
        self.local.lookup(key)
    }

    pub fn store_local(&mut self, key: CacheKey, rows: Rows) {
        self.local.resolve(key, rows);
    }

    pub fn clear_local_cache(&mut self) {
        if !self.closed {
            self.local.clear();
        }
    }

    #[must_use]
    pub fn local_cache_size(&self) -> usize {
        self.local.len()
    }

    /// Pending deferred loads
    #[must_use]
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    pub fn commit(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::ExecutorClosed);
        }
        self.clear_local_cache();
        self.tx_caches.commit_all()?;
        Ok(())
    }

    pub fn rollback(&mut self) {
        if self.closed {
            return;
        }
        self.clear_local_cache();
        self.tx_caches.rollback_all();
    }

    /// Finish the session. Buffered shared-cache work is rolled back when
    /// `force_rollback` is set and committed otherwise.
    pub fn close(&mut self, force_rollback: bool) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let result = if force_rollback {
            self.tx_caches.rollback_all();
            Ok(())
        } else {
            self.tx_caches.commit_all()
        };
        self.local.clear();
        self.deferred.clear();
        self.tx_caches = TransactionalCacheManager::new();
        self.closed = true;
        tracing::debug!(force_rollback, "executor closed");
        result.map_err(Error::from)
    }
}
