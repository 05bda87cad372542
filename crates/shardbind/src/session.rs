//! Session factories and scope-local sessions.
//!
//! A [`SessionFactory`] is cached per bind by the facade and yields one
//! [`Session`] per scope, where the scope is identified by a pluggable
//! function (by default, the current thread). The factory outlives
//! `reset`; only the scope-local instances are discarded.
//!
//! A sharded session consults the [`ShardRouter`](crate::router::ShardRouter)
//! on every operation and resolves engines through the registry at call
//! time; a plain session is bound to its engine at construction. Only the
//! default bind is ever sharded.

use crate::engines::EngineRegistry;
use crate::router::{DEFAULT_SHARD_ID, ShardRouter};
use shardbind_core::bind::BindKey;
use shardbind_core::engine::Engine;
use shardbind_core::error::{Error, Result};
use shardbind_core::row::Row;
use shardbind_core::table::{Record, TableDescriptor};
use shardbind_core::value::Value;
use shardbind_query::{Expr, Query};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

/// Identifies the caller's unit-of-work scope.
pub type ScopeFn = dyn Fn() -> u64 + Send + Sync;

/// The default scope: one session per thread.
pub fn thread_scope() -> u64 {
    let mut hasher = DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    hasher.finish()
}

// ============================================================================
// Factory
// ============================================================================

/// A per-bind session factory yielding scope-local sessions.
pub struct SessionFactory {
    bind_key: BindKey,
    engine: Option<Arc<dyn Engine>>,
    engines: Arc<EngineRegistry>,
    router: Option<Arc<ShardRouter>>,
    scope_fn: Arc<ScopeFn>,
    scopes: Mutex<HashMap<u64, Arc<Session>>>,
}

impl SessionFactory {
    pub(crate) fn new(
        bind_key: BindKey,
        engine: Option<Arc<dyn Engine>>,
        engines: Arc<EngineRegistry>,
        router: Option<Arc<ShardRouter>>,
        scope_fn: Arc<ScopeFn>,
    ) -> Self {
        Self {
            bind_key,
            engine,
            engines,
            router,
            scope_fn,
            scopes: Mutex::new(HashMap::new()),
        }
    }

    /// The bind this factory serves.
    pub fn bind_key(&self) -> &BindKey {
        &self.bind_key
    }

    /// Does this factory yield shard-aware sessions?
    pub fn is_sharded(&self) -> bool {
        self.router.is_some()
    }

    /// The current scope's session, created on first access.
    pub fn current(&self) -> Arc<Session> {
        let scope = (self.scope_fn)();
        let mut scopes = self.scopes.lock().unwrap();
        scopes
            .entry(scope)
            .or_insert_with(|| {
                Arc::new(Session {
                    bind_key: self.bind_key.clone(),
                    engine: self.engine.clone(),
                    engines: self.engines.clone(),
                    router: self.router.clone(),
                    pending: Mutex::new(Vec::new()),
                })
            })
            .clone()
    }

    /// Discard the current scope's session; the next access in this scope
    /// starts with a fresh working set.
    pub fn remove(&self) {
        let scope = (self.scope_fn)();
        if self.scopes.lock().unwrap().remove(&scope).is_some() {
            tracing::debug!(bind = %self.bind_key, scope, "removed scope-local session");
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// A scope-bound handle for issuing database operations.
///
/// Pending records accumulate in a working set until `flush`; sharded
/// sessions pick each record's target engine through the write chooser at
/// flush time. Scope-local by construction: instances are not meant to be
/// shared across threads.
pub struct Session {
    bind_key: BindKey,
    engine: Option<Arc<dyn Engine>>,
    engines: Arc<EngineRegistry>,
    router: Option<Arc<ShardRouter>>,
    pending: Mutex<Vec<Record>>,
}

impl Session {
    /// The bind this session serves.
    pub fn bind_key(&self) -> &BindKey {
        &self.bind_key
    }

    /// Is this session shard-aware?
    pub fn is_sharded(&self) -> bool {
        self.router.is_some()
    }

    /// Queue a record for insertion on the next flush.
    pub fn add(&self, record: Record) {
        self.pending.lock().unwrap().push(record);
    }

    /// Number of records waiting to be flushed.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Write pending records out, in insertion order.
    ///
    /// Returns the number of records written. On failure the failed record
    /// and everything after it stay pending and the error propagates.
    #[tracing::instrument(level = "debug", skip(self), fields(bind = %self.bind_key))]
    pub fn flush(&self) -> Result<u64> {
        let mut pending = self.pending.lock().unwrap();
        let mut written = 0u64;
        while !pending.is_empty() {
            let record = pending[0].clone();
            let engine = self.engine_for_write(&record)?;
            let (sql, params) = render_insert(&record)?;
            tracing::trace!(table = %record.table, sql = %sql, "flushing record");
            engine.execute(&sql, &params)?;
            pending.remove(0);
            written += 1;
        }
        Ok(written)
    }

    /// Flush pending records.
    ///
    /// Transactional guarantees are delegated to the engines; a sharded
    /// flush touching several shards makes no cross-shard atomicity
    /// promise.
    pub fn commit(&self) -> Result<u64> {
        self.flush()
    }

    /// Drop all pending records without writing them.
    pub fn rollback(&self) {
        self.pending.lock().unwrap().clear();
    }

    /// Execute a raw statement.
    ///
    /// Sharded sessions run raw statements against the default shard, as
    /// raw SQL carries no routing signal.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let engine = match &self.router {
            Some(_) => self.engines.require_for_shard(DEFAULT_SHARD_ID)?,
            None => self.bound_engine()?,
        };
        engine.execute(sql, params)
    }

    /// Run a query, fanning out across shards when sharded.
    ///
    /// Rows are merged in shard order; duplicate shard ids from the
    /// chooser are probed once.
    #[tracing::instrument(level = "debug", skip(self, query), fields(table = %query.table()))]
    pub fn query(&self, query: &Query) -> Result<Vec<Row>> {
        let (sql, params) = query.to_sql();
        match &self.router {
            Some(router) => {
                let targets = dedupe(router.query_targets(query));
                tracing::debug!(shards = targets.len(), "query fan-out");
                let mut rows = Vec::new();
                for shard_id in &targets {
                    let engine = self.engines.require_for_shard(shard_id)?;
                    rows.extend(run_query(engine.as_ref(), &sql, &params)?);
                }
                Ok(rows)
            }
            None => run_query(self.bound_engine()?.as_ref(), &sql, &params),
        }
    }

    /// Look a row up by primary key, probing shards in chooser order and
    /// stopping at the first hit.
    pub fn get(&self, table: &TableDescriptor, ident: &[Value]) -> Result<Option<Row>> {
        if table.primary_key.is_empty() {
            return Err(Error::Custom(format!(
                "table '{}' has no primary key",
                table.name
            )));
        }
        if ident.len() != table.primary_key.len() {
            return Err(Error::Custom(format!(
                "identity for '{}' needs {} value(s), got {}",
                table.name,
                table.primary_key.len(),
                ident.len()
            )));
        }

        let mut query = Query::select(&table.name);
        for (column, value) in table.primary_key.iter().zip(ident) {
            query = query.filter(Expr::col(column.clone()).eq(value.clone()));
        }
        let query = query.limit(1);
        let (sql, params) = query.to_sql();

        match &self.router {
            Some(router) => {
                for shard_id in &dedupe(router.lookup_targets(&query, ident)) {
                    let engine = self.engines.require_for_shard(shard_id)?;
                    if let Some(row) = run_query_one(engine.as_ref(), &sql, &params)? {
                        return Ok(Some(row));
                    }
                }
                Ok(None)
            }
            None => run_query_one(self.bound_engine()?.as_ref(), &sql, &params),
        }
    }

    fn engine_for_write(&self, record: &Record) -> Result<Arc<dyn Engine>> {
        match &self.router {
            Some(router) => {
                let shard_id = router.write_target(record, None);
                tracing::debug!(
                    table = %record.table,
                    shard = %BindKey::from_shard_id(&shard_id),
                    "write routed"
                );
                self.engines.require_for_shard(&shard_id)
            }
            None => self.bound_engine(),
        }
    }

    fn bound_engine(&self) -> Result<Arc<dyn Engine>> {
        self.engine
            .clone()
            .ok_or_else(|| Error::missing_uri(&self.bind_key))
    }
}

fn dedupe(targets: Vec<String>) -> Vec<String> {
    let mut unique = Vec::with_capacity(targets.len());
    for target in targets {
        if !unique.contains(&target) {
            unique.push(target);
        }
    }
    unique
}

fn run_query(engine: &dyn Engine, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
    let mut conn = engine.acquire()?;
    match conn.query(sql, params) {
        Ok(rows) => {
            conn.close()?;
            Ok(rows)
        }
        Err(error) => {
            // best-effort checkin; the query error is the one that matters
            let _ = conn.close();
            Err(error)
        }
    }
}

fn run_query_one(engine: &dyn Engine, sql: &str, params: &[Value]) -> Result<Option<Row>> {
    let mut conn = engine.acquire()?;
    match conn.query_one(sql, params) {
        Ok(row) => {
            conn.close()?;
            Ok(row)
        }
        Err(error) => {
            let _ = conn.close();
            Err(error)
        }
    }
}

fn render_insert(record: &Record) -> Result<(String, Vec<Value>)> {
    if record.values.is_empty() {
        return Err(Error::Custom(format!(
            "record for table '{}' has no values",
            record.table
        )));
    }
    let columns: Vec<&str> = record.values.keys().map(String::as_str).collect();
    let placeholders: Vec<&str> = columns.iter().map(|_| "?").collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        record.table,
        columns.join(", "),
        placeholders.join(", ")
    );
    let params = record.values.values().cloned().collect();
    Ok((sql, params))
}
