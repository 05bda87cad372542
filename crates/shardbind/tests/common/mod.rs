//! In-memory mock collaborators for the integration tests.

#![allow(dead_code)] // each test binary uses a subset of the helpers

use shardbind::{
    ColumnDescriptor, Connection, ConnectionError, ConnectionErrorKind, DbConfig, Engine,
    EngineBackend, EngineOptions, Error, Introspector, ReflectionError, ReflectionErrorKind,
    Result, Row, ShardBind, TableDescriptor, Value,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared observable state of one mock engine.
#[derive(Default)]
pub struct EngineState {
    /// Statements run through `Engine::execute` or `Connection::execute`
    pub executed: Mutex<Vec<(String, Vec<Value>)>>,
    /// Queries run through acquired connections
    pub queries: Mutex<Vec<(String, Vec<Value>)>>,
    /// Rows returned for every query
    pub rows: Mutex<Vec<Row>>,
    pub disposed: AtomicBool,
}

impl EngineState {
    pub fn executed_sql(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn set_rows(&self, rows: Vec<Row>) {
        *self.rows.lock().unwrap() = rows;
    }
}

pub struct MockEngine {
    uri: String,
    pub options: EngineOptions,
    pub state: Arc<EngineState>,
}

impl std::fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEngine").field("uri", &self.uri).finish()
    }
}

impl Engine for MockEngine {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        self.state
            .executed
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        Ok(1)
    }

    fn acquire(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(MockConnection {
            state: self.state.clone(),
        }))
    }

    fn dispose(&self) -> Result<()> {
        self.state.disposed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockConnection {
    state: Arc<EngineState>,
}

impl Connection for MockConnection {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.state
            .queries
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        Ok(self.state.rows.lock().unwrap().clone())
    }

    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64> {
        self.state
            .executed
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        Ok(1)
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Backend creating [`MockEngine`]s and recording every creation.
#[derive(Default)]
pub struct MockBackend {
    pub create_count: AtomicUsize,
    /// Artificial creation latency, to widen race windows in tests
    pub create_delay: Duration,
    /// Engine state by URI, for post-hoc inspection
    pub states: Mutex<HashMap<String, Arc<EngineState>>>,
    pub fail_next_create: AtomicBool,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_create_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            create_delay: delay,
            ..Self::default()
        })
    }

    /// The observable state of the engine created for `uri`.
    pub fn state(&self, uri: &str) -> Arc<EngineState> {
        self.states
            .lock()
            .unwrap()
            .get(uri)
            .unwrap_or_else(|| panic!("no engine was created for {uri}"))
            .clone()
    }
}

impl EngineBackend for MockBackend {
    fn create_engine(&self, uri: &str, options: &EngineOptions) -> Result<Arc<dyn Engine>> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: format!("cannot reach {uri}"),
                source: None,
            }));
        }
        if !self.create_delay.is_zero() {
            std::thread::sleep(self.create_delay);
        }
        self.create_count.fetch_add(1, Ordering::SeqCst);

        let state = Arc::new(EngineState::default());
        self.states
            .lock()
            .unwrap()
            .insert(uri.to_string(), state.clone());
        Ok(Arc::new(MockEngine {
            uri: uri.to_string(),
            options: options.clone(),
            state,
        }))
    }
}

/// Introspector serving canned table descriptors.
#[derive(Default)]
pub struct MockIntrospector {
    pub tables: Mutex<HashMap<String, TableDescriptor>>,
    pub calls: AtomicUsize,
    pub fail_next: AtomicBool,
}

impl MockIntrospector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_table(self: Arc<Self>, table: TableDescriptor) -> Arc<Self> {
        self.tables.lock().unwrap().insert(table.name.clone(), table);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Introspector for MockIntrospector {
    fn reflect(&self, table: &str, _engine: &dyn Engine) -> Result<TableDescriptor> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::Reflection(ReflectionError {
                kind: ReflectionErrorKind::Introspection,
                table: Some(table.to_string()),
                message: "schema scan interrupted".to_string(),
                source: None,
            }));
        }
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .ok_or_else(|| {
                Error::Reflection(ReflectionError {
                    kind: ReflectionErrorKind::TableNotFound,
                    table: Some(table.to_string()),
                    message: format!("table '{table}' does not exist"),
                    source: None,
                })
            })
    }
}

/// A table descriptor with an `id` primary key plus the given columns.
pub fn table_with_columns(name: &str, columns: &[&str]) -> TableDescriptor {
    let mut all = vec![ColumnDescriptor {
        name: "id".to_string(),
        sql_type: "BIGINT".to_string(),
        nullable: false,
        primary_key: true,
        default: None,
    }];
    all.extend(columns.iter().map(|&c| ColumnDescriptor {
        name: c.to_string(),
        sql_type: "TEXT".to_string(),
        nullable: true,
        primary_key: false,
        default: None,
    }));
    TableDescriptor {
        name: name.to_string(),
        columns: all,
        primary_key: vec!["id".to_string()],
        comment: None,
    }
}

/// A registry over mocks with a primary URI and two shard binds.
pub fn sharded_db(backend: Arc<MockBackend>) -> ShardBind {
    ShardBind::builder()
        .backend(backend)
        .config(
            DbConfig::new()
                .database_uri("mock://primary")
                .bind("shard_001", "mock://s1")
                .bind("shard_002", "mock://s2")
                .enable_shard(true),
        )
        .build()
        .expect("buildable registry")
}
