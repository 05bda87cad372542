//! Multi-bind database engine/session registry with shard routing.
//!
//! `shardbind` manages the lifecycle of database engines and sessions
//! across any number of logical binds, with optional horizontal sharding
//! on the default bind.
//!
//! # Role In The Architecture
//!
//! - **Engine registry**: lazy, cached creation of connection-pool handles
//!   keyed by bind.
//! - **Session registry**: lazy, cached per-bind session factories
//!   yielding scope-local sessions.
//! - **Shard router**: three replaceable hooks picking the physical
//!   database(s) for writes, identity lookups, and query fan-out.
//! - **Reflector**: memoized table/model metadata from a live schema.
//!
//! The actual driver and introspection machinery are collaborators,
//! supplied as trait objects at build time.
//!
//! # Example
//!
//! ```ignore
//! let db = ShardBind::builder()
//!     .backend(backend)
//!     .introspector(introspector)
//!     .config(
//!         DbConfig::new()
//!             .database_uri("postgres://app@db/main")
//!             .bind("shard_001", "postgres://app@db1/app")
//!             .bind("shard_002", "postgres://app@db2/app")
//!             .enable_shard(true),
//!     )
//!     .build()?;
//!
//! db.router().set_query_chooser(shard_key_query_chooser(
//!     "user_id",
//!     vec!["shard_001".into(), "shard_002".into()],
//!     |v| v.as_int().map(|id| format!("shard_{:03}", 1 + id % 2)),
//! ));
//!
//! let session = db.session()?;
//! let users = session.query(&Query::select("users").filter(Expr::col("user_id").eq(7_i64)))?;
//! ```

pub mod config;
pub mod engines;
pub mod reflect;
pub mod router;
pub mod session;

pub use config::DbConfig;
pub use engines::EngineRegistry;
pub use reflect::Reflector;
pub use router::{DEFAULT_SHARD_ID, ShardId, ShardRouter, shard_key_query_chooser};
pub use session::{ScopeFn, Session, SessionFactory, thread_scope};

// Re-export the building blocks callers need alongside the facade.
pub use shardbind_core::{
    BindKey, ColumnDescriptor, Connection, Engine, EngineBackend, EngineOptions, Error,
    Introspector, ModelDescriptor, Pooling, Record, Result, Row, TableDescriptor, Value,
};
pub use shardbind_core::error::{
    ConfigError, ConfigErrorKind, ConnectionError, ConnectionErrorKind, QueryError,
    ReflectionError, ReflectionErrorKind,
};
pub use shardbind_query::{Comparison, CompareOp, ComparisonValue, Expr, Query, extract_comparisons};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// The registry facade.
///
/// Owns the engine registry, the session registry, the shard router, and
/// the reflector caches; everything is constructed once here and passed by
/// reference, so there is no hidden global state. Lock ordering inside:
/// the session and reflector locks may call into the engine lock, never
/// the reverse, and no path holds two domain locks in the opposite order.
pub struct ShardBind {
    config: Arc<RwLock<DbConfig>>,
    engines: Arc<EngineRegistry>,
    sessions: Mutex<HashMap<BindKey, Arc<SessionFactory>>>,
    router: Arc<ShardRouter>,
    reflector: Reflector,
    scope_fn: Arc<ScopeFn>,
}

impl std::fmt::Debug for ShardBind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardBind").finish_non_exhaustive()
    }
}

impl ShardBind {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> ShardBindBuilder {
        ShardBindBuilder::new()
    }

    /// Replace the configuration.
    ///
    /// Already-cached engines and session factories are unaffected; the new
    /// configuration applies to binds first touched after this call.
    pub fn configure(&self, config: DbConfig) -> Result<()> {
        config.validate()?;
        *self.config.write().unwrap() = config;
        Ok(())
    }

    /// A snapshot of the current configuration.
    pub fn config(&self) -> DbConfig {
        self.config.read().unwrap().clone()
    }

    /// The shard router; replace its choosers to customize routing.
    pub fn router(&self) -> &ShardRouter {
        &self.router
    }

    /// The engine for the default bind, if a primary URI is configured.
    pub fn engine(&self) -> Result<Option<Arc<dyn Engine>>> {
        self.get_engine(BindKey::Default)
    }

    /// The engine for a bind, created on first access.
    pub fn get_engine(&self, bind_key: impl Into<BindKey>) -> Result<Option<Arc<dyn Engine>>> {
        self.engines.get(&bind_key.into())
    }

    /// The current scope's session for the default bind.
    pub fn session(&self) -> Result<Arc<Session>> {
        self.get_session(BindKey::Default)
    }

    /// The current scope's session for a bind.
    pub fn get_session(&self, bind_key: impl Into<BindKey>) -> Result<Arc<Session>> {
        Ok(self.session_factory(bind_key)?.current())
    }

    /// The cached session factory for a bind, created on first access.
    ///
    /// The factory for the default bind yields shard-aware sessions when
    /// sharding is enabled at creation time; named binds always yield
    /// plain sessions.
    pub fn session_factory(&self, bind_key: impl Into<BindKey>) -> Result<Arc<SessionFactory>> {
        let bind_key = bind_key.into();
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(factory) = sessions.get(&bind_key) {
            return Ok(factory.clone());
        }

        // session lock is held across engine resolution (session -> engine
        // ordering); the engine registry never calls back into us
        let engine = self.engines.get(&bind_key)?;
        let sharded = bind_key.is_default() && self.config.read().unwrap().enable_shard;
        let factory = Arc::new(SessionFactory::new(
            bind_key.clone(),
            engine,
            self.engines.clone(),
            sharded.then(|| self.router.clone()),
            self.scope_fn.clone(),
        ));
        tracing::debug!(bind = %bind_key, sharded, "created session factory");
        sessions.insert(bind_key, factory.clone());
        Ok(factory)
    }

    /// Reflect a table's metadata from the live schema of a bind.
    pub fn reflect_table(
        &self,
        name: &str,
        bind_key: impl Into<BindKey>,
    ) -> Result<Arc<TableDescriptor>> {
        self.reflector.reflect_table(name, &bind_key.into())
    }

    /// Reflect a table and synthesize its model descriptor.
    pub fn reflect_model(
        &self,
        name: &str,
        bind_key: impl Into<BindKey>,
    ) -> Result<Arc<ModelDescriptor>> {
        self.reflector.reflect_model(name, &bind_key.into())
    }

    /// Discard every factory's current-scope session.
    ///
    /// Factories and engines stay cached; only the scope-local working
    /// sets are dropped.
    pub fn reset(&self) {
        let factories: Vec<Arc<SessionFactory>> =
            self.sessions.lock().unwrap().values().cloned().collect();
        for factory in factories {
            factory.remove();
        }
    }

    /// Dispose of all cached engines and clear the engine cache.
    pub fn dispose(&self) -> Result<()> {
        self.engines.dispose()
    }
}

/// Builder for [`ShardBind`].
pub struct ShardBindBuilder {
    backend: Option<Arc<dyn EngineBackend>>,
    introspector: Option<Arc<dyn Introspector>>,
    config: DbConfig,
    scope_fn: Option<Arc<ScopeFn>>,
}

impl ShardBindBuilder {
    /// Create a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            backend: None,
            introspector: None,
            config: DbConfig::default(),
            scope_fn: None,
        }
    }

    /// Set the engine backend (required).
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn EngineBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the schema introspector (required only for reflection).
    #[must_use]
    pub fn introspector(mut self, introspector: Arc<dyn Introspector>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    /// Set the initial configuration.
    #[must_use]
    pub fn config(mut self, config: DbConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the scope-identifying function (default: one scope per thread).
    #[must_use]
    pub fn scope_fn(mut self, scope_fn: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.scope_fn = Some(Arc::new(scope_fn));
        self
    }

    /// Build the registry.
    pub fn build(self) -> Result<ShardBind> {
        let backend = self.backend.ok_or_else(|| {
            Error::config(ConfigErrorKind::InvalidOption, "an engine backend is required")
        })?;
        self.config.validate()?;

        let config = Arc::new(RwLock::new(self.config));
        let engines = Arc::new(EngineRegistry::new(backend, config.clone()));
        let reflector = Reflector::new(engines.clone(), self.introspector);
        Ok(ShardBind {
            config,
            engines,
            sessions: Mutex::new(HashMap::new()),
            router: Arc::new(ShardRouter::new()),
            reflector,
            scope_fn: self.scope_fn.unwrap_or_else(|| Arc::new(thread_scope)),
        })
    }
}

impl Default for ShardBindBuilder {
    fn default() -> Self {
        Self::new()
    }
}
