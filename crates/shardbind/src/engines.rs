//! The engine registry.
//!
//! Maps bind keys to live engines, creating each engine lazily on first
//! access and caching it for the lifetime of the registry. One mutex guards
//! the whole check-create-store sequence, so a bind's engine is constructed
//! exactly once no matter how many threads race on first access.

use crate::config::DbConfig;
use shardbind_core::bind::BindKey;
use shardbind_core::engine::{Engine, EngineBackend};
use shardbind_core::error::{Error, Result};
use shardbind_core::uri;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Thread-safe, memoized bind-to-engine factory.
///
/// This lock never acquires any other registry lock; the session registry
/// and the reflector call into it while holding their own locks, so the
/// one-way ordering keeps the domains deadlock-free.
pub struct EngineRegistry {
    backend: Arc<dyn EngineBackend>,
    config: Arc<RwLock<DbConfig>>,
    engines: Mutex<HashMap<BindKey, Arc<dyn Engine>>>,
}

impl EngineRegistry {
    pub(crate) fn new(backend: Arc<dyn EngineBackend>, config: Arc<RwLock<DbConfig>>) -> Self {
        Self {
            backend,
            config,
            engines: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create the engine for `bind_key`.
    ///
    /// - Cached engine: returned without I/O.
    /// - Default bind with no primary URI configured: `Ok(None)`, not
    ///   cached, so a later `configure` can supply the URI.
    /// - Named bind absent from the bind map: configuration error.
    /// - Otherwise the engine is created through the backend, cached, and
    ///   returned.
    pub fn get(&self, bind_key: &BindKey) -> Result<Option<Arc<dyn Engine>>> {
        let mut engines = self.engines.lock().unwrap();
        if let Some(engine) = engines.get(bind_key) {
            return Ok(Some(engine.clone()));
        }

        let (uri, options) = {
            let config = self.config.read().unwrap();
            let uri = match bind_key {
                BindKey::Default => match &config.database_uri {
                    Some(uri) => uri.clone(),
                    None => return Ok(None),
                },
                BindKey::Named(name) => {
                    match config.binds.as_ref().and_then(|binds| binds.get(name)) {
                        Some(uri) => uri.clone(),
                        None => return Err(Error::unknown_bind(name)),
                    }
                }
            };
            (uri, config.engine_options())
        };

        uri::validate(&uri)?;
        if options.echo {
            tracing::info!(bind = %bind_key, uri = %uri::redact(&uri), "creating engine");
        } else {
            tracing::debug!(bind = %bind_key, uri = %uri::redact(&uri), "creating engine");
        }

        let engine = self.backend.create_engine(&uri, &options)?;
        engines.insert(bind_key.clone(), engine.clone());
        Ok(Some(engine))
    }

    /// Resolve a shard id to its engine: the default-shard sentinel maps to
    /// the default bind, any other id to the named bind of the same name.
    pub fn engine_for_shard(&self, shard_id: &str) -> Result<Option<Arc<dyn Engine>>> {
        self.get(&BindKey::from_shard_id(shard_id))
    }

    /// Like [`EngineRegistry::engine_for_shard`], but an unconfigured
    /// target is an error: the caller has an operation that needs an
    /// engine.
    pub fn require_for_shard(&self, shard_id: &str) -> Result<Arc<dyn Engine>> {
        let bind_key = BindKey::from_shard_id(shard_id);
        self.get(&bind_key)?
            .ok_or_else(|| Error::missing_uri(&bind_key))
    }

    /// Dispose of every cached engine and clear the cache.
    ///
    /// All engines are attempted even if one fails; the first error is
    /// returned afterwards. Callers still holding engine references must
    /// treat them as invalid.
    pub fn dispose(&self) -> Result<()> {
        let mut engines = self.engines.lock().unwrap();
        let mut first_error = None;
        for (bind_key, engine) in engines.drain() {
            tracing::info!(bind = %bind_key, "disposing engine");
            if let Err(error) = engine.dispose() {
                tracing::warn!(bind = %bind_key, error = %error, "engine disposal failed");
                if first_error.is_none() {
                    first_error = Some(error);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
