//! Metadata reflection.
//!
//! Reflects table and model descriptors from a live schema through the
//! [`Introspector`] collaborator, caching each result for the lifetime of
//! the registry. A single mutex guards the whole
//! check-then-introspect-then-cache sequence, so introspection for a given
//! `(bind, table)` pair happens at most once; failed reflection is never
//! cached and the next call retries.
//!
//! The cache is keyed by `(bind, table)`, not by table name alone: the
//! same table name reflected against two binds yields two descriptors.

use crate::engines::EngineRegistry;
use shardbind_core::bind::BindKey;
use shardbind_core::error::{ConfigErrorKind, Error, Result};
use shardbind_core::table::{Introspector, ModelDescriptor, TableDescriptor};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct ReflectCaches {
    tables: HashMap<(BindKey, String), Arc<TableDescriptor>>,
    models: HashMap<(BindKey, String), Arc<ModelDescriptor>>,
}

/// Memoized, thread-safe table/model reflection.
pub struct Reflector {
    engines: Arc<EngineRegistry>,
    introspector: Option<Arc<dyn Introspector>>,
    caches: Mutex<ReflectCaches>,
}

impl Reflector {
    pub(crate) fn new(
        engines: Arc<EngineRegistry>,
        introspector: Option<Arc<dyn Introspector>>,
    ) -> Self {
        Self {
            engines,
            introspector,
            caches: Mutex::new(ReflectCaches::default()),
        }
    }

    /// Reflect a table from the live schema of `bind_key`.
    pub fn reflect_table(&self, name: &str, bind_key: &BindKey) -> Result<Arc<TableDescriptor>> {
        let mut caches = self.caches.lock().unwrap();
        self.table_locked(&mut caches, name, bind_key)
    }

    /// Reflect a table and synthesize its model descriptor.
    pub fn reflect_model(&self, name: &str, bind_key: &BindKey) -> Result<Arc<ModelDescriptor>> {
        let mut caches = self.caches.lock().unwrap();
        let key = (bind_key.clone(), name.to_string());
        if let Some(model) = caches.models.get(&key) {
            return Ok(model.clone());
        }
        let table = self.table_locked(&mut caches, name, bind_key)?;
        let model = Arc::new(ModelDescriptor::from_table(table));
        caches.models.insert(key, model.clone());
        Ok(model)
    }

    fn table_locked(
        &self,
        caches: &mut ReflectCaches,
        name: &str,
        bind_key: &BindKey,
    ) -> Result<Arc<TableDescriptor>> {
        let key = (bind_key.clone(), name.to_string());
        if let Some(table) = caches.tables.get(&key) {
            return Ok(table.clone());
        }

        let introspector = self.introspector.as_ref().ok_or_else(|| {
            Error::config(
                ConfigErrorKind::InvalidOption,
                "no schema introspector configured",
            )
        })?;
        let engine = self
            .engines
            .get(bind_key)?
            .ok_or_else(|| Error::missing_uri(bind_key))?;

        tracing::debug!(table = name, bind = %bind_key, "reflecting table");
        let descriptor = Arc::new(introspector.reflect(name, engine.as_ref())?);
        caches.tables.insert(key, descriptor.clone());
        Ok(descriptor)
    }
}
