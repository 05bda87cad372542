//! Engine and connection collaborator traits.
//!
//! The registry layer treats the actual database driver and its connection
//! pool as opaque collaborators:
//!
//! - [`EngineBackend`] - factory turning a URI plus options into an engine
//! - [`Engine`] - a long-lived, shareable connection-pool handle
//! - [`Connection`] - a checked-out connection for issuing statements
//!
//! All operations are ordinary blocking calls; timeouts belong to the pool
//! configuration carried in [`EngineOptions`], not to this layer.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;
use std::sync::Arc;
use std::time::Duration;

/// Pooling behavior for an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pooling {
    /// No persistent connections; every checkout opens a fresh connection.
    Disabled,
    /// A persistent pool with overflow.
    Enabled {
        /// Max persistent connections held by the pool
        size: u32,
        /// Wait time for a free connection before failing
        timeout: Duration,
        /// Max connection age before a forced reconnect
        recycle: Duration,
        /// Extra transient connections beyond `size`
        max_overflow: u32,
    },
}

/// Options handed to [`EngineBackend::create_engine`].
///
/// Derived from the registry configuration; see `DbConfig::engine_options`
/// in the facade crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Pooling behavior
    pub pooling: Pooling,
    /// Verbose logging of executed statements and pool events
    pub echo: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            pooling: Pooling::Disabled,
            echo: true,
        }
    }
}

impl EngineOptions {
    /// Options with pooling disabled.
    #[must_use]
    pub fn unpooled() -> Self {
        Self::default()
    }

    /// Set the pooling behavior.
    #[must_use]
    pub fn pooling(mut self, pooling: Pooling) -> Self {
        self.pooling = pooling;
        self
    }

    /// Enable or disable statement echo.
    #[must_use]
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

/// A long-lived connection-pool handle for exactly one URI.
///
/// Engines are created by the engine registry on first access, shared by
/// reference afterwards, and disposed only on whole-registry disposal.
/// Implementations must be safely shareable across threads; per-use
/// isolation is the pool's job via [`Engine::acquire`].
pub trait Engine: Send + Sync + std::fmt::Debug {
    /// The URI this engine connects to.
    fn uri(&self) -> &str;

    /// Execute a statement directly, without an explicit checkout.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Check a connection out of the pool.
    fn acquire(&self) -> Result<Box<dyn Connection>>;

    /// Dispose of the engine, closing pooled connections.
    ///
    /// After disposal the engine must not be used; the registry drops its
    /// reference immediately after calling this.
    fn dispose(&self) -> Result<()>;
}

/// A connection checked out of an engine's pool.
pub trait Connection: Send {
    /// Execute a query and return all rows.
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Execute a query and return the first row, if any.
    fn query_one(&mut self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Execute a statement and return rows affected.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Return the connection to its pool.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Factory for engines, implemented by the database-access library.
pub trait EngineBackend: Send + Sync {
    /// Create an engine for `uri` with the given pool options.
    ///
    /// May open network resources; errors surface as
    /// [`Error::Connection`](crate::error::Error::Connection).
    fn create_engine(&self, uri: &str, options: &EngineOptions) -> Result<Arc<dyn Engine>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_unpooled() {
        let options = EngineOptions::default();
        assert_eq!(options.pooling, Pooling::Disabled);
        assert!(options.echo);
        assert_eq!(options, EngineOptions::unpooled());
    }

    #[test]
    fn builder_chain() {
        let options = EngineOptions::default()
            .pooling(Pooling::Enabled {
                size: 4,
                timeout: Duration::from_secs(10),
                recycle: Duration::from_secs(60),
                max_overflow: 2,
            })
            .echo(false);

        assert!(!options.echo);
        match options.pooling {
            Pooling::Enabled { size, max_overflow, .. } => {
                assert_eq!(size, 4);
                assert_eq!(max_overflow, 2);
            }
            Pooling::Disabled => panic!("expected pooled options"),
        }
    }
}
