//! Registry configuration.

use serde::{Deserialize, Serialize};
use shardbind_core::engine::{EngineOptions, Pooling};
use shardbind_core::error::{ConfigErrorKind, Error, Result};
use std::collections::HashMap;
use std::time::Duration;

/// Process-wide registry configuration.
///
/// Deserializes with `#[serde(default)]`, so partial documents merge over
/// the defaults below. Changing the configuration after engines or
/// sessions have been cached does not affect the cached instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// URI for the default bind; `None` means "no database configured"
    pub database_uri: Option<String>,
    /// URIs for named binds
    pub binds: Option<HashMap<String, String>>,
    /// Enable the shard-aware default session
    pub enable_shard: bool,
    /// Enable connection pooling (otherwise engines use one-shot connections)
    pub enable_pool: bool,
    /// Max persistent connections per engine when pooling is enabled
    pub pool_size: u32,
    /// Wait time in seconds for a free connection before failing
    pub pool_timeout_secs: u64,
    /// Max connection age in seconds before a forced reconnect
    pub pool_recycle_secs: u64,
    /// Extra transient connections beyond `pool_size`
    pub max_overflow: u32,
    /// Verbose logging of executed statements and pool events
    pub echo: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_uri: None,
            binds: None,
            enable_shard: false,
            enable_pool: false,
            pool_size: 1,
            pool_timeout_secs: 30,
            pool_recycle_secs: 60,
            max_overflow: 10,
            echo: true,
        }
    }
}

impl DbConfig {
    /// Start from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the primary URI.
    #[must_use]
    pub fn database_uri(mut self, uri: impl Into<String>) -> Self {
        self.database_uri = Some(uri.into());
        self
    }

    /// Add a named bind.
    #[must_use]
    pub fn bind(mut self, key: impl Into<String>, uri: impl Into<String>) -> Self {
        self.binds
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), uri.into());
        self
    }

    /// Enable or disable the shard-aware default session.
    #[must_use]
    pub fn enable_shard(mut self, enabled: bool) -> Self {
        self.enable_shard = enabled;
        self
    }

    /// Enable or disable connection pooling.
    #[must_use]
    pub fn enable_pool(mut self, enabled: bool) -> Self {
        self.enable_pool = enabled;
        self
    }

    /// Set the pool size.
    #[must_use]
    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Set the pool checkout timeout in seconds.
    #[must_use]
    pub fn pool_timeout_secs(mut self, secs: u64) -> Self {
        self.pool_timeout_secs = secs;
        self
    }

    /// Set the connection recycle age in seconds.
    #[must_use]
    pub fn pool_recycle_secs(mut self, secs: u64) -> Self {
        self.pool_recycle_secs = secs;
        self
    }

    /// Set the overflow connection count.
    #[must_use]
    pub fn max_overflow(mut self, n: u32) -> Self {
        self.max_overflow = n;
        self
    }

    /// Enable or disable statement echo.
    #[must_use]
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Check internal consistency.
    ///
    /// The empty string is reserved as the default-shard sentinel, so it is
    /// rejected as a bind key.
    pub fn validate(&self) -> Result<()> {
        if let Some(binds) = &self.binds {
            if binds.keys().any(|key| key.is_empty()) {
                return Err(Error::config(
                    ConfigErrorKind::InvalidOption,
                    "the empty string is reserved and cannot be used as a bind key",
                ));
            }
        }
        Ok(())
    }

    /// Derive the options handed to the engine backend.
    pub fn engine_options(&self) -> EngineOptions {
        let pooling = if self.enable_pool {
            Pooling::Enabled {
                size: self.pool_size,
                timeout: Duration::from_secs(self.pool_timeout_secs),
                recycle: Duration::from_secs(self.pool_recycle_secs),
                max_overflow: self.max_overflow,
            }
        } else {
            Pooling::Disabled
        };
        EngineOptions { pooling, echo: self.echo }
    }
}
