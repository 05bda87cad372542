//! Bind identifiers.

use std::fmt;

/// The shard id meaning "use the default bind's connection".
///
/// Shard-aware code that returns this value degrades to non-sharded
/// behavior; because of that, the empty string is reserved and must not be
/// used as a named bind key.
pub const DEFAULT_SHARD_ID: &str = "";

/// Identifier for a logical database target.
///
/// `Default` is backed by the primary URI; `Named` binds are backed by the
/// bind map. Binds are disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindKey {
    /// The default bind (primary URI)
    Default,
    /// A named bind from the bind map
    Named(String),
}

impl BindKey {
    /// Build a key from a shard id, mapping the reserved
    /// [`DEFAULT_SHARD_ID`] sentinel to the default bind.
    pub fn from_shard_id(shard_id: &str) -> Self {
        if shard_id == DEFAULT_SHARD_ID {
            BindKey::Default
        } else {
            BindKey::Named(shard_id.to_string())
        }
    }

    /// Build a named key.
    pub fn named(name: impl Into<String>) -> Self {
        BindKey::Named(name.into())
    }

    /// Is this the default bind?
    pub const fn is_default(&self) -> bool {
        matches!(self, BindKey::Default)
    }

    /// The bind name, if named.
    pub fn name(&self) -> Option<&str> {
        match self {
            BindKey::Default => None,
            BindKey::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for BindKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindKey::Default => write!(f, "<default>"),
            BindKey::Named(name) => write!(f, "{name}"),
        }
    }
}

impl From<&str> for BindKey {
    fn from(name: &str) -> Self {
        BindKey::Named(name.to_string())
    }
}

impl From<String> for BindKey {
    fn from(name: String) -> Self {
        BindKey::Named(name)
    }
}

impl From<&BindKey> for BindKey {
    fn from(key: &BindKey) -> Self {
        key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_maps_to_default() {
        assert_eq!(BindKey::from_shard_id(""), BindKey::Default);
        assert_eq!(
            BindKey::from_shard_id("shard_001"),
            BindKey::Named("shard_001".to_string())
        );
    }

    #[test]
    fn display() {
        assert_eq!(BindKey::Default.to_string(), "<default>");
        assert_eq!(BindKey::named("reports").to_string(), "reports");
        assert!(BindKey::Default.is_default());
        assert_eq!(BindKey::named("reports").name(), Some("reports"));
    }
}
