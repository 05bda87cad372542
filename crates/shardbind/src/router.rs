//! Shard routing.
//!
//! Three independently replaceable decision functions pick the physical
//! database(s) for an operation:
//!
//! - the **write chooser** picks one shard for a record being flushed
//! - the **lookup chooser** lists shards to probe for an identity lookup,
//!   in search order
//! - the **query chooser** lists shards a query fans out across
//!
//! All three default to the [`DEFAULT_SHARD_ID`] sentinel, so an
//! unconfigured router behaves exactly like a non-sharded session. A
//! chooser returning an empty list means "no shard matched"; both
//! list-returning paths fall back to the default shard rather than running
//! against zero shards.

use shardbind_core::Record;
use shardbind_core::Value;
pub use shardbind_core::bind::DEFAULT_SHARD_ID;
use shardbind_query::{ComparisonValue, Expr, Query, extract_comparisons};
use std::sync::{Arc, RwLock};

/// Identifier for one physical shard. Bind keys double as shard ids; the
/// empty string is the default-bind sentinel.
pub type ShardId = String;

type WriteChooser = dyn Fn(&Record, Option<&Expr>) -> ShardId + Send + Sync;
type LookupChooser = dyn Fn(&Query, &[Value]) -> Vec<ShardId> + Send + Sync;
type QueryChooser = dyn Fn(&Query) -> Vec<ShardId> + Send + Sync;

/// The three-hook shard decision protocol.
///
/// Choosers are replaceable at runtime and independently of one another;
/// replacing one does not affect sessions already created, because
/// sessions consult the router on every operation.
pub struct ShardRouter {
    write_chooser: RwLock<Arc<WriteChooser>>,
    lookup_chooser: RwLock<Arc<LookupChooser>>,
    query_chooser: RwLock<Arc<QueryChooser>>,
}

impl ShardRouter {
    /// A router with the default choosers: everything targets the default
    /// shard.
    pub fn new() -> Self {
        Self {
            write_chooser: RwLock::new(Arc::new(|_, _| DEFAULT_SHARD_ID.to_string())),
            lookup_chooser: RwLock::new(Arc::new(|_, _| vec![DEFAULT_SHARD_ID.to_string()])),
            query_chooser: RwLock::new(Arc::new(|_| vec![DEFAULT_SHARD_ID.to_string()])),
        }
    }

    /// Replace the write chooser.
    pub fn set_write_chooser(
        &self,
        chooser: impl Fn(&Record, Option<&Expr>) -> ShardId + Send + Sync + 'static,
    ) {
        *self.write_chooser.write().unwrap() = Arc::new(chooser);
    }

    /// Replace the identity-lookup chooser.
    pub fn set_lookup_chooser(
        &self,
        chooser: impl Fn(&Query, &[Value]) -> Vec<ShardId> + Send + Sync + 'static,
    ) {
        *self.lookup_chooser.write().unwrap() = Arc::new(chooser);
    }

    /// Replace the query-fanout chooser.
    pub fn set_query_chooser(
        &self,
        chooser: impl Fn(&Query) -> Vec<ShardId> + Send + Sync + 'static,
    ) {
        *self.query_chooser.write().unwrap() = Arc::new(chooser);
    }

    /// The shard a record is persisted to.
    pub fn write_target(&self, record: &Record, clause: Option<&Expr>) -> ShardId {
        let chooser = self.write_chooser.read().unwrap().clone();
        chooser(record, clause)
    }

    /// The shards to probe for an identity lookup, in order. Never empty.
    pub fn lookup_targets(&self, query: &Query, ident: &[Value]) -> Vec<ShardId> {
        let chooser = self.lookup_chooser.read().unwrap().clone();
        fallback_to_default(chooser(query, ident))
    }

    /// The shards a query fans out across. Never empty.
    pub fn query_targets(&self, query: &Query) -> Vec<ShardId> {
        let chooser = self.query_chooser.read().unwrap().clone();
        fallback_to_default(chooser(query))
    }
}

impl Default for ShardRouter {
    fn default() -> Self {
        Self::new()
    }
}

fn fallback_to_default(targets: Vec<ShardId>) -> Vec<ShardId> {
    if targets.is_empty() {
        tracing::debug!("chooser returned no shards, falling back to the default shard");
        vec![DEFAULT_SHARD_ID.to_string()]
    } else {
        targets
    }
}

/// Build a query chooser that prunes `shards` using equality and `IN`
/// comparisons on `column`.
///
/// Each matching value is mapped to a shard through `shard_for_value`;
/// a query with no comparison on `column` fans out across all `shards`.
pub fn shard_key_query_chooser<F>(
    column: impl Into<String>,
    shards: Vec<ShardId>,
    shard_for_value: F,
) -> impl Fn(&Query) -> Vec<ShardId> + Send + Sync + 'static
where
    F: Fn(&Value) -> Option<ShardId> + Send + Sync + 'static,
{
    let column = column.into();
    move |query| {
        let mut targets: Vec<ShardId> = Vec::new();
        let mut constrained = false;
        for comparison in extract_comparisons(query) {
            if !comparison.constrains(&column) {
                continue;
            }
            constrained = true;
            let values: Vec<&Value> = match &comparison.value {
                ComparisonValue::One(value) => vec![value],
                ComparisonValue::Many(values) => values.iter().collect(),
            };
            for value in values {
                if let Some(shard) = shard_for_value(value) {
                    if !targets.contains(&shard) {
                        targets.push(shard);
                    }
                }
            }
        }
        if constrained { targets } else { shards.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_the_default_shard() {
        let router = ShardRouter::new();
        let record = Record::new("users");
        let query = Query::select("users");

        assert_eq!(router.write_target(&record, None), DEFAULT_SHARD_ID);
        assert_eq!(
            router.lookup_targets(&query, &[Value::Int(1)]),
            vec![DEFAULT_SHARD_ID.to_string()]
        );
        assert_eq!(
            router.query_targets(&query),
            vec![DEFAULT_SHARD_ID.to_string()]
        );
    }

    #[test]
    fn empty_chooser_output_falls_back_to_default() {
        let router = ShardRouter::new();
        router.set_query_chooser(|_| Vec::new());
        router.set_lookup_chooser(|_, _| Vec::new());

        let query = Query::select("users");
        assert_eq!(
            router.query_targets(&query),
            vec![DEFAULT_SHARD_ID.to_string()]
        );
        assert_eq!(
            router.lookup_targets(&query, &[]),
            vec![DEFAULT_SHARD_ID.to_string()]
        );
    }

    #[test]
    fn choosers_are_independently_replaceable() {
        let router = ShardRouter::new();
        router.set_write_chooser(|record, _| {
            record
                .get("region")
                .and_then(Value::as_text)
                .unwrap_or(DEFAULT_SHARD_ID)
                .to_string()
        });

        let record = Record::new("users").with("region", "shard_eu");
        assert_eq!(router.write_target(&record, None), "shard_eu");
        // the other hooks keep their defaults
        assert_eq!(
            router.query_targets(&Query::select("users")),
            vec![DEFAULT_SHARD_ID.to_string()]
        );
    }

    fn modulo_chooser() -> impl Fn(&Query) -> Vec<ShardId> + Send + Sync {
        shard_key_query_chooser(
            "shard_key",
            vec!["shard_000".to_string(), "shard_001".to_string()],
            |value| value.as_int().map(|i| format!("shard_{:03}", i % 2)),
        )
    }

    #[test]
    fn pruning_by_equality_and_in() {
        let chooser = modulo_chooser();

        let eq = Query::select("users").filter(Expr::col("shard_key").eq(3_i64));
        assert_eq!(chooser(&eq), vec!["shard_001".to_string()]);

        let in_list = Query::select("users").filter(Expr::col("shard_key").in_list([2_i64, 3, 4]));
        assert_eq!(
            chooser(&in_list),
            vec!["shard_000".to_string(), "shard_001".to_string()]
        );
    }

    #[test]
    fn no_relevant_predicate_fans_out_to_all_shards() {
        let chooser = modulo_chooser();
        let query = Query::select("users").filter(Expr::col("name").eq("bob"));
        assert_eq!(
            chooser(&query),
            vec!["shard_000".to_string(), "shard_001".to_string()]
        );
    }
}
