//! Query criteria model and predicate extraction for shardbind.
//!
//! This crate provides the read-only object graph the registry core
//! inspects when routing queries:
//!
//! - [`Expr`] - criteria expression tree (columns, bound parameters,
//!   comparisons, boolean connectives)
//! - [`Query`] - a query with a criterion, an explicit parameter map, and
//!   minimal placeholder-SQL rendering
//! - [`extract_comparisons`] - the predicate extractor used for shard
//!   pruning

pub mod analyze;
pub mod expr;
pub mod query;

pub use analyze::{Comparison, CompareOp, ComparisonValue, extract_comparisons};
pub use expr::{BinaryOp, BindParam, Expr};
pub use query::Query;
