//! Predicate extraction for shard pruning.
//!
//! Searches a query's criterion tree for binary expressions matching a
//! column against one or more known values. Boolean connectives are
//! traversed but never interpreted; callers treat the flat result set
//! conjunctively when pruning shards.

use crate::expr::{BinaryOp, Expr};
use crate::query::Query;
use serde::{Deserialize, Serialize};
use shardbind_core::Value;
use std::collections::HashMap;

/// Comparison operators reportable by extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Membership (`IN`); the comparison value is a tuple
    In,
}

impl CompareOp {
    fn from_binary(op: BinaryOp) -> Option<Self> {
        match op {
            BinaryOp::Eq => Some(CompareOp::Eq),
            BinaryOp::Ne => Some(CompareOp::Ne),
            BinaryOp::Lt => Some(CompareOp::Lt),
            BinaryOp::Le => Some(CompareOp::Le),
            BinaryOp::Gt => Some(CompareOp::Gt),
            BinaryOp::Ge => Some(CompareOp::Ge),
            BinaryOp::And | BinaryOp::Or => None,
        }
    }
}

/// A resolved comparison value: a single value, or a tuple for `IN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComparisonValue {
    One(Value),
    Many(Vec<Value>),
}

/// A `(column, operator, value-or-values)` comparison found in a criterion
/// tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Column name (unqualified)
    pub column: String,
    pub op: CompareOp,
    pub value: ComparisonValue,
}

impl Comparison {
    /// Does this comparison constrain `column` with `=` or `IN`?
    pub fn constrains(&self, column: &str) -> bool {
        self.column == column && matches!(self.op, CompareOp::Eq | CompareOp::In)
    }
}

/// Extract simple column-vs-value comparisons from a query's criterion.
///
/// Bound parameters resolve through the query's explicit parameter map
/// first, then a deferred-value callable, then the literal default; a
/// parameter that resolves through none of these makes its comparison
/// unextractable and it is skipped. Read-only; safe to call repeatedly.
pub fn extract_comparisons(query: &Query) -> Vec<Comparison> {
    let mut comparisons = Vec::new();
    if let Some(criterion) = query.criterion() {
        walk(criterion, query.params(), &mut comparisons);
    }
    comparisons
}

fn walk(expr: &Expr, params: &HashMap<String, Value>, out: &mut Vec<Comparison>) {
    match expr {
        Expr::Binary { left, op, right } => {
            if let Some(op) = CompareOp::from_binary(*op) {
                // column vs value, in either orientation
                if let (Some(column), Some(value)) = (column_name(left), resolve(right, params)) {
                    out.push(Comparison {
                        column: column.to_string(),
                        op,
                        value: ComparisonValue::One(value),
                    });
                } else if let (Some(column), Some(value)) =
                    (column_name(right), resolve(left, params))
                {
                    out.push(Comparison {
                        column: column.to_string(),
                        op,
                        value: ComparisonValue::One(value),
                    });
                }
            } else {
                walk(left, params, out);
                walk(right, params, out);
            }
        }
        Expr::In {
            expr,
            values,
            negated,
        } => {
            if *negated {
                return;
            }
            if let Some(column) = column_name(expr) {
                let resolved: Option<Vec<Value>> =
                    values.iter().map(|v| resolve(v, params)).collect();
                if let Some(tuple) = resolved {
                    out.push(Comparison {
                        column: column.to_string(),
                        op: CompareOp::In,
                        value: ComparisonValue::Many(tuple),
                    });
                }
            }
        }
        Expr::Column { .. } | Expr::Literal(_) | Expr::Bind(_) | Expr::Raw(_) => {}
    }
}

fn column_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Column { name, .. } => Some(name),
        _ => None,
    }
}

fn resolve(expr: &Expr, params: &HashMap<String, Value>) -> Option<Value> {
    match expr {
        Expr::Bind(bind) => bind.resolve(params),
        Expr::Literal(value) => Some(value.clone()),
        _ => None,
    }
}
