//! The query object handed to sessions and routers.

use crate::expr::Expr;
use shardbind_core::Value;
use std::collections::HashMap;

/// A query over one table: projected columns, an AND-combined criterion,
/// an explicit parameter map, and an optional row limit.
///
/// The registry core never interprets a query beyond its criterion tree;
/// rendering is placeholder-style only and carries no dialect logic.
#[derive(Debug, Clone)]
pub struct Query {
    table: String,
    columns: Vec<String>,
    criterion: Option<Expr>,
    params: HashMap<String, Value>,
    limit: Option<u64>,
}

impl Query {
    /// Start a query over `table`, selecting all columns.
    pub fn select(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            criterion: None,
            params: HashMap::new(),
            limit: None,
        }
    }

    /// Project specific columns.
    #[must_use]
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|&c| c.to_string()).collect();
        self
    }

    /// Add a criterion, AND-combined with any existing one.
    #[must_use]
    pub fn filter(mut self, expr: Expr) -> Self {
        self.criterion = Some(match self.criterion {
            Some(existing) => existing.and(expr),
            None => expr,
        });
        self
    }

    /// Supply an explicit value for a bound parameter key.
    ///
    /// Explicit values take precedence over deferred callables and literal
    /// defaults during rendering and predicate extraction.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Cap the number of returned rows.
    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// The queried table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The criterion tree, if any.
    pub fn criterion(&self) -> Option<&Expr> {
        self.criterion.as_ref()
    }

    /// The explicit parameter map.
    pub fn params(&self) -> &HashMap<String, Value> {
        &self.params
    }

    /// Render to placeholder SQL plus parameters.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = String::from("SELECT ");
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(&self.table);
        if let Some(criterion) = &self.criterion {
            sql.push_str(" WHERE ");
            sql.push_str(&criterion.to_sql(&self.params, &mut params));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        (sql, params)
    }
}
