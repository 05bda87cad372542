//! Criteria expressions.
//!
//! A deliberately small expression tree: the registry core only ever
//! inspects column references, bound parameters, binary comparisons, `IN`
//! lists, and boolean connectives. Everything else is [`Expr::Raw`], which
//! renders verbatim and is opaque to analysis.

use shardbind_core::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Deferred producer for a bound parameter's value.
pub type DeferredValue = dyn Fn() -> Value + Send + Sync;

/// A bound parameter.
///
/// Resolution order (used by rendering and by the predicate extractor):
/// an explicit entry in the query's parameter map wins, then the deferred
/// callable, then the literal default.
#[derive(Clone)]
pub struct BindParam {
    /// Parameter key, looked up in the query's parameter map
    pub key: String,
    /// Literal default value
    pub value: Option<Value>,
    /// Deferred value producer (e.g. lazy loading)
    pub callable: Option<Arc<DeferredValue>>,
}

impl BindParam {
    /// A parameter with a literal default.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            callable: None,
        }
    }

    /// A parameter with no default; it must be supplied through the query's
    /// parameter map or the deferred callable.
    pub fn unset(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
            callable: None,
        }
    }

    /// Attach a deferred value producer.
    #[must_use]
    pub fn deferred(mut self, callable: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.callable = Some(Arc::new(callable));
        self
    }

    /// Resolve against an explicit parameter map.
    pub fn resolve(&self, params: &HashMap<String, Value>) -> Option<Value> {
        if let Some(value) = params.get(&self.key) {
            return Some(value.clone());
        }
        if let Some(callable) = &self.callable {
            return Some(callable());
        }
        self.value.clone()
    }
}

impl fmt::Debug for BindParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindParam")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("callable", &self.callable.is_some())
            .finish()
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Equal (=)
    Eq,
    /// Not equal (<>)
    Ne,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Le,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Ge,
    /// Logical AND
    And,
    /// Logical OR
    Or,
}

impl BinaryOp {
    /// SQL representation of this operator.
    pub const fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    /// Is this a value comparison (as opposed to a boolean connective)?
    pub const fn is_comparison(self) -> bool {
        !matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

/// A criteria expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Column reference with optional table qualifier
    Column {
        /// Optional table name or alias
        table: Option<String>,
        /// Column name
        name: String,
    },

    /// Literal value
    Literal(Value),

    /// Bound parameter
    Bind(BindParam),

    /// Binary operation: comparison or boolean connective
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    /// IN / NOT IN list
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// Raw SQL fragment (escape hatch, opaque to analysis)
    Raw(String),
}

impl Expr {
    /// An unqualified column reference.
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Column {
            table: None,
            name: name.into(),
        }
    }

    /// A table-qualified column reference.
    pub fn table_col(table: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::Column {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// A bound parameter with a literal default.
    pub fn bind(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Expr::Bind(BindParam::new(key, value))
    }

    /// `self = other`
    #[must_use]
    pub fn eq(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Eq, other.into())
    }

    /// `self <> other`
    #[must_use]
    pub fn ne(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Ne, other.into())
    }

    /// `self < other`
    #[must_use]
    pub fn lt(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Lt, other.into())
    }

    /// `self <= other`
    #[must_use]
    pub fn le(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Le, other.into())
    }

    /// `self > other`
    #[must_use]
    pub fn gt(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Gt, other.into())
    }

    /// `self >= other`
    #[must_use]
    pub fn ge(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Ge, other.into())
    }

    /// `self IN (values...)`
    #[must_use]
    pub fn in_list<I, T>(self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expr>,
    {
        Expr::In {
            expr: Box::new(self),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    /// `self NOT IN (values...)`
    #[must_use]
    pub fn not_in_list<I, T>(self, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Expr>,
    {
        Expr::In {
            expr: Box::new(self),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    /// `self AND other`
    #[must_use]
    pub fn and(self, other: Expr) -> Self {
        self.binary(BinaryOp::And, other)
    }

    /// `self OR other`
    #[must_use]
    pub fn or(self, other: Expr) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    fn binary(self, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    /// Render to placeholder SQL, pushing resolved parameter values onto
    /// `out`.
    ///
    /// `params` is the owning query's explicit parameter map; unresolvable
    /// bound parameters render as NULL.
    pub fn to_sql(&self, params: &HashMap<String, Value>, out: &mut Vec<Value>) -> String {
        match self {
            Expr::Column { table, name } => match table {
                Some(table) => format!("{table}.{name}"),
                None => name.clone(),
            },
            Expr::Literal(value) => {
                out.push(value.clone());
                "?".to_string()
            }
            Expr::Bind(bind) => {
                out.push(bind.resolve(params).unwrap_or(Value::Null));
                "?".to_string()
            }
            Expr::Binary { left, op, right } => {
                format!(
                    "({} {} {})",
                    left.to_sql(params, out),
                    op.as_str(),
                    right.to_sql(params, out)
                )
            }
            Expr::In {
                expr,
                values,
                negated,
            } => {
                let target = expr.to_sql(params, out);
                let rendered: Vec<String> =
                    values.iter().map(|v| v.to_sql(params, out)).collect();
                let keyword = if *negated { "NOT IN" } else { "IN" };
                format!("{target} {keyword} ({})", rendered.join(", "))
            }
            Expr::Raw(sql) => sql.clone(),
        }
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

impl From<BindParam> for Expr {
    fn from(b: BindParam) -> Self {
        Expr::Bind(b)
    }
}

impl From<bool> for Expr {
    fn from(v: bool) -> Self {
        Expr::Literal(Value::Bool(v))
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Expr::Literal(Value::Int(i64::from(v)))
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Expr::Literal(Value::Int(v))
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::Literal(Value::Float(v))
    }
}

impl From<&str> for Expr {
    fn from(v: &str) -> Self {
        Expr::Literal(Value::Text(v.to_string()))
    }
}

impl From<String> for Expr {
    fn from(v: String) -> Self {
        Expr::Literal(Value::Text(v))
    }
}
