//! Result rows returned by connections.

use crate::value::Value;
use std::sync::Arc;

/// A single result row.
///
/// The column header is shared between all rows of a result set, so cloning
/// a row is cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Column names, shared across the result set
    columns: Arc<Vec<String>>,
    /// Cell values, in column order
    values: Vec<Value>,
}

impl Row {
    /// Create a row from a shared column header and cell values.
    pub fn new(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Create a row with its own column header.
    ///
    /// Convenient for tests and single-row results; prefer [`Row::new`] with
    /// a shared header for full result sets.
    pub fn from_pairs(pairs: Vec<(&str, Value)>) -> Self {
        let (columns, values) = pairs
            .into_iter()
            .map(|(c, v)| (c.to_string(), v))
            .unzip::<_, _, Vec<_>, Vec<_>>();
        Self {
            columns: Arc::new(columns),
            values,
        }
    }

    /// The column names of this row.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Is the row empty?
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a cell by column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a cell by column name.
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c == name)?;
        self.values.get(index)
    }

    /// Consume the row and return its cell values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
