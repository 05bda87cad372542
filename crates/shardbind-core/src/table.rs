//! Reflected table and model metadata.
//!
//! Descriptors are plain owned data: once produced by the reflector they
//! carry no reference to any engine or live schema, so they can outlive
//! both. The "mapped class" of the ORM world is reframed here as
//! [`ModelDescriptor`], an ordinary data structure mapping field names to
//! columns and able to mint empty [`Record`]s.

use crate::engine::Engine;
use crate::error::Result;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Descriptors
// ============================================================================

/// Metadata for one reflected column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,
    /// SQL type as reported by the schema (e.g. `VARCHAR(255)`)
    pub sql_type: String,
    /// Whether NULL is allowed
    pub nullable: bool,
    /// Whether the column participates in the primary key
    pub primary_key: bool,
    /// Server-side default expression, if any
    pub default: Option<String>,
}

/// Metadata for one reflected table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name
    pub name: String,
    /// Columns in schema order
    pub columns: Vec<ColumnDescriptor>,
    /// Primary key column names
    pub primary_key: Vec<String>,
    /// Table comment, if any
    pub comment: Option<String>,
}

impl TableDescriptor {
    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in schema order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// One field of a model, bound to a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldBinding {
    /// Sanitized field identifier
    pub field: String,
    /// Backing column name
    pub column: String,
}

/// A data-access descriptor synthesized from a reflected table.
///
/// Fields are the table's columns with identifiers sanitized for use as
/// ordinary names; the model name is the pascal-cased table name.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    /// Pascal-cased model name (e.g. `user_account` -> `UserAccount`)
    pub name: String,
    /// The reflected table backing this model
    pub table: Arc<TableDescriptor>,
    /// Field-to-column bindings, in schema order
    pub fields: Vec<FieldBinding>,
}

impl ModelDescriptor {
    /// Synthesize a model from a reflected table.
    pub fn from_table(table: Arc<TableDescriptor>) -> Self {
        let name = pascal_case(&table.name);
        let fields = table
            .columns
            .iter()
            .map(|c| FieldBinding {
                field: sanitize_identifier(&c.name),
                column: c.name.clone(),
            })
            .collect();
        Self { name, table, fields }
    }

    /// Find the column backing a field.
    pub fn column_for_field(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|b| b.field == field)
            .map(|b| b.column.as_str())
    }

    /// Mint an empty record for this model's table, all columns NULL.
    pub fn new_record(&self) -> Record {
        let mut record = Record::new(&self.table.name);
        for column in &self.table.columns {
            record.values.insert(column.name.clone(), Value::Null);
        }
        record
    }
}

/// Turn a table name into a model name: `user_account` -> `UserAccount`.
fn pascal_case(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Sanitize a column name into a field identifier.
fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

// ============================================================================
// Records
// ============================================================================

/// An ordered column-to-value map for one table row.
///
/// Records are what callers hand to a session's working set and what the
/// write chooser inspects when picking a shard.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Target table name
    pub table: String,
    /// Column values, ordered by column name
    pub values: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record for `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: BTreeMap::new(),
        }
    }

    /// Set a column value (builder style).
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Set a column value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    /// Get a column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }
}

// ============================================================================
// Introspection collaborator
// ============================================================================

/// Schema-introspection facility, implemented by the database-access
/// library.
pub trait Introspector: Send + Sync {
    /// Reflect a single table from the live schema reachable via `engine`.
    ///
    /// The returned descriptor must already be detached (plain data, no
    /// connection references). A missing table surfaces as
    /// [`Error::Reflection`](crate::error::Error::Reflection) with
    /// `TableNotFound`.
    fn reflect(&self, table: &str, engine: &dyn Engine) -> Result<TableDescriptor>;
}
