//! Core types and collaborator traits for shardbind.
//!
//! This crate provides the foundational abstractions the registry layer is
//! built on:
//!
//! - `BindKey` for addressing logical database targets
//! - `Value` and `Row` for data moving through connections
//! - `Engine`/`Connection`/`EngineBackend` collaborator traits
//! - Table and model descriptors plus the `Introspector` trait
//! - The error hierarchy shared by every shardbind crate

pub mod bind;
pub mod engine;
pub mod error;
pub mod row;
pub mod table;
pub mod uri;
pub mod value;

pub use bind::{BindKey, DEFAULT_SHARD_ID};
pub use engine::{Connection, Engine, EngineBackend, EngineOptions, Pooling};
pub use error::{
    ConfigError, ConfigErrorKind, ConnectionError, ConnectionErrorKind, Error, QueryError,
    ReflectionError, ReflectionErrorKind, Result,
};
pub use row::Row;
pub use table::{
    ColumnDescriptor, FieldBinding, Introspector, ModelDescriptor, Record, TableDescriptor,
};
pub use value::Value;
