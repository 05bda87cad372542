//! Error types for shardbind operations.

use std::fmt;

/// The primary error type for all shardbind operations.
#[derive(Debug)]
pub enum Error {
    /// Configuration errors (unknown bind, missing URI, invalid option)
    Config(ConfigError),
    /// Connection-related errors (connect, auth, pool checkout)
    Connection(ConnectionError),
    /// Schema reflection errors
    Reflection(ReflectionError),
    /// Statement/query execution errors from an engine
    Query(QueryError),
    /// I/O errors
    Io(std::io::Error),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// A named bind was requested but is absent from the bind map
    UnknownBind,
    /// An operation needs an engine but no URI is configured for the bind
    MissingUri,
    /// A URI was configured but is not usable
    InvalidUri,
    /// An option value is out of range or inconsistent
    InvalidOption,
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish connection
    Connect,
    /// Authentication failed
    Authentication,
    /// Connection lost during operation
    Disconnected,
    /// DNS resolution failed
    DnsResolution,
    /// Connection refused
    Refused,
    /// Connection pool exhausted
    PoolExhausted,
    /// Checkout or connect timed out
    Timeout,
}

#[derive(Debug)]
pub struct ReflectionError {
    pub kind: ReflectionErrorKind,
    /// The table the reflection was asked for, if known
    pub table: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectionErrorKind {
    /// The named table does not exist in the live schema
    TableNotFound,
    /// Introspection itself failed (I/O, permissions, malformed metadata)
    Introspection,
}

#[derive(Debug)]
pub struct QueryError {
    pub message: String,
    /// The statement that failed, if available
    pub sql: Option<String>,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Build a configuration error.
    pub fn config(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            kind,
            message: message.into(),
        })
    }

    /// Build the error for a named bind that is absent from the bind map.
    pub fn unknown_bind(bind_key: &str) -> Self {
        Error::config(
            ConfigErrorKind::UnknownBind,
            format!("bind '{bind_key}' is not present in the bind map"),
        )
    }

    /// Build the error for an operation that needs an engine on a bind
    /// without a configured URI.
    pub fn missing_uri(bind: impl fmt::Display) -> Self {
        Error::config(
            ConfigErrorKind::MissingUri,
            format!("no database URI configured for bind {bind}"),
        )
    }

    /// Is this a misconfiguration the caller should fix before retrying?
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Is this a transient connectivity failure that a retry might clear?
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Connection(c) => matches!(
                c.kind,
                ConnectionErrorKind::Disconnected
                    | ConnectionErrorKind::PoolExhausted
                    | ConnectionErrorKind::Timeout
            ),
            Error::Io(_) => true,
            _ => false,
        }
    }

    /// Get the SQL that caused this error, if available.
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Reflection(e) => match &e.table {
                Some(table) => write!(f, "Reflection error for table '{}': {}", table, e.message),
                None => write!(f, "Reflection error: {}", e.message),
            },
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Reflection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ReflectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<ReflectionError> for Error {
    fn from(err: ReflectionError) -> Self {
        Error::Reflection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Result type alias for shardbind operations.
pub type Result<T> = std::result::Result<T, Error>;
