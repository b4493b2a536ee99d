//! Error types for stagesync
//!
//! Provides granular error classification so callers can tell apart:
//! - Validation failures (detected before any database I/O)
//! - Transactional failures (rolled back before being reported)
//! - Connectivity failures (always propagated)

use std::fmt;
use thiserror::Error;

/// Result type for stagesync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Connection-related errors (retriable)
    Connection,
    /// Query execution errors
    Query,
    /// Transaction errors
    Transaction,
    /// Deadlock detected (retriable)
    Deadlock,
    /// Input validation failures, no I/O performed
    Validation,
    /// Schema-related errors (table not found)
    Schema,
    /// Configuration error
    Configuration,
}

impl ErrorCategory {
    /// Whether errors in this category are generally retriable
    #[inline]
    pub const fn is_retriable(self) -> bool {
        matches!(self, Self::Connection | Self::Deadlock)
    }
}

/// Main error type for stagesync
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    /// Connection failed
    #[error("connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Query execution failed
    #[error("query error: {message}")]
    Query {
        message: String,
        sql: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Transaction error
    #[error("transaction error: {message}")]
    Transaction {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Deadlock detected
    #[error("deadlock detected")]
    Deadlock,

    /// Join key set cannot be applied to the row batch
    #[error("invalid join key: {reason}")]
    InvalidJoinKey { reason: String },

    /// Row batch has no rows (or no columns) to derive an update from
    #[error("empty row batch")]
    EmptyBatch,

    /// A row's column set diverges from the batch's column set
    #[error("row {row} does not match the batch column set")]
    ColumnMismatch { row: usize },

    /// Table not found
    #[error("table not found: {table}")]
    TableNotFound { table: String },

    /// Schema error
    #[error("schema error: {message}")]
    Schema { message: String },

    /// Configuration error
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl Error {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connection { .. } => ErrorCategory::Connection,
            Self::Query { .. } => ErrorCategory::Query,
            Self::Transaction { .. } => ErrorCategory::Transaction,
            Self::Deadlock => ErrorCategory::Deadlock,
            Self::InvalidJoinKey { .. } | Self::EmptyBatch | Self::ColumnMismatch { .. } => {
                ErrorCategory::Validation
            }
            Self::TableNotFound { .. } | Self::Schema { .. } => ErrorCategory::Schema,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Whether this error is retriable
    #[inline]
    pub fn is_retriable(&self) -> bool {
        self.category().is_retriable()
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql: None,
            source: None,
        }
    }

    /// Create a query error carrying the failed SQL and driver error
    pub fn query_with_source(
        message: impl Into<String>,
        sql: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Query {
            message: message.into(),
            sql: Some(sql.into()),
            source: Some(Box::new(source)),
        }
    }

    /// Create a transaction error
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transaction error with source
    pub fn transaction_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transaction {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid-join-key error
    pub fn invalid_join_key(reason: impl Into<String>) -> Self {
        Self::InvalidJoinKey {
            reason: reason.into(),
        }
    }

    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection => write!(f, "connection"),
            Self::Query => write!(f, "query"),
            Self::Transaction => write!(f, "transaction"),
            Self::Deadlock => write!(f, "deadlock"),
            Self::Validation => write!(f, "validation"),
            Self::Schema => write!(f, "schema"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
