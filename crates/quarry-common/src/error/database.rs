//! Engine error types.
//!
//! Every statement executed by a session surfaces failures through
//! [`QuarryError`]. Variants carry enough context to be reported verbatim
//! to the client.

use std::fmt;
use thiserror::Error;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Unknown or unspecified error.
    Unknown = 0x0000,
    /// Internal error (bug).
    Internal = 0x0001,
    /// Invalid argument provided.
    InvalidArgument = 0x0003,
    /// Operation was cancelled.
    Cancelled = 0x0005,
    /// Invalid configuration.
    InvalidConfig = 0x0006,

    // I/O errors (0x0100 - 0x01FF)
    /// General I/O error.
    Io = 0x0100,

    // Storage errors (0x0200 - 0x02FF)
    /// Metadata store read or write failed.
    StorageFailed = 0x0200,
    /// Encoding or decoding of a stored value failed.
    Serialization = 0x0201,

    // Transaction errors (0x0300 - 0x03FF)
    /// No transaction is active on the session.
    NoActiveTransaction = 0x0300,
    /// The transaction layer rejected the operation.
    TransactionFailed = 0x0301,

    // Schema errors (0x0400 - 0x04FF)
    /// Database does not exist.
    DatabaseNotExists = 0x0400,
    /// Table does not exist.
    TableNotExists = 0x0401,
    /// No database selected for an unqualified name.
    NoDatabaseSelected = 0x0402,
    /// Database already exists.
    DatabaseExists = 0x0403,
    /// Table already exists.
    TableExists = 0x0404,

    // Account errors (0x0500 - 0x05FF)
    /// User account already exists.
    DuplicateUser = 0x0500,
    /// A user management operation failed for one or more accounts.
    CannotUser = 0x0501,
    /// Malformed `user@host` specification.
    InvalidUser = 0x0502,

    // Execution errors (0x0600 - 0x06FF)
    /// Expression evaluation failed.
    EvalFailed = 0x0600,
    /// The session cannot run restricted internal queries.
    RestrictedSqlUnsupported = 0x0601,
    /// A table scan failed while reading rows.
    ScanFailed = 0x0602,
    /// Building table statistics failed.
    StatisticsFailed = 0x0603,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "I/O",
            0x02 => "Storage",
            0x03 => "Transaction",
            0x04 => "Schema",
            0x05 => "Account",
            0x06 => "Execution",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for Quarry.
///
/// # Example
///
/// ```rust
/// use quarry_common::error::{ErrorCode, QuarryError};
///
/// let err = QuarryError::DatabaseNotExists { name: "shop".into() };
/// assert_eq!(err.code(), ErrorCode::DatabaseNotExists);
/// assert_eq!(err.to_string(), "Unknown database 'shop'");
/// ```
#[derive(Debug, Error)]
pub enum QuarryError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    /// Operation was cancelled.
    #[error("operation was cancelled")]
    Cancelled,

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    /// I/O error from the underlying system.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    // ==========================================================================
    // Storage Errors
    // ==========================================================================
    /// Metadata store failure.
    #[error("storage error: {message}")]
    Storage {
        /// Error message.
        message: String,
    },

    /// Encoding or decoding failure.
    #[error("serialization error: {message}")]
    Serialization {
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // Transaction Errors
    // ==========================================================================
    /// No transaction is active.
    #[error("no active transaction")]
    NoActiveTransaction,

    /// Transaction layer failure.
    #[error("transaction error: {message}")]
    Transaction {
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // Schema Errors
    // ==========================================================================
    /// Database does not exist.
    #[error("Unknown database '{name}'")]
    DatabaseNotExists {
        /// The missing database.
        name: String,
    },

    /// Table does not exist.
    #[error("Table '{schema}.{table}' doesn't exist")]
    TableNotExists {
        /// Schema that was searched.
        schema: String,
        /// The missing table.
        table: String,
    },

    /// An unqualified name was used without a current database.
    #[error("No database selected")]
    NoDatabaseSelected,

    /// Database already exists.
    #[error("Can't create database '{name}'; database exists")]
    DatabaseExists {
        /// The existing database.
        name: String,
    },

    /// Table already exists.
    #[error("Table '{schema}.{table}' already exists")]
    TableExists {
        /// Schema holding the table.
        schema: String,
        /// The existing table.
        table: String,
    },

    // ==========================================================================
    // Account Errors
    // ==========================================================================
    /// User already exists.
    #[error("Duplicate user {user}")]
    DuplicateUser {
        /// The `user@host` that already exists.
        user: String,
    },

    /// One or more accounts could not be processed.
    #[error("Operation {operation} failed for {users}")]
    CannotUser {
        /// Statement name, e.g. `DROP USER`.
        operation: String,
        /// Comma-separated list of failed accounts.
        users: String,
    },

    /// Malformed `user@host` string.
    #[error("invalid user specification '{spec}'")]
    InvalidUser {
        /// The input that failed to parse.
        spec: String,
    },

    // ==========================================================================
    // Execution Errors
    // ==========================================================================
    /// Expression evaluation failed.
    #[error("evaluation error: {message}")]
    Eval {
        /// Error message.
        message: String,
    },

    /// The session cannot run restricted internal queries.
    #[error("restricted SQL execution is not supported by this session")]
    RestrictedSqlUnsupported,

    /// A table scan failed.
    #[error("scan failed: {message}")]
    ScanFailed {
        /// Error message.
        message: String,
    },

    /// Building statistics failed.
    #[error("failed to build statistics for table {table}: {reason}")]
    StatisticsBuild {
        /// The table being analyzed.
        table: String,
        /// Reason for failure.
        reason: String,
    },
}

impl QuarryError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Internal { .. } => ErrorCode::Internal,
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            Self::Io { .. } => ErrorCode::Io,
            Self::Storage { .. } => ErrorCode::StorageFailed,
            Self::Serialization { .. } => ErrorCode::Serialization,
            Self::NoActiveTransaction => ErrorCode::NoActiveTransaction,
            Self::Transaction { .. } => ErrorCode::TransactionFailed,
            Self::DatabaseNotExists { .. } => ErrorCode::DatabaseNotExists,
            Self::TableNotExists { .. } => ErrorCode::TableNotExists,
            Self::NoDatabaseSelected => ErrorCode::NoDatabaseSelected,
            Self::DatabaseExists { .. } => ErrorCode::DatabaseExists,
            Self::TableExists { .. } => ErrorCode::TableExists,
            Self::DuplicateUser { .. } => ErrorCode::DuplicateUser,
            Self::CannotUser { .. } => ErrorCode::CannotUser,
            Self::InvalidUser { .. } => ErrorCode::InvalidUser,
            Self::Eval { .. } => ErrorCode::EvalFailed,
            Self::RestrictedSqlUnsupported => ErrorCode::RestrictedSqlUnsupported,
            Self::ScanFailed { .. } => ErrorCode::ScanFailed,
            Self::StatisticsBuild { .. } => ErrorCode::StatisticsFailed,
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates an evaluation error.
    #[must_use]
    pub fn eval(message: impl Into<String>) -> Self {
        Self::Eval {
            message: message.into(),
        }
    }

    /// Creates a scan error.
    #[must_use]
    pub fn scan(message: impl Into<String>) -> Self {
        Self::ScanFailed {
            message: message.into(),
        }
    }
}
