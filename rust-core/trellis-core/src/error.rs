//! # Error Handling
//!
//! Centralized error types for Trellis core.
//! Uses `thiserror` for ergonomic error definitions.
//!
//! Only caller mistakes and preparation/connection failures are errors.
//! A statement that prepares fine but fails to execute is reported through
//! return values (`success == false`, `0`, [`crate::database::Written::Failed`]).

use thiserror::Error;

/// Result type alias for Trellis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Trellis runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid route pattern provided
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid pattern
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// A caller supplied argument that cannot be used (e.g. a missing route root)
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong
        message: String,
    },

    /// Sub-query selects must be aliased
    #[error("Sub query needs an alias")]
    MissingSubQueryAlias,

    /// SQL Server style pagination needs an ORDER BY clause
    #[error("Offsetting require column order")]
    MissingOrder,

    /// Batch insert received no rows
    #[error("No data to be inserted")]
    EmptyBatch,

    /// Batch insert row does not have the same columns as the first row
    #[error("Invalid data at position: {position}")]
    InvalidBatchRow {
        /// Zero-based row position
        position: usize,
    },

    /// `find` called with fewer values than configured keys
    #[error("Insufficient keys: expected {expected}, given {given}")]
    InsufficientKeys {
        /// Number of configured keys
        expected: usize,
        /// Number of values given
        given: usize,
    },

    /// Column is on the mapper ignore-list
    #[error("Column is forbidden: {column}")]
    ForbiddenColumn {
        /// Column name
        column: String,
    },

    /// Column is absent from the mapper load-list
    #[error("Column not exists: {column}")]
    UnknownColumn {
        /// Column name
        column: String,
    },

    /// `save` called without pending changes
    #[error("No changes to save")]
    NothingToSave,

    /// Updating a loaded row needs at least one key column
    #[error("Cannot update {table} without keys")]
    MissingKeys {
        /// Mapper table
        table: String,
    },

    /// DSN scheme not served by the connection layer
    #[error("Unsupported database driver: {driver}")]
    UnsupportedDriver {
        /// Scheme taken from the DSN
        driver: String,
    },

    /// The database handle could not be opened (or its init scripts failed)
    #[error("Unable to connect database")]
    Connect {
        /// The underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// The driver refused to prepare a statement
    #[error("Unable to prepare query: {sql}")]
    Prepare {
        /// Statement text
        sql: String,
        /// The underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// `BEGIN`, `COMMIT` or `ROLLBACK` failed
    #[error("Transaction statement failed: {statement}")]
    Transaction {
        /// Statement text
        statement: &'static str,
        /// The underlying driver error
        #[source]
        source: sqlx::Error,
    },

    /// JSON text could not be parsed
    #[error("JSON parse error: {reason}")]
    JsonParse {
        /// Parser message
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_batch_row_error() {
        let err = Error::InvalidBatchRow { position: 3 };
        assert_eq!(err.to_string(), "Invalid data at position: 3");
    }

    #[test]
    fn test_connect_error_keeps_source() {
        let err = Error::Connect {
            source: sqlx::Error::PoolClosed,
        };
        assert_eq!(err.to_string(), "Unable to connect database");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = Error::InvalidArgument {
            message: "path/does/not/exists does not exist".to_string(),
        };
        assert!(err.to_string().contains("path/does/not/exists"));
    }
}
