//! Error types for the SQLite run logger.

use aqualisys_core::QualityError;
use thiserror::Error;

/// Errors that can occur while reading or writing run records.
#[derive(Debug, Error)]
pub enum SqliteLoggerError {
    /// SQLite reported an error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database directory could not be created
    #[error("Failed to create database directory '{path}': {source}")]
    CreateDir {
        /// Directory path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A stored value could not be decoded
    #[error("Invalid stored value in column '{column}': {message}")]
    InvalidValue {
        /// Column name
        column: String,
        /// What is wrong with the value
        message: String,
    },

    /// Another thread panicked while holding the connection
    #[error("Connection lock poisoned")]
    Poisoned,
}

impl SqliteLoggerError {
    /// Creates a new invalid value error.
    pub fn invalid_value(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Returns true if SQLite reported the database as busy or locked.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if matches!(
                    err.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
        )
    }
}

impl From<SqliteLoggerError> for QualityError {
    fn from(err: SqliteLoggerError) -> Self {
        QualityError::logging(err.to_string())
    }
}

/// Result type for SQLite logger operations.
pub type Result<T> = std::result::Result<T, SqliteLoggerError>;
