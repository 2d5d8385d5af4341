//! Database error types.

use std::time::Duration;
use thiserror::Error;

/// Database error type.
///
/// Engine messages are carried verbatim so they can be shown to the operator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    /// A required input was missing or empty.
    #[error("{0}")]
    InvalidInput(String),

    /// A database or table name cannot be used as an identifier.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Too many callers are already waiting for a connection.
    #[error("Connection pool exhausted: {waiting} callers already waiting")]
    PoolExhausted { waiting: usize },

    /// No connection became free within the acquire timeout.
    #[error("Timed out after {0:?} waiting for a database connection")]
    PoolTimeout(Duration),

    /// The pool has been shut down.
    #[error("Connection pool is closed")]
    PoolClosed,

    /// Establishing or talking to the server failed below the SQL layer.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server rejected a statement (syntax, missing object, access denied).
    #[error("{0}")]
    Server(String),

    /// The server rejected a statement because of a unique-key violation.
    #[error("{0}")]
    Duplicate(String),
}

impl DatabaseError {
    /// Whether the caller, not the server or the pool, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::InvalidIdentifier(_))
    }

    /// Whether acquiring a connection failed.
    pub fn is_pool_error(&self) -> bool {
        matches!(
            self,
            Self::PoolExhausted { .. } | Self::PoolTimeout(_) | Self::PoolClosed | Self::Connection(_)
        )
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DatabaseError::Duplicate(db.message().to_string())
            }
            sqlx::Error::Database(db) => DatabaseError::Server(db.message().to_string()),
            sqlx::Error::Io(io) => DatabaseError::Connection(io.to_string()),
            sqlx::Error::Tls(tls) => DatabaseError::Connection(tls.to_string()),
            sqlx::Error::Protocol(msg) => DatabaseError::Connection(msg),
            other => DatabaseError::Server(other.to_string()),
        }
    }
}

/// Result type alias using DatabaseError.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
