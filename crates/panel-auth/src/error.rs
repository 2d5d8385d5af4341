//! Authentication error types.

use panel_database::DatabaseError;
use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Login request without the fields the current mode needs.
    #[error("{0}")]
    MissingCredentials(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Unauthorized")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Admin '{0}' already exists")]
    AdminExists(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl AuthError {
    /// Whether the failure means "not authenticated" rather than a fault.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::MissingToken | Self::InvalidToken
        )
    }

    /// Whether the request itself was malformed.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, Self::MissingCredentials(_))
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
