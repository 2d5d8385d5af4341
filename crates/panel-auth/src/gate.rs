//! The credential gate: login and per-request token checks.
//!
//! Two deployment modes, one per process:
//!
//! - **Static secret.** The login password is compared with a configured
//!   shared secret, and the token handed back is that secret.
//! - **Stored admins.** The login is checked against a bcrypt hash in the
//!   admin table, and the token handed back is the stored hash. A request is
//!   authorized when some admin row carries exactly that hash.
//!
//! Tokens never expire; rotating the secret or the hash revokes them.

use crate::password::verify_password;
use crate::{AdminStore, AuthError, AuthResult};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Body of a login request. Both fields are optional on the wire so that a
/// missing field is reported as a bad request, not a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn new(username: Option<&str>, password: &str) -> Self {
        Self {
            username: username.map(str::to_string),
            password: Some(password.to_string()),
        }
    }
}

pub enum CredentialGate {
    StaticSecret { secret: String },
    Stored { store: Arc<dyn AdminStore> },
}

impl fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticSecret { .. } => f
                .debug_struct("StaticSecret")
                .field("secret", &"[REDACTED]")
                .finish(),
            Self::Stored { .. } => f.debug_struct("Stored").finish_non_exhaustive(),
        }
    }
}

impl CredentialGate {
    pub fn static_secret(secret: impl Into<String>) -> Self {
        Self::StaticSecret {
            secret: secret.into(),
        }
    }

    pub fn stored(store: Arc<dyn AdminStore>) -> Self {
        Self::Stored { store }
    }

    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::StaticSecret { .. } => "static",
            Self::Stored { .. } => "stored",
        }
    }

    /// Check login credentials and return the bearer token.
    pub async fn login(&self, request: &LoginRequest) -> AuthResult<String> {
        let password = non_empty(request.password.as_deref());
        match self {
            Self::StaticSecret { secret } => {
                let password = password.ok_or_else(|| {
                    AuthError::MissingCredentials("Password is required".to_string())
                })?;
                if constant_time_eq(password, secret) {
                    info!(mode = "static", "Login succeeded");
                    Ok(secret.clone())
                } else {
                    warn!(mode = "static", "Login rejected");
                    Err(AuthError::InvalidCredentials)
                }
            }
            Self::Stored { store } => {
                let (username, password) = match (non_empty(request.username.as_deref()), password) {
                    (Some(username), Some(password)) => (username, password),
                    _ => {
                        return Err(AuthError::MissingCredentials(
                            "Username and password are required".to_string(),
                        ))
                    }
                };

                let Some(admin) = store.find_by_username(username).await? else {
                    warn!(mode = "stored", username = %username, "Login rejected: unknown admin");
                    return Err(AuthError::InvalidCredentials);
                };
                if verify_password(password, &admin.password_hash).await? {
                    info!(mode = "stored", username = %username, "Login succeeded");
                    Ok(admin.password_hash)
                } else {
                    warn!(mode = "stored", username = %username, "Login rejected: wrong password");
                    Err(AuthError::InvalidCredentials)
                }
            }
        }
    }

    /// Check the `Authorization` header of a protected request.
    ///
    /// The token may be sent raw or with a `Bearer ` prefix. A missing or
    /// empty header fails without any database access.
    pub async fn authorize(&self, header: Option<&str>) -> AuthResult<()> {
        let token = header.map(strip_bearer).and_then(|t| non_empty(Some(t)));
        let Some(token) = token else {
            debug!("Request without token");
            return Err(AuthError::MissingToken);
        };

        let valid = match self {
            Self::StaticSecret { secret } => constant_time_eq(token, secret),
            Self::Stored { store } => store.token_exists(token).await?,
        };
        if valid {
            Ok(())
        } else {
            debug!(mode = self.mode_name(), "Request with invalid token");
            Err(AuthError::InvalidToken)
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn strip_bearer(header: &str) -> &str {
    let header = header.trim();
    match header.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => header[7..].trim_start(),
        _ => header,
    }
}

/// Compare SHA-256 digests so the time taken does not depend on where the
/// inputs first differ, nor on their lengths.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
