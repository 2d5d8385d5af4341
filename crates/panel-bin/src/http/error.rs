//! Mapping of crate errors onto HTTP responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use panel_auth::AuthError;
use panel_database::DatabaseError;
use serde_json::json;
use tracing::{error, warn};

/// Error returned by every handler. Always rendered as a JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(msg) | Self::Unauthorized(msg) | Self::Internal(msg) => msg,
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        if e.is_client_error() {
            return Self::BadRequest(e.to_string());
        }
        if e.is_pool_error() {
            error!(error = %e, "Database unavailable");
        } else {
            warn!(error = %e, "Statement rejected by server");
        }
        Self::Internal(e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Database(db) => db.into(),
            e if e.is_unauthorized() => Self::Unauthorized(e.to_string()),
            e if e.is_bad_request() => Self::BadRequest(e.to_string()),
            e => {
                error!(error = %e, "Authentication failure");
                Self::Internal(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}
