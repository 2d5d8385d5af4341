use crate::app::AppState;
use crate::http::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use panel_auth::LoginRequest;
use panel_database::Connector;
use serde_json::{json, Value};

/// `POST /login`. Failures use `{ success: false, message }` instead of the
/// usual `{ error }` body.
pub async fn login<C: Connector>(
    State(state): State<AppState<C>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let outcome = match body {
        Ok(Json(request)) => state.gate.login(&request).await.map_err(ApiError::from),
        Err(rejection) => Err(ApiError::from(rejection)),
    };

    match outcome {
        Ok(token) => (StatusCode::OK, Json(json!({ "success": true, "token": token }))),
        Err(e) => (
            e.status(),
            Json(json!({ "success": false, "message": e.message() })),
        ),
    }
}
