use crate::app::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use panel_database::Connector;
use serde_json::{json, Value};

/// `GET /health`: ping the server through the pool and report pool state.
pub async fn health<C: Connector>(State(state): State<AppState<C>>) -> (StatusCode, Json<Value>) {
    match state.pool.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "auth": state.gate.mode_name(),
                "pool": state.pool.state(),
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unavailable",
                "error": e.to_string(),
                "auth": state.gate.mode_name(),
                "pool": state.pool.state(),
            })),
        ),
    }
}
