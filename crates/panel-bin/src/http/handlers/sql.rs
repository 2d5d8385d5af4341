use crate::app::AppState;
use crate::http::ApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use panel_database::{AdhocStatement, Connector};
use serde_json::{json, Value};

/// `POST /sql`: run caller-authored SQL, optionally scoped to `db`.
pub async fn execute<C: Connector>(
    State(state): State<AppState<C>>,
    body: Result<Json<AdhocStatement>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(statement) = body?;
    let result = state.executor.execute(&statement).await?;
    Ok(Json(json!({ "result": result })))
}
