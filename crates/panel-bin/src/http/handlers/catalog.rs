//! Catalog browsing: databases, tables, and a capped row preview.

use crate::app::AppState;
use crate::http::ApiError;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use panel_database::Connector;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct TablesQuery {
    pub db: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DataQuery {
    pub db: Option<String>,
    pub table: Option<String>,
}

pub async fn list_databases<C: Connector>(
    State(state): State<AppState<C>>,
) -> Result<Json<Value>, ApiError> {
    let databases = state.catalog.list_databases().await?;
    Ok(Json(json!({ "databases": databases })))
}

pub async fn list_tables<C: Connector>(
    State(state): State<AppState<C>>,
    query: Result<Query<TablesQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let tables = state.catalog.list_tables(query.db.as_deref()).await?;
    Ok(Json(json!({ "tables": tables })))
}

pub async fn read_rows<C: Connector>(
    State(state): State<AppState<C>>,
    query: Result<Query<DataQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let rows = state
        .catalog
        .read_rows(query.db.as_deref(), query.table.as_deref())
        .await?;
    Ok(Json(json!({ "data": rows })))
}
