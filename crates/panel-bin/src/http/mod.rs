//! HTTP surface.
//!
//! ```text
//! /api/dbadmin
//! ├── POST /login      - exchange credentials for a token
//! ├── GET  /databases  - user databases            (token)
//! ├── GET  /tables     - ?db=                      (token)
//! ├── GET  /data       - ?db=&table=, max 100 rows (token)
//! └── POST /sql        - { sql, db? }              (token)
//! GET /health          - pool health check
//! ```
//!
//! Every route answers cross-origin requests, so a panel front end served
//! from another origin can call the API.

mod error;
mod gate;
mod handlers;
mod trace;

pub use error::ApiError;

use crate::app::AppState;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use panel_database::Connector;
use tower_http::cors::{Any, CorsLayer};

/// Mount point of the admin API.
pub const API_PREFIX: &str = "/api/dbadmin";

pub fn build_router<C: Connector>(state: AppState<C>) -> Router {
    let protected = Router::new()
        .route("/databases", get(handlers::catalog::list_databases::<C>))
        .route("/tables", get(handlers::catalog::list_tables::<C>))
        .route("/data", get(handlers::catalog::read_rows::<C>))
        .route("/sql", post(handlers::sql::execute::<C>))
        .route_layer(from_fn_with_state(state.clone(), gate::require_token::<C>));

    let api = Router::new()
        .route("/login", post(handlers::auth::login::<C>))
        .merge(protected);

    Router::new()
        .nest(API_PREFIX, api)
        .route("/health", get(handlers::health::health::<C>))
        .layer(from_fn(trace::trace_request))
        .layer(cors_layer())
        .with_state(state)
}

/// Any origin, with the headers the panel sends.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
