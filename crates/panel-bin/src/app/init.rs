//! Server initialization.

use crate::app::lifecycle::shutdown_signal;
use crate::app::AppState;
use crate::http::build_router;
use panel_auth::{CredentialGate, PoolAdminStore};
use panel_config::{AuthModeSetting, Config};
use panel_database::{ConnectionPool, Connector, MySqlConnector, PoolConfig};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Pool settings from configuration.
pub fn pool_config(config: &Config) -> PoolConfig {
    PoolConfig {
        max_connections: config.pool.max_connections as usize,
        queue_limit: config.pool.queue_limit,
        acquire_timeout: config.pool.acquire_timeout(),
    }
}

/// Build the gate for the configured mode.
pub fn build_gate<C: Connector>(
    config: &Config,
    pool: &ConnectionPool<C>,
) -> Result<CredentialGate, Box<dyn std::error::Error>> {
    match config.auth.mode {
        AuthModeSetting::Static => {
            let secret = config
                .auth
                .shared_secret
                .clone()
                .filter(|s| !s.is_empty())
                .ok_or("static auth mode requires a shared secret")?;
            Ok(CredentialGate::static_secret(secret))
        }
        AuthModeSetting::Stored => {
            let database = config
                .auth
                .admin_database
                .as_deref()
                .filter(|s| !s.is_empty())
                .ok_or("stored auth mode requires an admin database")?;
            let store = PoolAdminStore::new(pool.clone(), database, &config.auth.admin_table)?;
            Ok(CredentialGate::stored(Arc::new(store)))
        }
    }
}

/// Run the HTTP server until a shutdown signal arrives.
pub async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        database_host = %config.database.host,
        database_port = config.database.port,
        database_user = %config.database.user,
        pool_size = config.pool.max_connections,
        auth_mode = ?config.auth.mode,
        "Starting dbpanel"
    );

    let connector = MySqlConnector::new(
        &config.database.host,
        config.database.port,
        &config.database.user,
        &config.database.password,
    );
    let pool = ConnectionPool::new(connector, pool_config(&config))?;

    // Startup continues without the server; each request reports its own error.
    if let Err(e) = pool.health_check().await {
        warn!(error = %e, "Database server not reachable at startup");
    }

    let gate = build_gate(&config, &pool)?;
    let bind_address = config.server.bind_address();
    let state = AppState::new(pool.clone(), gate);

    let listener = TcpListener::bind(&bind_address).await?;
    info!(
        address = %listener.local_addr()?,
        auth_mode = state.gate.mode_name(),
        "dbpanel listening"
    );

    let result = serve(listener, state, shutdown_signal()).await;

    pool.close().await;
    info!("dbpanel stopped");

    result.map_err(|e| e.into())
}

/// Serve the router on `listener` until `shutdown` resolves.
pub async fn serve<C, F>(listener: TcpListener, state: AppState<C>, shutdown: F) -> std::io::Result<()>
where
    C: Connector,
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
