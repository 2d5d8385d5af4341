//! Shared application state.

use panel_auth::CredentialGate;
use panel_database::{AdhocExecutor, Catalog, ConnectionPool, Connector};
use std::sync::Arc;

/// State handed to every handler. Built once at startup; cloning is cheap.
pub struct AppState<C: Connector> {
    /// The only shared mutable resource. Closed at shutdown.
    pub pool: ConnectionPool<C>,
    pub catalog: Catalog<C>,
    pub executor: AdhocExecutor<C>,
    pub gate: Arc<CredentialGate>,
}

impl<C: Connector> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            catalog: self.catalog.clone(),
            executor: self.executor.clone(),
            gate: Arc::clone(&self.gate),
        }
    }
}

impl<C: Connector> AppState<C> {
    pub fn new(pool: ConnectionPool<C>, gate: CredentialGate) -> Self {
        Self {
            catalog: Catalog::new(pool.clone()),
            executor: AdhocExecutor::new(pool.clone()),
            pool,
            gate: Arc::new(gate),
        }
    }
}
