//! End-to-end tests: the real router on an ephemeral port, backed by the
//! in-memory server, driven over HTTP with reqwest.


use crate::app::{build_gate, create_admin_in, serve, AppState};
use panel_auth::PoolAdminStore;
use panel_config::{AuthModeSetting, Config};
use panel_database::testing::{MemoryConnector, MemoryServer};
use panel_database::{ConnectionPool, PoolConfig};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub(crate) const SECRET: &str = "correct horse battery staple";
pub(crate) const ADMIN: &str = "root";
pub(crate) const ADMIN_PASSWORD: &str = "s3cret!";

pub(crate) struct TestApp {
    pub base: String,
    pub client: Client,
    pub server: MemoryServer,
    pub pool: ConnectionPool<MemoryConnector>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl TestApp {
    /// Static-secret deployment over a server holding `shop`.`items` and `shop`.`empty`.
    pub async fn static_mode() -> Self {
        let mut config = Config::default();
        config.auth.mode = AuthModeSetting::Static;
        config.auth.shared_secret = Some(SECRET.to_string());
        Self::start(config, shop_server(), 2).await
    }

    /// Stored-credential deployment with one admin in `panel`.`admins`.
    pub async fn stored_mode() -> Self {
        let mut config = Config::default();
        config.auth.mode = AuthModeSetting::Stored;
        config.auth.admin_database = Some("panel".to_string());
        config.auth.bcrypt_cost = 4;

        let server = shop_server();
        let pool = pool_with(&server, 2);
        let store = PoolAdminStore::new(pool.clone(), "panel", "admins").unwrap();
        create_admin_in(&store, ADMIN, ADMIN_PASSWORD, 4).await.unwrap();
        pool.close().await;

        Self::start(config, server, 2).await
    }

    pub async fn start(config: Config, server: MemoryServer, max_connections: usize) -> Self {
        let pool = pool_with(&server, max_connections);
        let gate = build_gate(&config, &pool).unwrap();
        let state = AppState::new(pool.clone(), gate);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, state, async move {
            let _ = rx.await;
        }));

        Self {
            base,
            client: Client::new(),
            server,
            pool,
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap().unwrap();
        }
        self.pool.close().await;
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

pub(crate) fn pool_with(server: &MemoryServer, max_connections: usize) -> ConnectionPool<MemoryConnector> {
    ConnectionPool::new(
        server.connector(),
        PoolConfig {
            max_connections,
            queue_limit: 0,
            acquire_timeout: Duration::from_secs(5),
        },
    )
    .unwrap()
}

pub(crate) fn shop_server() -> MemoryServer {
    let server = MemoryServer::new();
    server.create_table("shop", "items", &["id", "name"]);
    server.create_table("shop", "empty", &["id"]);
    server
}
