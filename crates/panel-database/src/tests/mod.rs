//! Pool, catalog and executor tests against the in-memory server.
//!
//! - `pool.rs`     - borrow/release accounting, saturation, rescope retirement, shutdown
//! - `catalog.rs`  - denylist, identifier quoting, row cap
//! - `executor.rs` - empty SQL, result classification, rescope isolation
//! - `mysql.rs`    - the same paths against a live server (ignored, needs `DATABASE_URL`)

mod catalog;

use crate::testing::{MemoryConnector, MemoryServer};
use crate::{ConnectionPool, PoolConfig};
use std::time::Duration;

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

/// A server with `shop`.`items` (id, name) and an empty `shop`.`empty`.
pub(crate) fn shop_server() -> MemoryServer {
    let server = MemoryServer::new();
    server.create_table("shop", "items", &["id", "name"]);
    server.create_table("shop", "empty", &["id"]);
    server
}

pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within 2s");
}
