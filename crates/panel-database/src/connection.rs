//! The seam between the pool and a concrete server.
//!
//! The pool only knows how to open, hand out, and close connections. What a
//! connection can do is described by [`ServerConnection`]; the production
//! implementation speaks MySQL through sqlx, and the `testing` feature adds
//! an in-memory server.

use crate::{DatabaseResult, Identifier, QueryResult, RowMap};
use async_trait::async_trait;

/// Opens new server connections for the pool.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Connection: ServerConnection;

    /// Establish a new connection with no default database selected.
    async fn connect(&self) -> DatabaseResult<Self::Connection>;
}

/// One live server session.
#[async_trait]
pub trait ServerConnection: Send + 'static {
    /// Run generated SQL with no parameters and collect every row.
    async fn fetch(&mut self, sql: &str) -> DatabaseResult<Vec<RowMap>>;

    /// Run SQL with `?` placeholders bound to `params` in order.
    async fn fetch_bound(&mut self, sql: &str, params: &[String]) -> DatabaseResult<Vec<RowMap>>;

    /// Run a bound statement that returns no rows; yields the affected count.
    async fn execute_bound(&mut self, sql: &str, params: &[String]) -> DatabaseResult<u64>;

    /// Run caller-authored SQL verbatim and classify the response.
    async fn execute_raw(&mut self, sql: &str) -> DatabaseResult<QueryResult>;

    /// Make `database` the session's default database.
    async fn use_database(&mut self, database: &Identifier) -> DatabaseResult<()>;

    /// Cheap round trip proving the session is alive.
    async fn ping(&mut self) -> DatabaseResult<()>;

    /// Close the session politely.
    async fn close(self) -> DatabaseResult<()>
    where
        Self: Sized;
}
