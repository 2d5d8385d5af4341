//! Pooled, multi-database access layer for dbpanel.
//!
//! This crate provides:
//! - A bounded connection pool with no database preselected
//! - Identifier quoting for database and table names
//! - The catalog explorer (databases, tables, capped row reads)
//! - The ad-hoc SQL executor
//! - A MySQL backend on sqlx, and an in-memory server behind `testing`
//!
//! # Architecture
//!
//! ```text
//! Catalog / AdhocExecutor -> ConnectionPool<C> -> C::Connection -> server
//! ```
//!
//! The pool is generic over a [`Connector`]; production code uses
//! [`MySqlConnector`]. A connection that was rescoped with `USE` is never
//! handed to another borrower: it is closed on release.

mod catalog;
mod connection;
mod error;
mod executor;
pub mod ident;
mod models;
mod mysql;
mod pool;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

#[cfg(test)]
mod tests;

pub use catalog::{is_system_database, Catalog, ROW_LIMIT, SYSTEM_DATABASES};
pub use connection::{Connector, ServerConnection};
pub use error::{DatabaseError, DatabaseResult};
pub use executor::AdhocExecutor;
pub use ident::{escape_identifier, Identifier, QualifiedTable, MAX_IDENTIFIER_LEN};
pub use models::{AdhocStatement, MutationSummary, QueryResult, RowMap};
pub use mysql::{MySqlConnector, MySqlSession};
pub use pool::{ConnectionPool, PoolConfig, PoolState, PooledConnection};
