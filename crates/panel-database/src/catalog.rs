//! Read-only catalog browsing: databases, tables, and a capped row sample.
//!
//! Every statement here is generated. Caller-supplied names reach SQL only
//! through [`Identifier`], and no connection is ever rescoped: table reads
//! qualify the table with its database instead.

use crate::{ConnectionPool, Connector, DatabaseError, DatabaseResult, Identifier, QualifiedTable, RowMap};
use serde_json::Value;
use tracing::{debug, instrument};

/// Databases hidden from [`Catalog::list_databases`].
pub const SYSTEM_DATABASES: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

/// Upper bound on rows returned by [`Catalog::read_rows`].
pub const ROW_LIMIT: usize = 100;

/// Whether `name` is one of the server's own schemas.
pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES
        .iter()
        .any(|system| system.eq_ignore_ascii_case(name))
}

pub struct Catalog<C: Connector> {
    pool: ConnectionPool<C>,
}

impl<C: Connector> Clone for Catalog<C> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

impl<C: Connector> Catalog<C> {
    pub fn new(pool: ConnectionPool<C>) -> Self {
        Self { pool }
    }

    /// User databases in server order.
    #[instrument(skip(self))]
    pub async fn list_databases(&self) -> DatabaseResult<Vec<String>> {
        let rows = self.fetch("SHOW DATABASES").await?;
        let databases: Vec<String> = first_column(rows)
            .into_iter()
            .filter(|name| !is_system_database(name))
            .collect();
        debug!(count = databases.len(), "Listed databases");
        Ok(databases)
    }

    /// Tables of `database` in server order.
    #[instrument(skip(self))]
    pub async fn list_tables(&self, database: Option<&str>) -> DatabaseResult<Vec<String>> {
        let database = required(database, "Database name is required")?;
        let database = Identifier::parse(database)?;
        let rows = self
            .fetch(&format!("SHOW TABLES FROM {}", database))
            .await?;
        Ok(first_column(rows))
    }

    /// At most [`ROW_LIMIT`] rows of `database`.`table`.
    #[instrument(skip(self))]
    pub async fn read_rows(
        &self,
        database: Option<&str>,
        table: Option<&str>,
    ) -> DatabaseResult<Vec<RowMap>> {
        let database = required(database, "Database name is required")?;
        let table = required(table, "Table name is required")?;
        let target = QualifiedTable::parse(database, table)?;
        let mut rows = self
            .fetch(&format!("SELECT * FROM {} LIMIT {}", target, ROW_LIMIT))
            .await?;
        rows.truncate(ROW_LIMIT);
        debug!(count = rows.len(), "Read table rows");
        Ok(rows)
    }

    async fn fetch(&self, sql: &str) -> DatabaseResult<Vec<RowMap>> {
        let mut conn = self.pool.acquire().await?;
        let result = conn.fetch(sql).await;
        conn.release();
        result
    }
}

fn required<'a>(value: Option<&'a str>, message: &str) -> DatabaseResult<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DatabaseError::InvalidInput(message.to_string()))
}

fn first_column(rows: Vec<RowMap>) -> Vec<String> {
    rows.iter()
        .filter_map(|row| match row.first_value() {
            Some(Value::String(name)) => Some(name.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
        .collect()
}
