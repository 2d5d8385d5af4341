//! Ad-hoc SQL execution.
//!
//! A request borrows one connection, optionally selects a database on that
//! connection alone, runs the caller's text verbatim, and releases the
//! connection on every path. Whether the outcome is a row set or a mutation
//! summary is decided from the server's response, never from the SQL text.

use crate::{AdhocStatement, ConnectionPool, Connector, DatabaseError, DatabaseResult, Identifier, QueryResult};
use tracing::{debug, info, warn};

pub struct AdhocExecutor<C: Connector> {
    pool: ConnectionPool<C>,
}

impl<C: Connector> Clone for AdhocExecutor<C> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

impl<C: Connector> AdhocExecutor<C> {
    pub fn new(pool: ConnectionPool<C>) -> Self {
        Self { pool }
    }

    /// Run one caller-authored statement.
    ///
    /// Empty or whitespace-only SQL is rejected before the pool is touched.
    /// Server errors come back as [`DatabaseError::Server`] carrying the
    /// engine's message, and are never retried.
    pub async fn execute(&self, statement: &AdhocStatement) -> DatabaseResult<QueryResult> {
        if statement.sql.trim().is_empty() {
            return Err(DatabaseError::InvalidInput("SQL query is required".to_string()));
        }
        let database = statement
            .target_database()
            .map(Identifier::parse)
            .transpose()?;

        let mut conn = self.pool.acquire().await?;

        let result = async {
            if let Some(database) = &database {
                conn.use_database(database).await?;
                debug!(database = %database.name(), "Rescoped connection");
            }
            conn.execute_raw(&statement.sql).await
        }
        .await;

        conn.release();

        match &result {
            Ok(QueryResult::Rows(rows)) => {
                info!(rows = rows.len(), database = ?statement.target_database(), "Ad-hoc query returned rows")
            }
            Ok(QueryResult::Mutation(summary)) => info!(
                affected_rows = summary.affected_rows,
                database = ?statement.target_database(),
                "Ad-hoc statement applied"
            ),
            Err(e) => warn!(error = %e, database = ?statement.target_database(), "Ad-hoc statement failed"),
        }
        result
    }
}
