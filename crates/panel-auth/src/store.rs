//! Admin credential storage.
//!
//! Records live in one table (default `admins`) inside a configured database,
//! with at least `username` and `password_hash` columns. Usernames and hashes
//! are always bound parameters; the table name goes through
//! [`QualifiedTable`].

use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use panel_database::{ConnectionPool, Connector, DatabaseError, QualifiedTable, RowMap};
use serde_json::Value;
use tracing::{debug, info};

/// A stored admin account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRecord {
    pub username: String,
    pub password_hash: String,
}

/// Lookups the credential gate needs, plus bootstrap writes.
#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<AdminRecord>>;

    /// Whether any admin has exactly this password hash.
    async fn token_exists(&self, password_hash: &str) -> AuthResult<bool>;

    /// Insert a new admin. A taken username yields [`AuthError::AdminExists`].
    async fn create_admin(&self, username: &str, password_hash: &str) -> AuthResult<()>;

    /// Create the admin database and table when missing.
    async fn ensure_schema(&self) -> AuthResult<()>;
}

/// [`AdminStore`] over the shared connection pool.
pub struct PoolAdminStore<C: Connector> {
    pool: ConnectionPool<C>,
    table: QualifiedTable,
}

impl<C: Connector> PoolAdminStore<C> {
    pub fn new(pool: ConnectionPool<C>, database: &str, table: &str) -> AuthResult<Self> {
        Ok(Self {
            pool,
            table: QualifiedTable::parse(database, table)?,
        })
    }

    pub fn table(&self) -> &QualifiedTable {
        &self.table
    }

    async fn fetch_bound(&self, sql: &str, params: &[String]) -> AuthResult<Vec<RowMap>> {
        let mut conn = self.pool.acquire().await?;
        let result = conn.fetch_bound(sql, params).await;
        conn.release();
        Ok(result?)
    }

    async fn execute_bound(&self, sql: &str, params: &[String]) -> AuthResult<u64> {
        let mut conn = self.pool.acquire().await?;
        let result = conn.execute_bound(sql, params).await;
        conn.release();
        Ok(result?)
    }
}

#[async_trait]
impl<C: Connector> AdminStore for PoolAdminStore<C> {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<AdminRecord>> {
        let sql = format!(
            "SELECT username, password_hash FROM {} WHERE username = ? LIMIT 1",
            self.table
        );
        let rows = self.fetch_bound(&sql, &[username.to_string()]).await?;
        Ok(rows.first().and_then(|row| {
            Some(AdminRecord {
                username: text(row.get("username")?)?,
                password_hash: text(row.get("password_hash")?)?,
            })
        }))
    }

    async fn token_exists(&self, password_hash: &str) -> AuthResult<bool> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE password_hash = ? LIMIT 1",
            self.table
        );
        let rows = self.fetch_bound(&sql, &[password_hash.to_string()]).await?;
        Ok(!rows.is_empty())
    }

    async fn create_admin(&self, username: &str, password_hash: &str) -> AuthResult<()> {
        let sql = format!(
            "INSERT INTO {} (username, password_hash) VALUES (?, ?)",
            self.table
        );
        match self
            .execute_bound(&sql, &[username.to_string(), password_hash.to_string()])
            .await
        {
            Ok(_) => {
                info!(username = %username, table = %self.table, "Admin account created");
                Ok(())
            }
            Err(AuthError::Database(DatabaseError::Duplicate(_))) => {
                Err(AuthError::AdminExists(username.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn ensure_schema(&self) -> AuthResult<()> {
        self.execute_bound(
            &format!("CREATE DATABASE IF NOT EXISTS {}", self.table.database),
            &[],
        )
        .await?;
        self.execute_bound(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 id INT AUTO_INCREMENT PRIMARY KEY, \
                 username VARCHAR(255) NOT NULL UNIQUE, \
                 password_hash VARCHAR(255) NOT NULL, \
                 created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP)",
                self.table
            ),
            &[],
        )
        .await?;
        debug!(table = %self.table, "Admin table ready");
        Ok(())
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
