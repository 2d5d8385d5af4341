//! `dbpanel create-admin`: bootstrap an admin account for stored-credential login.

use panel_auth::{hash_password, AdminStore, AuthError, PoolAdminStore};
use panel_config::Config;
use panel_database::{ConnectionPool, MySqlConnector, PoolConfig};
use tracing::{info, warn};

/// Create the admin table if needed and insert one admin.
///
/// A taken username is an error, so the process exits non-zero.
pub async fn create_admin(
    config: &Config,
    username: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let database = config
        .auth
        .admin_database
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or("an admin database is required (set DB_NAME)")?;

    let connector = MySqlConnector::new(
        &config.database.host,
        config.database.port,
        &config.database.user,
        &config.database.password,
    );
    let pool = ConnectionPool::new(
        connector,
        PoolConfig {
            max_connections: 1,
            ..PoolConfig::default()
        },
    )?;
    let store = PoolAdminStore::new(pool.clone(), database, &config.auth.admin_table)?;

    let result = create_admin_in(&store, username, password, config.auth.bcrypt_cost).await;
    pool.close().await;

    match result {
        Ok(()) => {
            println!("Admin '{}' created in {}", username, store.table());
            Ok(())
        }
        Err(AuthError::AdminExists(name)) => {
            warn!(username = %name, "Admin already exists");
            Err(format!("admin '{}' already exists", name).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// Ensure the schema, hash the password, and insert the record.
pub async fn create_admin_in(
    store: &dyn AdminStore,
    username: &str,
    password: &str,
    cost: u32,
) -> Result<(), AuthError> {
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials(
            "Username and password are required".to_string(),
        ));
    }

    store.ensure_schema().await?;
    let hash = hash_password(password, cost).await?;
    store.create_admin(username, &hash).await?;
    info!(username = %username, "Admin bootstrap complete");
    Ok(())
}
