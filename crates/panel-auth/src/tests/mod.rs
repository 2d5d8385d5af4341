//! Gate tests in both modes, with stored admins kept in the in-memory server.

use crate::{hash_password, AdminStore, AuthError, CredentialGate, LoginRequest, PoolAdminStore};
use panel_database::testing::{MemoryConnector, MemoryServer};
use panel_database::{ConnectionPool, DatabaseError, PoolConfig};
use std::sync::Arc;

const SECRET: &str = "correct horse battery staple";

async fn stored_gate(server: &MemoryServer) -> (CredentialGate, String) {
    let pool: ConnectionPool<MemoryConnector> =
        ConnectionPool::new(server.connector(), PoolConfig::default()).unwrap();
    let store = PoolAdminStore::new(pool, "panel", "admins").unwrap();
    store.ensure_schema().await.unwrap();
    let hash = hash_password("s3cret!", 4).await.unwrap();
    store.create_admin("root", &hash).await.unwrap();
    server.clear_statements();
    (CredentialGate::stored(Arc::new(store)), hash)
}

#[tokio::test]
async fn static_login_returns_the_secret() {
    let gate = CredentialGate::static_secret(SECRET);

    let token = gate.login(&LoginRequest::new(None, SECRET)).await.unwrap();
    assert_eq!(token, SECRET);

    // The username is ignored in this mode.
    let token = gate
        .login(&LoginRequest::new(Some("anyone"), SECRET))
        .await
        .unwrap();
    assert_eq!(token, SECRET);
}

#[tokio::test]
async fn static_login_rejections() {
    let gate = CredentialGate::static_secret(SECRET);

    let err = gate.login(&LoginRequest::new(None, "nope")).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(err.is_unauthorized());

    let err = gate.login(&LoginRequest::default()).await.unwrap_err();
    assert!(matches!(err, AuthError::MissingCredentials(_)));
    assert!(err.is_bad_request());

    let err = gate.login(&LoginRequest::new(None, "")).await.unwrap_err();
    assert!(err.is_bad_request());
}

#[tokio::test]
async fn static_authorize() {
    let gate = CredentialGate::static_secret(SECRET);

    gate.authorize(Some(SECRET)).await.unwrap();
    gate.authorize(Some(&format!("Bearer {SECRET}"))).await.unwrap();

    assert!(matches!(
        gate.authorize(Some("guess")).await,
        Err(AuthError::InvalidToken)
    ));
    assert!(matches!(gate.authorize(None).await, Err(AuthError::MissingToken)));
    assert!(matches!(gate.authorize(Some("")).await, Err(AuthError::MissingToken)));
}

#[tokio::test]
async fn stored_login_returns_the_hash() {
    let server = MemoryServer::new();
    let (gate, hash) = stored_gate(&server).await;

    let token = gate
        .login(&LoginRequest::new(Some("root"), "s3cret!"))
        .await
        .unwrap();
    assert_eq!(token, hash);
    assert!(!token.is_empty());

    let lookups = server.statements();
    assert_eq!(lookups.len(), 1);
    assert_eq!(lookups[0].params, vec!["root".to_string()]);
}

#[tokio::test]
async fn stored_login_rejections() {
    let server = MemoryServer::new();
    let (gate, _) = stored_gate(&server).await;

    let err = gate
        .login(&LoginRequest::new(Some("root"), "wrong"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    let err = gate
        .login(&LoginRequest::new(Some("ghost"), "s3cret!"))
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));

    server.clear_statements();
    let err = gate
        .login(&LoginRequest::new(None, "s3cret!"))
        .await
        .unwrap_err();
    assert!(err.is_bad_request());
    assert_eq!(server.statement_count(), 0);
}

#[tokio::test]
async fn stored_authorize_does_one_bound_lookup() {
    let server = MemoryServer::new();
    let (gate, hash) = stored_gate(&server).await;

    gate.authorize(Some(&hash)).await.unwrap();
    let statements = server.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].sql.contains("WHERE password_hash = ?"));
    assert_eq!(statements[0].params, vec![hash.clone()]);

    gate.authorize(Some(&format!("Bearer {hash}"))).await.unwrap();

    let err = gate.authorize(Some("$2b$04$forged")).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidToken));
}

#[tokio::test]
async fn missing_token_does_no_database_io() {
    let server = MemoryServer::new();
    let (gate, _) = stored_gate(&server).await;
    let opened = server.connections_opened();

    assert!(matches!(gate.authorize(None).await, Err(AuthError::MissingToken)));
    assert!(matches!(
        gate.authorize(Some("Bearer ")).await,
        Err(AuthError::MissingToken)
    ));
    assert_eq!(server.statement_count(), 0);
    assert_eq!(server.connections_opened(), opened);
}

#[tokio::test]
async fn store_failure_surfaces_as_database_error() {
    let server = MemoryServer::new();
    let pool = ConnectionPool::new(server.connector(), PoolConfig::default()).unwrap();
    let gate = CredentialGate::stored(Arc::new(PoolAdminStore::new(pool, "panel", "admins").unwrap()));
    server.refuse_connections(true);

    let err = gate.authorize(Some("token")).await.unwrap_err();
    assert!(matches!(err, AuthError::Database(DatabaseError::Connection(_))));
    assert!(!err.is_unauthorized());
}

#[test]
fn login_request_accepts_partial_bodies() {
    let req: LoginRequest = serde_json::from_str(r#"{"password":"x"}"#).unwrap();
    assert_eq!(req.username, None);
    assert_eq!(req.password.as_deref(), Some("x"));
    let req: LoginRequest = serde_json::from_str("{}").unwrap();
    assert!(req.password.is_none());
}
