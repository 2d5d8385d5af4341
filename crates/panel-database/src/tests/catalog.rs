use super::{pool_with, shop_server};
use crate::testing::{MemoryServer, Scripted};
use crate::{Catalog, DatabaseError, RowMap, ROW_LIMIT, SYSTEM_DATABASES};
use serde_json::{json, Value};

fn names(rows: &[&str], column: &str) -> Vec<RowMap> {
    rows.iter()
        .map(|name| [(column, Value::String(name.to_string()))].into_iter().collect())
        .collect()
}

#[tokio::test]
async fn test_list_databases_hides_system_schemas() {
    let server = shop_server();
    server.create_database("analytics");
    let pool = pool_with(&server, 2);
    let catalog = Catalog::new(pool.clone());

    let databases = catalog.list_databases().await.unwrap();
    assert_eq!(databases, vec!["shop", "analytics"]);
    for system in SYSTEM_DATABASES {
        assert!(!databases.iter().any(|d| d == system));
    }
    assert_eq!(pool.state().borrowed, 0);
}

#[tokio::test]
async fn test_list_databases_filters_regardless_of_case_and_keeps_order() {
    let server = MemoryServer::new();
    server.script(
        "SHOW DATABASES",
        Scripted::Rows(names(
            &["zoo", "MySQL", "INFORMATION_SCHEMA", "alpha", "sys", "Performance_Schema"],
            "Database",
        )),
    );
    let catalog = Catalog::new(pool_with(&server, 1));

    assert_eq!(catalog.list_databases().await.unwrap(), vec!["zoo", "alpha"]);
}

#[tokio::test]
async fn test_list_databases_with_only_system_schemas_is_empty() {
    let server = MemoryServer::new();
    let catalog = Catalog::new(pool_with(&server, 1));
    assert!(catalog.list_databases().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_tables_in_server_order() {
    let server = shop_server();
    let catalog = Catalog::new(pool_with(&server, 1));

    let tables = catalog.list_tables(Some("shop")).await.unwrap();
    assert_eq!(tables, vec!["items", "empty"]);
    assert_eq!(server.statements()[0].sql, "SHOW TABLES FROM `shop`");
}

#[tokio::test]
async fn test_list_tables_requires_database_without_touching_pool() {
    let server = shop_server();
    let pool = pool_with(&server, 1);
    let catalog = Catalog::new(pool.clone());

    for missing in [None, Some("")] {
        let err = catalog.list_tables(missing).await.unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidInput(_)));
        assert!(err.is_client_error());
    }
    assert_eq!(server.statement_count(), 0);
    assert_eq!(server.connections_opened(), 0);
}

#[tokio::test]
async fn test_list_tables_unknown_database_is_server_error() {
    let server = MemoryServer::new();
    let pool = pool_with(&server, 1);
    let catalog = Catalog::new(pool.clone());

    let err = catalog.list_tables(Some("nope")).await.unwrap_err();
    assert_eq!(err, DatabaseError::Server("Unknown database 'nope'".to_string()));
    assert_eq!(pool.state().borrowed, 0);
}

#[tokio::test]
async fn test_hostile_names_stay_in_identifier_position() {
    let server = shop_server();
    let catalog = Catalog::new(pool_with(&server, 1));

    let hostile = "shop`; DROP DATABASE shop; -- ";
    let err = catalog.list_tables(Some(hostile)).await.unwrap_err();
    assert_eq!(err, DatabaseError::Server(format!("Unknown database '{}'", hostile)));

    let err = catalog
        .read_rows(Some("shop"), Some("items` UNION SELECT 1; --"))
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Server(msg) if msg.contains("doesn't exist")));

    let sent: Vec<String> = server.statements().into_iter().map(|s| s.sql).collect();
    assert_eq!(
        sent,
        vec![
            "SHOW TABLES FROM `shop``; DROP DATABASE shop; -- `".to_string(),
            "SELECT * FROM `shop`.`items`` UNION SELECT 1; --` LIMIT 100".to_string(),
        ]
    );
    assert!(server.has_table("shop", "items"));
}

#[tokio::test]
async fn test_read_rows_empty_table_is_empty_not_error() {
    let server = shop_server();
    let catalog = Catalog::new(pool_with(&server, 1));

    let rows = catalog.read_rows(Some("shop"), Some("empty")).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_read_rows_preserves_column_order() {
    let server = shop_server();
    server.insert_row("shop", "items", vec![json!(1), json!("kettle")]);
    server.insert_row("shop", "items", vec![json!(2), Value::Null]);
    let catalog = Catalog::new(pool_with(&server, 1));

    let rows = catalog.read_rows(Some("shop"), Some("items")).await.unwrap();
    assert_eq!(
        serde_json::to_string(&rows).unwrap(),
        r#"[{"id":1,"name":"kettle"},{"id":2,"name":null}]"#
    );
}

#[tokio::test]
async fn test_read_rows_caps_at_limit() {
    let server = shop_server();
    for i in 0..150 {
        server.insert_row("shop", "items", vec![json!(i), json!(format!("item {i}"))]);
    }
    let catalog = Catalog::new(pool_with(&server, 1));

    let rows = catalog.read_rows(Some("shop"), Some("items")).await.unwrap();
    assert_eq!(rows.len(), ROW_LIMIT);
    assert_eq!(rows[0].get("id"), Some(&json!(0)));
    assert_eq!(
        server.statements()[0].sql,
        "SELECT * FROM `shop`.`items` LIMIT 100"
    );
}

#[tokio::test]
async fn test_read_rows_truncates_oversized_server_response() {
    let server = MemoryServer::new();
    let oversized: Vec<RowMap> = (0..120)
        .map(|i| [("n", json!(i))].into_iter().collect())
        .collect();
    server.script("SELECT * FROM `big`.`t` LIMIT 100", Scripted::Rows(oversized));
    let catalog = Catalog::new(pool_with(&server, 1));

    let rows = catalog.read_rows(Some("big"), Some("t")).await.unwrap();
    assert_eq!(rows.len(), ROW_LIMIT);
}

#[tokio::test]
async fn test_read_rows_requires_both_names() {
    let server = shop_server();
    let catalog = Catalog::new(pool_with(&server, 1));

    assert!(matches!(
        catalog.read_rows(Some("shop"), None).await,
        Err(DatabaseError::InvalidInput(_))
    ));
    assert!(matches!(
        catalog.read_rows(None, Some("items")).await,
        Err(DatabaseError::InvalidInput(_))
    ));
    assert_eq!(server.statement_count(), 0);
}

#[tokio::test]
async fn test_catalog_never_rescopes() {
    let server = shop_server();
    let pool = pool_with(&server, 1);
    let catalog = Catalog::new(pool.clone());

    catalog.list_databases().await.unwrap();
    catalog.list_tables(Some("shop")).await.unwrap();
    catalog.read_rows(Some("shop"), Some("items")).await.unwrap();
    let _ = catalog.read_rows(Some("shop"), Some("missing")).await;

    assert!(server.statements().iter().all(|s| s.database.is_none()));
    let state = pool.state();
    assert_eq!(state.retired, 0);
    assert_eq!(state.borrowed, 0);
    assert_eq!(server.connections_opened(), 1);
}
