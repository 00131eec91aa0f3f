//! Cross-tenant isolation: identically named tables must never contend,
//! collide, or cross-read.

use std::sync::Arc;

use serde_json::json;

use flatlake_core::{flatten, FlatLakeError, StoreManager, TableName, TenantId};

async fn ingest_owned_rows(manager: &StoreManager, tenant: &TenantId, owners: &[&str]) {
    let records: Vec<_> = owners
        .iter()
        .enumerate()
        .map(|(i, owner)| json!({"id": i as i64 + 1, "owner": owner}))
        .collect();
    let (rows, schema) = flatten(&records);
    manager
        .ingest(tenant, &TableName::new("tickets"), &rows, &schema)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_identically_named_tables_never_cross() {
    let manager = Arc::new(StoreManager::in_memory());
    let tenant_a = TenantId::new("tenant-a");
    let tenant_b = TenantId::new("tenant-b");

    ingest_owned_rows(&manager, &tenant_a, &["a1", "a2"]).await;
    ingest_owned_rows(&manager, &tenant_b, &["b1", "b2", "b3"]).await;

    let result_a = manager.run(&tenant_a, "SELECT * FROM tickets").await.unwrap();
    assert_eq!(result_a.row_count, 2);
    for row in &result_a.rows {
        let owner = row[1].as_str().unwrap();
        assert!(owner.starts_with('a'), "tenant A saw foreign row: {}", owner);
    }

    let result_b = manager.run(&tenant_b, "SELECT * FROM tickets").await.unwrap();
    assert_eq!(result_b.row_count, 3);
    for row in &result_b.rows {
        assert!(row[1].as_str().unwrap().starts_with('b'));
    }

    assert_eq!(
        manager.list_tables(&tenant_a).unwrap(),
        vec![TableName::new("tickets")]
    );
    assert_eq!(
        manager.list_tables(&tenant_b).unwrap(),
        vec![TableName::new("tickets")]
    );
}

#[tokio::test]
async fn test_missing_table_never_resolves_to_another_tenant() {
    let manager = Arc::new(StoreManager::in_memory());
    let tenant_a = TenantId::new("tenant-a");
    let tenant_b = TenantId::new("tenant-b");

    ingest_owned_rows(&manager, &tenant_a, &["a1"]).await;

    let err = manager
        .run(&tenant_b, "SELECT * FROM tickets")
        .await
        .unwrap_err();
    assert!(
        matches!(err, FlatLakeError::TableNotFound(_)),
        "expected TableNotFound, got {}",
        err
    );
}

#[tokio::test]
async fn test_closing_one_tenant_leaves_others_untouched() {
    let manager = Arc::new(StoreManager::in_memory());
    let tenant_a = TenantId::new("tenant-a");
    let tenant_b = TenantId::new("tenant-b");

    ingest_owned_rows(&manager, &tenant_a, &["a1"]).await;
    ingest_owned_rows(&manager, &tenant_b, &["b1", "b2"]).await;

    manager.close(&tenant_a);

    let result = manager.run(&tenant_b, "SELECT * FROM tickets").await.unwrap();
    assert_eq!(result.row_count, 2);
}
