//! Store lifecycle: concurrent creation, replacement, close semantics, and
//! backend failure reporting.

use std::sync::Arc;
use std::thread;

use serde_json::json;

use flatlake_core::{
    flatten, FlatLakeError, StoreConfig, StoreManager, TableName, TenantId,
};

#[test]
fn test_concurrent_first_access_creates_exactly_one_store() {
    let manager = Arc::new(StoreManager::in_memory());
    let tenant = TenantId::new("fresh-tenant");

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let tenant = tenant.clone();
            thread::spawn(move || manager.get_or_create(&tenant).unwrap())
        })
        .collect();

    let stores: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = &stores[0];
    assert!(
        stores.iter().all(|s| Arc::ptr_eq(first, s)),
        "concurrent get_or_create returned distinct stores"
    );
    assert_eq!(manager.tenant_count(), 1);
}

#[test]
fn test_close_is_idempotent_and_tolerates_unknown_tenants() {
    let manager = StoreManager::in_memory();
    let tenant = TenantId::new("tenant-a");

    // Never created: both must be no-ops.
    manager.close(&tenant);
    manager.close_all();

    manager.get_or_create(&tenant).unwrap();
    assert_eq!(manager.tenant_count(), 1);

    manager.close(&tenant);
    manager.close(&tenant);
    assert_eq!(manager.tenant_count(), 0);

    // Closed tenants can come back; they get a fresh store.
    let reopened = manager.get_or_create(&tenant).unwrap();
    assert!(reopened.list_tables().is_empty());
}

#[test]
fn test_close_all_releases_every_store() {
    let manager = StoreManager::in_memory();
    for name in ["t1", "t2", "t3"] {
        manager.get_or_create(&TenantId::new(name)).unwrap();
    }
    assert_eq!(manager.tenant_count(), 3);

    manager.close_all();
    assert_eq!(manager.tenant_count(), 0);
}

#[tokio::test]
async fn test_reingest_replaces_table() {
    let manager = StoreManager::in_memory();
    let tenant = TenantId::new("tenant-a");
    let table = TableName::new("tickets");

    let (rows, schema) = flatten(&[json!({"id": 1}), json!({"id": 2})]);
    let info = manager.ingest(&tenant, &table, &rows, &schema).await.unwrap();
    assert_eq!(info.row_count, 2);

    let (rows, schema) = flatten(&[
        json!({"id": 10, "status": "open"}),
        json!({"id": 11, "status": "open"}),
        json!({"id": 12, "status": "closed"}),
    ]);
    let info = manager.ingest(&tenant, &table, &rows, &schema).await.unwrap();
    assert_eq!(info.row_count, 3);
    assert_eq!(info.schema.names(), vec!["id", "status"]);

    // Readers see the replacement in full, never a mix.
    let result = manager.run(&tenant, "SELECT * FROM tickets").await.unwrap();
    assert_eq!(result.row_count, 3);
    assert_eq!(result.columns, vec!["id", "status"]);

    let info = manager.table_info(&tenant, &table).unwrap();
    assert_eq!(info.row_count, 3);
}

#[test]
fn test_unreachable_backend_reports_tenant_unavailable() {
    // Pointing the base dir at an existing file makes directory creation
    // fail for every tenant.
    let blocker = tempfile::NamedTempFile::new().unwrap();
    let manager = StoreManager::new(StoreConfig::persistent(blocker.path()));

    let err = manager.get_or_create(&TenantId::new("tenant-a")).unwrap_err();
    assert!(
        matches!(err, FlatLakeError::TenantUnavailable(_)),
        "expected TenantUnavailable, got {}",
        err
    );
    assert_eq!(manager.tenant_count(), 0);

    // The failed attempt must not poison later ones through a cached
    // half-built store.
    let err = manager.get_or_create(&TenantId::new("tenant-a")).unwrap_err();
    assert!(matches!(err, FlatLakeError::TenantUnavailable(_)));
}

#[tokio::test]
async fn test_ingest_with_no_columns_is_rejected() {
    let manager = StoreManager::in_memory();
    let tenant = TenantId::new("tenant-a");
    let (rows, schema) = flatten(&[]);

    let err = manager
        .ingest(&tenant, &TableName::new("empty"), &rows, &schema)
        .await
        .unwrap_err();
    assert!(matches!(err, FlatLakeError::InvalidInput(_)));
}
