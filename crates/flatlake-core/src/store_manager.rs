//! Tenant store registry.
//!
//! The single owner of the tenant-id to store map. Stores are created
//! lazily on first access and cached for the life of the process (or until
//! closed). This registry is an explicit object handed to the composition
//! root, not ambient global state.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use flatlake_commons::{
    ColumnSchema, FlatLakeError, FlatRecord, QueryResult, Result, TableInfo, TableName, TenantId,
};

use crate::config::{StorageMode, StoreConfig};
use crate::tenant_store::TenantStore;

/// Owns the map from tenant id to its isolated store.
///
/// Concurrency: the map is a `DashMap`; `get_or_create` goes through the
/// entry API, so the vacant entry's shard lock is held across store
/// construction and concurrent first-accesses for one tenant observe exactly
/// one store, never two and never a partially-built one.
pub struct StoreManager {
    stores: DashMap<TenantId, Arc<TenantStore>>,
    config: StoreConfig,
}

impl StoreManager {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            stores: DashMap::new(),
            config,
        }
    }

    /// Transient stores, nothing on disk.
    pub fn in_memory() -> Self {
        Self::new(StoreConfig::in_memory())
    }

    /// Return the live store for `tenant_id`, constructing and registering
    /// it on first access.
    pub fn get_or_create(&self, tenant_id: &TenantId) -> Result<Arc<TenantStore>> {
        match self.stores.entry(tenant_id.clone()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let store = self.open_store(tenant_id).map_err(|e| {
                    FlatLakeError::tenant_unavailable(format!("tenant {}: {}", tenant_id, e))
                })?;
                let store = Arc::new(store);
                entry.insert(Arc::clone(&store));
                log::info!("created store for tenant {}", tenant_id);
                Ok(store)
            }
        }
    }

    fn open_store(&self, tenant_id: &TenantId) -> Result<TenantStore> {
        match &self.config.mode {
            StorageMode::InMemory => Ok(TenantStore::open_in_memory(tenant_id.clone())),
            StorageMode::Persistent { base_dir } => {
                TenantStore::open_persistent(tenant_id.clone(), base_dir)
            }
        }
    }

    /// Create or atomically replace `table_name` in the tenant's store.
    pub async fn ingest(
        &self,
        tenant_id: &TenantId,
        table_name: &TableName,
        rows: &[FlatRecord],
        schema: &ColumnSchema,
    ) -> Result<TableInfo> {
        self.get_or_create(tenant_id)?
            .ingest(table_name, rows, schema)
            .await
    }

    /// Execute a validated read statement against the tenant's store.
    pub async fn run(&self, tenant_id: &TenantId, sql: &str) -> Result<QueryResult> {
        self.get_or_create(tenant_id)?.run(sql).await
    }

    pub fn list_tables(&self, tenant_id: &TenantId) -> Result<Vec<TableName>> {
        Ok(self.get_or_create(tenant_id)?.list_tables())
    }

    pub fn table_info(&self, tenant_id: &TenantId, table_name: &TableName) -> Result<TableInfo> {
        self.get_or_create(tenant_id)?.table_info(table_name)
    }

    /// Release one tenant's resources. A no-op for unknown or already
    /// closed tenants.
    pub fn close(&self, tenant_id: &TenantId) {
        if let Some((_, store)) = self.stores.remove(tenant_id) {
            store.close();
            log::info!("closed store for tenant {}", tenant_id);
        }
    }

    /// Release every live store; used at process shutdown. Stores busy with
    /// in-flight requests are freed when those requests drain — removal
    /// never waits on another tenant's work.
    pub fn close_all(&self) {
        let count = self.stores.len();
        self.stores.retain(|_, store| {
            store.close();
            false
        });
        if count > 0 {
            log::info!("closed {} tenant store(s)", count);
        }
    }

    /// Number of live stores.
    pub fn tenant_count(&self) -> usize {
        self.stores.len()
    }
}

impl Drop for StoreManager {
    fn drop(&mut self) {
        self.close_all();
    }
}
