//! Per-tenant analytical store.
//!
//! One `TenantStore` wraps one DataFusion `SessionContext`; the catalog it
//! owns holds exactly one tenant's tables. Nothing outside this module hands
//! out the context, so there is no path to another tenant's data that does
//! not go through the [`crate::StoreManager`] with that tenant's id.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::datasource::memory::MemTable;
use datafusion::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use datafusion::parquet::arrow::ArrowWriter;
use datafusion::parquet::basic::{Compression, ZstdLevel};
use datafusion::parquet::file::properties::WriterProperties;
use datafusion::prelude::{SessionConfig, SessionContext};
use tokio::sync::RwLock;

use flatlake_commons::{
    ColumnSchema, FlatLakeError, FlatRecord, QueryResult, Result, TableInfo, TableName, TenantId,
};

use crate::arrow_json;

/// Metadata tracked per table, refreshed on every ingest.
#[derive(Debug, Clone)]
pub struct TableMeta {
    pub schema: ColumnSchema,
    pub row_count: usize,
    pub created_at: DateTime<Utc>,
}

/// One tenant's isolated analytical store.
pub struct TenantStore {
    tenant_id: TenantId,
    ctx: SessionContext,
    tables: DashMap<TableName, Arc<TableMeta>>,
    /// Guards the catalog swap on ingest against concurrent planning.
    /// Readers hold it only while a statement is planned; execution of the
    /// built plan proceeds lock-free against the provider it captured.
    swap_lock: RwLock<()>,
    /// Tenant directory in persistent mode; `None` for transient stores.
    data_dir: Option<PathBuf>,
}

impl std::fmt::Debug for TenantStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantStore")
            .field("tenant_id", &self.tenant_id)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl TenantStore {
    fn session_context() -> SessionContext {
        let config = SessionConfig::new()
            .with_information_schema(true)
            .with_default_catalog_and_schema("flatlake", "main");
        SessionContext::new_with_config(config)
    }

    /// Transient store: everything lives in the session, discarded on drop.
    pub(crate) fn open_in_memory(tenant_id: TenantId) -> Self {
        log::debug!("opening in-memory store for tenant {}", tenant_id);
        Self {
            tenant_id,
            ctx: Self::session_context(),
            tables: DashMap::new(),
            swap_lock: RwLock::new(()),
            data_dir: None,
        }
    }

    /// Persistent store: tables are written through to Parquet under a
    /// directory derived from the tenant id hash, and reattached here.
    pub(crate) fn open_persistent(tenant_id: TenantId, base_dir: &Path) -> Result<Self> {
        let data_dir = base_dir.join(format!("tenant_{}", tenant_id.storage_hash()));
        fs::create_dir_all(&data_dir)?;

        let store = Self {
            tenant_id,
            ctx: Self::session_context(),
            tables: DashMap::new(),
            swap_lock: RwLock::new(()),
            data_dir: Some(data_dir),
        };
        store.reattach()?;
        Ok(store)
    }

    /// Register every Parquet file found in the tenant directory. Runs
    /// before the store is shared, so no locking.
    fn reattach(&self) -> Result<()> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let table = match TableName::try_new(stem) {
                Ok(table) => table,
                Err(e) => {
                    log::warn!("skipping unrecognized file {}: {}", path.display(), e);
                    continue;
                }
            };
            self.attach_parquet(&table, &path)?;
        }
        if !self.tables.is_empty() {
            log::info!(
                "tenant {} reattached {} table(s)",
                self.tenant_id,
                self.tables.len()
            );
        }
        Ok(())
    }

    fn attach_parquet(&self, table: &TableName, path: &Path) -> Result<()> {
        let file = fs::File::open(path)?;
        let created_at = file
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now);

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| FlatLakeError::storage(format!("{}: {}", path.display(), e)))?;
        let arrow_schema = builder.schema().clone();
        let reader = builder
            .build()
            .map_err(|e| FlatLakeError::storage(format!("{}: {}", path.display(), e)))?;
        let batches = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| FlatLakeError::storage(format!("{}: {}", path.display(), e)))?;
        let row_count = batches.iter().map(|b| b.num_rows()).sum();

        let provider = MemTable::try_new(arrow_schema.clone(), vec![batches])
            .map_err(|e| FlatLakeError::storage(e.to_string()))?;
        self.ctx
            .register_table(table.as_str(), Arc::new(provider))
            .map_err(|e| FlatLakeError::storage(e.to_string()))?;

        self.tables.insert(
            table.clone(),
            Arc::new(TableMeta {
                schema: arrow_json::arrow_to_schema(&arrow_schema),
                row_count,
                created_at,
            }),
        );
        Ok(())
    }

    /// Create or atomically replace a table from flattened rows.
    ///
    /// In persistent mode the Parquet file is written first (temp file +
    /// rename); if that fails the previous table stays registered and
    /// untouched. The catalog swap happens under the write half of the swap
    /// lock: concurrent queries either planned before the swap (and drain
    /// against the old provider in full) or plan after it and see the new
    /// table — never a mix, never a missing table.
    pub async fn ingest(
        &self,
        table: &TableName,
        rows: &[FlatRecord],
        schema: &ColumnSchema,
    ) -> Result<TableInfo> {
        if schema.is_empty() {
            return Err(FlatLakeError::invalid_input(
                "cannot create a table with no columns",
            ));
        }

        let batch = arrow_json::rows_to_batch(schema, rows)?;
        let arrow_schema = batch.schema();

        if let Some(dir) = &self.data_dir {
            self.write_parquet(&dir.join(format!("{}.parquet", table)), &batch)?;
        }

        let provider = MemTable::try_new(arrow_schema, vec![vec![batch]])
            .map_err(|e| FlatLakeError::storage(e.to_string()))?;

        {
            let _guard = self.swap_lock.write().await;
            self.ctx
                .deregister_table(table.as_str())
                .map_err(|e| FlatLakeError::storage(e.to_string()))?;
            self.ctx
                .register_table(table.as_str(), Arc::new(provider))
                .map_err(|e| FlatLakeError::storage(e.to_string()))?;
            self.tables.insert(
                table.clone(),
                Arc::new(TableMeta {
                    schema: schema.clone(),
                    row_count: rows.len(),
                    created_at: Utc::now(),
                }),
            );
        }

        log::info!(
            "tenant {} ingested table '{}' ({} rows, {} columns)",
            self.tenant_id,
            table,
            rows.len(),
            schema.len()
        );
        Ok(TableInfo::new(table.clone(), schema.clone(), rows.len()))
    }

    fn write_parquet(&self, path: &Path, batch: &RecordBatch) -> Result<()> {
        let tmp_path = path.with_extension("parquet.tmp");
        let file = fs::File::create(&tmp_path)?;

        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(ZstdLevel::try_new(1).unwrap_or_default()))
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .map_err(|e| FlatLakeError::storage(e.to_string()))?;
        writer
            .write(batch)
            .map_err(|e| FlatLakeError::storage(e.to_string()))?;
        writer
            .close()
            .map_err(|e| FlatLakeError::storage(e.to_string()))?;

        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Execute a read statement against this tenant's tables only.
    ///
    /// Referenced tables are checked against this store's catalog up front,
    /// so a name that exists for some other tenant still reports
    /// `TableNotFound` here.
    pub async fn run(&self, sql: &str) -> Result<QueryResult> {
        let referenced = flatlake_sql::referenced_tables(sql)
            .map_err(|e| FlatLakeError::query_execution(e.to_string()))?;
        for table in &referenced {
            if !self.tables.contains_key(table) {
                return Err(FlatLakeError::table_not_found(table.as_str()));
            }
        }

        let df = {
            let _guard = self.swap_lock.read().await;
            self.ctx
                .sql(sql)
                .await
                .map_err(|e| FlatLakeError::query_execution(e.to_string()))?
        };
        let result_schema: datafusion::arrow::datatypes::Schema = df.schema().into();
        let batches = df
            .collect()
            .await
            .map_err(|e| FlatLakeError::query_execution(e.to_string()))?;

        arrow_json::batches_to_result(&result_schema, &batches)
    }

    /// Names of this tenant's tables, sorted for stable output.
    pub fn list_tables(&self) -> Vec<TableName> {
        let mut names: Vec<TableName> = self.tables.iter().map(|e| e.key().clone()).collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        names
    }

    /// Column schema of one table.
    pub fn schema(&self, table: &TableName) -> Result<ColumnSchema> {
        self.tables
            .get(table)
            .map(|meta| meta.schema.clone())
            .ok_or_else(|| FlatLakeError::table_not_found(table.as_str()))
    }

    /// Metadata summary of one table.
    pub fn table_info(&self, table: &TableName) -> Result<TableInfo> {
        self.tables
            .get(table)
            .map(|meta| TableInfo::new(table.clone(), meta.schema.clone(), meta.row_count))
            .ok_or_else(|| FlatLakeError::table_not_found(table.as_str()))
    }

    /// Full metadata, including creation time.
    pub fn table_meta(&self, table: &TableName) -> Result<Arc<TableMeta>> {
        self.tables
            .get(table)
            .map(|meta| Arc::clone(meta.value()))
            .ok_or_else(|| FlatLakeError::table_not_found(table.as_str()))
    }

    /// Human-readable context block for one table, suitable for prompting
    /// an external translator.
    pub fn describe_table(&self, table: &TableName) -> Result<String> {
        let meta = self.table_meta(table)?;
        let mut out = format!("Table '{}' has {} rows with columns:", table, meta.row_count);
        for def in meta.schema.iter() {
            out.push_str(&format!("\n  - {}: {}", def.name, def.data_type));
        }
        Ok(out)
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    /// Release this store's resources. Persistent data stays on disk;
    /// in-flight queries keep the session alive until they drain.
    pub(crate) fn close(&self) {
        log::debug!("closing store for tenant {}", self.tenant_id);
        self.tables.clear();
    }
}
