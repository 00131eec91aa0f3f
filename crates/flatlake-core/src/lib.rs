//! # flatlake-core
//!
//! Tenant store lifecycle and query execution for FlatLake.
//!
//! Each tenant owns exactly one [`TenantStore`] — an embedded DataFusion
//! session holding that tenant's flat tables and nothing else. The
//! [`StoreManager`] is the only way to reach a store and is keyed strictly by
//! [`TenantId`], which makes cross-tenant access structurally impossible
//! rather than merely discouraged.
//!
//! [`QueryExecutor`] ties the pieces together: it flattens raw JSON into a
//! tenant's table on ingest, and on query translates natural-language text
//! against the table's schema and executes the resulting statement.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use flatlake_commons::{TableName, TenantId};
//! use flatlake_core::{QueryExecutor, StoreManager};
//!
//! # async fn example() -> flatlake_commons::Result<()> {
//! let manager = Arc::new(StoreManager::in_memory());
//! let executor = QueryExecutor::new(manager);
//!
//! let tenant = TenantId::new("org_4412");
//! let table = TableName::new("tickets");
//! executor.load(&tenant, &table, json!([{"id": 1, "status": "open"}])).await?;
//!
//! let result = executor.answer(&tenant, &table, "How many tickets?").await?;
//! assert_eq!(result.row_count, 1);
//! # Ok(())
//! # }
//! ```

pub mod arrow_json;
pub mod config;
pub mod executor;
pub mod store_manager;
pub mod tenant_store;

pub use config::{StorageMode, StoreConfig};
pub use executor::QueryExecutor;
pub use store_manager::StoreManager;
pub use tenant_store::{TableMeta, TenantStore};

// Re-export the commonly paired pieces so embedders need one crate.
pub use flatlake_commons::{
    ColumnDef, ColumnSchema, ColumnType, FlatLakeError, FlatRecord, QueryResult, Result, TableInfo,
    TableName, TenantId,
};
pub use flatlake_flatten::{extract_records, flatten};
pub use flatlake_sql::{RuleTranslator, SqlGenerator, SqlStatement, TranslatorChain};
