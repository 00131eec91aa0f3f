//! End-to-end query execution.
//!
//! `QueryExecutor` composes the store manager with the translator chain:
//! raw JSON goes in through `load`, natural-language questions come back as
//! structured results through `answer`. Execution is all-or-nothing per
//! request; partial results are never returned.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use flatlake_commons::{FlatLakeError, QueryResult, Result, TableInfo, TableName, TenantId};
use flatlake_flatten::{extract_records, flatten};
use flatlake_sql::{SqlGenerator, TranslatorChain};

use crate::store_manager::StoreManager;

pub struct QueryExecutor {
    stores: Arc<StoreManager>,
    translator: TranslatorChain,
}

impl QueryExecutor {
    /// Executor with rule-based translation only.
    pub fn new(stores: Arc<StoreManager>) -> Self {
        Self {
            stores,
            translator: TranslatorChain::new(),
        }
    }

    /// Executor that consults `generator` first; its output is verified and
    /// the rule chain remains the guaranteed fallback.
    pub fn with_external_translator(
        stores: Arc<StoreManager>,
        generator: Arc<dyn SqlGenerator>,
    ) -> Self {
        Self {
            stores,
            translator: TranslatorChain::with_external(generator),
        }
    }

    /// Flatten a raw ingestion payload and create (or replace) the named
    /// table in the tenant's store.
    ///
    /// Malformed payloads are recovered through the single-record fallback;
    /// the only unrecoverable input is one that yields no columns at all.
    pub async fn load(
        &self,
        tenant_id: &TenantId,
        table_name: &TableName,
        payload: JsonValue,
    ) -> Result<TableInfo> {
        let records = extract_records(payload);
        let (rows, schema) = flatten(&records);
        if schema.is_empty() {
            return Err(FlatLakeError::invalid_input(
                "ingestion payload produced no rows or columns",
            ));
        }
        self.stores
            .ingest(tenant_id, table_name, &rows, &schema)
            .await
    }

    /// Answer a natural-language question against one table.
    ///
    /// Sequence: resolve the tenant store, fetch the table schema, translate
    /// (total — translation never fails), execute. Errors surface as
    /// `TenantUnavailable`, `TableNotFound`, or `QueryExecutionError`.
    pub async fn answer(
        &self,
        tenant_id: &TenantId,
        table_name: &TableName,
        text: &str,
    ) -> Result<QueryResult> {
        let store = self.stores.get_or_create(tenant_id)?;
        let schema = store.schema(table_name)?;
        let statement = self.translator.translate(table_name, &schema, text);
        log::debug!(
            "tenant {} question on '{}' translated to: {}",
            tenant_id,
            table_name,
            statement
        );
        store.run(statement.as_str()).await
    }

    pub fn store_manager(&self) -> &Arc<StoreManager> {
        &self.stores
    }
}
