//! Shared error types for FlatLake.

use thiserror::Error;

/// Main error type for FlatLake operations.
///
/// Only `TenantUnavailable`, `TableNotFound`, `QueryExecution`, and the odd
/// `Storage`/`Io` failure ever reach callers. `InvalidSql` is an internal
/// signal: the translator chain consumes it to fall back to the rule-based
/// generator, and `InvalidInput` is recovered during ingestion except when
/// the input yields no relation at all.
#[derive(Error, Debug)]
pub enum FlatLakeError {
    /// Malformed ingestion payload that could not be recovered
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The tenant's store backend could not be created or opened
    #[error("Tenant store unavailable: {0}")]
    TenantUnavailable(String),

    /// Statement references a table absent from the tenant's store
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Candidate statement failed safety verification
    #[error("Invalid SQL: {0}")]
    InvalidSql(String),

    /// The engine rejected an otherwise verified statement
    #[error("Query execution failed: {0}")]
    QueryExecution(String),

    /// Storage backend failure (Parquet write, reattach, catalog)
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlatLakeError {
    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        FlatLakeError::InvalidInput(msg.into())
    }

    /// Create a tenant unavailable error
    pub fn tenant_unavailable<S: Into<String>>(msg: S) -> Self {
        FlatLakeError::TenantUnavailable(msg.into())
    }

    /// Create a table not found error
    pub fn table_not_found<S: Into<String>>(table: S) -> Self {
        FlatLakeError::TableNotFound(table.into())
    }

    /// Create an invalid SQL error
    pub fn invalid_sql<S: Into<String>>(msg: S) -> Self {
        FlatLakeError::InvalidSql(msg.into())
    }

    /// Create a query execution error
    pub fn query_execution<S: Into<String>>(msg: S) -> Self {
        FlatLakeError::QueryExecution(msg.into())
    }

    /// Create a storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        FlatLakeError::Storage(msg.into())
    }
}

/// Result type alias using FlatLakeError.
pub type Result<T> = std::result::Result<T, FlatLakeError>;
