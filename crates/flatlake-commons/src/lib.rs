//! # flatlake-commons
//!
//! Shared types and errors for FlatLake.
//!
//! This crate provides the foundational types used across all FlatLake crates
//! (flatlake-flatten, flatlake-sql, flatlake-core). It carries no engine
//! dependencies so the flattener and translator stay lightweight.
//!
//! ## Type-Safe Wrappers
//!
//! - `TenantId`: opaque tenant identifier (validated for filesystem safety)
//! - `TableName`: table name, normalized to a lowercase SQL identifier
//!
//! ## Example Usage
//!
//! ```rust
//! use flatlake_commons::{TenantId, TableName};
//!
//! let tenant = TenantId::new("org_4412");
//! let table = TableName::new("Tickets");
//! assert_eq!(table.as_str(), "tickets");
//! ```

pub mod errors;
pub mod models;

pub use errors::{FlatLakeError, Result};
pub use models::{
    ColumnDef, ColumnSchema, ColumnType, FlatRecord, QueryResult, TableInfo, TableName, TenantId,
};
