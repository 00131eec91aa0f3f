//! # flatlake-flatten
//!
//! Converts batches of arbitrarily nested JSON records into flat tabular
//! records plus a column schema, ready for ingestion into a tenant store.
//!
//! The flattening algorithm is pure and deterministic: a key's treatment is
//! decided from its shape across the *whole* batch (not per record), so every
//! record in a table lands on the same columns. Nested structures that cannot
//! be flattened one level are preserved losslessly as canonical JSON text.
//!
//! ```rust
//! use serde_json::json;
//! use flatlake_flatten::flatten;
//!
//! let records = vec![
//!     json!({"id": 26, "vendor": {"name": "Unknown"}}),
//!     json!({"id": 27, "vendor": {"name": "Herman Miller"}}),
//! ];
//! let (rows, schema) = flatten(&records);
//! assert_eq!(schema.names(), vec!["id", "vendor_name"]);
//! assert_eq!(rows[1]["vendor_name"], json!("Herman Miller"));
//! ```

mod extract;
mod flatten;

pub use extract::extract_records;
pub use flatten::flatten;
