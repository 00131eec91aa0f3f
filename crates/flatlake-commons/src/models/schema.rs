//! Column schema model for flat tables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A flattened record: column name to scalar-or-null JSON value.
///
/// Invariant: no value is itself an object or array. The flattener is the
/// only producer and upholds this; consumers may rely on it.
pub type FlatRecord = serde_json::Map<String, serde_json::Value>;

/// Scalar column types inferable from JSON values.
///
/// Opaque columns (serialized nested structures) and conflicting observations
/// fall back to `Text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Boolean,
    BigInt,
    Double,
    Text,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Text => "TEXT",
        };
        write!(f, "{}", s)
    }
}

/// A single column: name plus inferred type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered column schema of one flat table.
///
/// Order is first-seen order across the ingested batch and is preserved all
/// the way into query results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    columns: Vec<ColumnDef>,
}

impl ColumnSchema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter()
    }

    /// Column names in schema order.
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Look up a column by case-insensitive exact name match, returning the
    /// canonical definition.
    pub fn resolve(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// First column whose name looks like a timestamp, used as the default
    /// recency sort key. Name-based because flattened JSON carries no
    /// declared types.
    pub fn first_timestamp_like(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| {
            let n = c.name.to_ascii_lowercase();
            n == "timestamp"
                || n.ends_with("_at")
                || n.ends_with("_ts")
                || n.contains("time")
                || n.contains("date")
        })
    }

    /// First column in schema order.
    pub fn first_column(&self) -> Option<&ColumnDef> {
        self.columns.first()
    }
}

impl From<Vec<ColumnDef>> for ColumnSchema {
    fn from(columns: Vec<ColumnDef>) -> Self {
        Self::new(columns)
    }
}
