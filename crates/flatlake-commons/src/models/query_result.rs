//! Result types returned to callers.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::schema::ColumnSchema;
use super::table_name::TableName;

/// Structured result of a read statement.
///
/// Rows are aligned positionally to `columns`; execution is all-or-nothing,
/// so a result never carries a partial row set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
    pub row_count: usize,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }

    /// Empty result with a known column list.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            row_count: 0,
        }
    }
}

/// Summary of one ingested table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub table: TableName,
    pub schema: ColumnSchema,
    pub row_count: usize,
}

impl TableInfo {
    pub fn new(table: TableName, schema: ColumnSchema, row_count: usize) -> Self {
        Self {
            table,
            schema,
            row_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_count_tracks_rows() {
        let result = QueryResult::new(
            vec!["id".to_string()],
            vec![vec![json!(1)], vec![json!(2)]],
        );
        assert_eq!(result.row_count, 2);

        let empty = QueryResult::empty(vec!["id".to_string()]);
        assert_eq!(empty.row_count, 0);
        assert!(empty.rows.is_empty());
    }
}
