//! Shared utilities for converting between Arrow and JSON formats.
//!
//! Two directions:
//! - flat JSON rows into an Arrow `RecordBatch` for ingestion (row-oriented
//!   to columnar);
//! - query-result `RecordBatch`es back into row-oriented JSON values.
//!
//! Only the scalar types the flattener can produce appear on the ingest
//! side; the result side additionally covers the types the engine produces
//! for aggregates.

use std::sync::Arc;

use datafusion::arrow::array::{
    Array, ArrayRef, BooleanArray, BooleanBuilder, Float32Array, Float64Array, Float64Builder,
    Int32Array, Int64Array, Int64Builder, LargeStringArray, StringArray, StringBuilder,
    UInt64Array,
};
use datafusion::arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use datafusion::arrow::record_batch::RecordBatch;
use serde_json::Value as JsonValue;

use flatlake_commons::{
    ColumnDef, ColumnSchema, ColumnType, FlatLakeError, FlatRecord, QueryResult, Result,
};

/// Map a column schema onto an Arrow schema. Every field is nullable:
/// missing keys surface as nulls by design.
pub fn schema_to_arrow(schema: &ColumnSchema) -> SchemaRef {
    let fields: Vec<Field> = schema
        .iter()
        .map(|def| {
            let data_type = match def.data_type {
                ColumnType::Boolean => DataType::Boolean,
                ColumnType::BigInt => DataType::Int64,
                ColumnType::Double => DataType::Float64,
                ColumnType::Text => DataType::Utf8,
            };
            Field::new(&def.name, data_type, true)
        })
        .collect();
    Arc::new(Schema::new(fields))
}

/// Recover a column schema from an Arrow schema (Parquet reattach path).
/// Types outside the flattener's range degrade to `Text`.
pub fn arrow_to_schema(schema: &Schema) -> ColumnSchema {
    let defs = schema
        .fields()
        .iter()
        .map(|field| {
            let data_type = match field.data_type() {
                DataType::Boolean => ColumnType::Boolean,
                DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64 => ColumnType::BigInt,
                DataType::Float16 | DataType::Float32 | DataType::Float64 => ColumnType::Double,
                _ => ColumnType::Text,
            };
            ColumnDef::new(field.name().clone(), data_type)
        })
        .collect();
    ColumnSchema::new(defs)
}

/// Convert flat JSON rows to an Arrow RecordBatch (row-oriented to
/// columnar). Rows may omit columns; omissions and explicit nulls both
/// become Arrow nulls. Values in a `Text` column that are not strings (the
/// type-conflict fallback) are rendered as text.
pub fn rows_to_batch(schema: &ColumnSchema, rows: &[FlatRecord]) -> Result<RecordBatch> {
    let arrow_schema = schema_to_arrow(schema);
    if rows.is_empty() {
        return Ok(RecordBatch::new_empty(arrow_schema));
    }

    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.len());
    for def in schema.iter() {
        let array: ArrayRef = match def.data_type {
            ColumnType::Boolean => {
                let mut builder = BooleanBuilder::with_capacity(rows.len());
                for row in rows {
                    match row.get(&def.name) {
                        Some(JsonValue::Bool(v)) => builder.append_value(*v),
                        Some(JsonValue::Null) | None => builder.append_null(),
                        Some(other) => {
                            return Err(type_mismatch(&def.name, "BOOLEAN", other));
                        }
                    }
                }
                Arc::new(builder.finish())
            }
            ColumnType::BigInt => {
                let mut builder = Int64Builder::with_capacity(rows.len());
                for row in rows {
                    match row.get(&def.name) {
                        Some(JsonValue::Number(n)) => match n.as_i64() {
                            Some(v) => builder.append_value(v),
                            None => return Err(type_mismatch(&def.name, "BIGINT", &JsonValue::Number(n.clone()))),
                        },
                        Some(JsonValue::Null) | None => builder.append_null(),
                        Some(other) => {
                            return Err(type_mismatch(&def.name, "BIGINT", other));
                        }
                    }
                }
                Arc::new(builder.finish())
            }
            ColumnType::Double => {
                let mut builder = Float64Builder::with_capacity(rows.len());
                for row in rows {
                    match row.get(&def.name) {
                        Some(JsonValue::Number(n)) => match n.as_f64() {
                            Some(v) => builder.append_value(v),
                            None => return Err(type_mismatch(&def.name, "DOUBLE", &JsonValue::Number(n.clone()))),
                        },
                        Some(JsonValue::Null) | None => builder.append_null(),
                        Some(other) => {
                            return Err(type_mismatch(&def.name, "DOUBLE", other));
                        }
                    }
                }
                Arc::new(builder.finish())
            }
            ColumnType::Text => {
                let mut builder = StringBuilder::new();
                for row in rows {
                    match row.get(&def.name) {
                        Some(JsonValue::String(s)) => builder.append_value(s),
                        Some(JsonValue::Null) | None => builder.append_null(),
                        // Conflicting scalar observations coerce to text.
                        Some(other) => builder.append_value(other.to_string()),
                    }
                }
                Arc::new(builder.finish())
            }
        };
        arrays.push(array);
    }

    RecordBatch::try_new(arrow_schema, arrays)
        .map_err(|e| FlatLakeError::storage(format!("failed to build record batch: {}", e)))
}

/// Convert collected result batches into a positional `QueryResult`.
/// `schema` supplies the column list even when the result is empty.
pub fn batches_to_result(schema: &Schema, batches: &[RecordBatch]) -> Result<QueryResult> {
    let columns: Vec<String> = schema.fields().iter().map(|f| f.name().clone()).collect();

    let mut rows = Vec::new();
    for batch in batches {
        for row_idx in 0..batch.num_rows() {
            let mut row = Vec::with_capacity(batch.num_columns());
            for col_idx in 0..batch.num_columns() {
                row.push(cell_to_json(
                    batch.column(col_idx),
                    batch.schema().field(col_idx).name(),
                    row_idx,
                )?);
            }
            rows.push(row);
        }
    }

    Ok(QueryResult::new(columns, rows))
}

fn cell_to_json(column: &ArrayRef, name: &str, row_idx: usize) -> Result<JsonValue> {
    if column.is_null(row_idx) {
        return Ok(JsonValue::Null);
    }

    let value = match column.data_type() {
        DataType::Utf8 => {
            let array = downcast::<StringArray>(column, name)?;
            JsonValue::String(array.value(row_idx).to_string())
        }
        DataType::LargeUtf8 => {
            let array = downcast::<LargeStringArray>(column, name)?;
            JsonValue::String(array.value(row_idx).to_string())
        }
        DataType::Boolean => {
            let array = downcast::<BooleanArray>(column, name)?;
            JsonValue::Bool(array.value(row_idx))
        }
        DataType::Int32 => {
            let array = downcast::<Int32Array>(column, name)?;
            JsonValue::Number(array.value(row_idx).into())
        }
        DataType::Int64 => {
            let array = downcast::<Int64Array>(column, name)?;
            JsonValue::Number(array.value(row_idx).into())
        }
        DataType::UInt64 => {
            let array = downcast::<UInt64Array>(column, name)?;
            JsonValue::Number(array.value(row_idx).into())
        }
        DataType::Float32 => {
            let array = downcast::<Float32Array>(column, name)?;
            float_to_json(array.value(row_idx) as f64, name)?
        }
        DataType::Float64 => {
            let array = downcast::<Float64Array>(column, name)?;
            float_to_json(array.value(row_idx), name)?
        }
        DataType::Null => JsonValue::Null,
        other => {
            return Err(FlatLakeError::query_execution(format!(
                "unsupported result type {:?} in column '{}'",
                other, name
            )))
        }
    };
    Ok(value)
}

fn float_to_json(value: f64, name: &str) -> Result<JsonValue> {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .ok_or_else(|| {
            FlatLakeError::query_execution(format!(
                "non-finite float in column '{}' cannot be represented",
                name
            ))
        })
}

fn downcast<'a, T: 'static>(column: &'a ArrayRef, name: &str) -> Result<&'a T> {
    column.as_any().downcast_ref::<T>().ok_or_else(|| {
        FlatLakeError::query_execution(format!(
            "failed to downcast column '{}' to its declared type",
            name
        ))
    })
}

fn type_mismatch(column: &str, expected: &str, value: &JsonValue) -> FlatLakeError {
    FlatLakeError::storage(format!(
        "value {} does not fit {} column '{}'",
        value, expected, column
    ))
}
