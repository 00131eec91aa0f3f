//! Batch-wide JSON flattening.
//!
//! A key's treatment is decided once per batch from its shape across every
//! record where it occurs, so the resulting table has a consistent column
//! layout regardless of which record is inspected first:
//!
//! - scalar/null everywhere: kept as-is;
//! - mapping with only scalar/null children everywhere: flattened one level
//!   into `key_child` columns (child-key set is the union across records);
//! - mapping that is empty in every occurrence: a single `key_name`
//!   placeholder column, always null;
//! - everything else (arrays, deeper nesting, shape conflicts): kept opaque
//!   as canonical JSON text under the original key.

use serde_json::{Map, Value as JsonValue};

use flatlake_commons::{ColumnDef, ColumnSchema, ColumnType, FlatRecord};

/// Sub-field name emitted for keys that only ever appear as an empty
/// mapping. The upstream source wraps named entities as `{"name": ...}`, so
/// an empty occurrence is assumed to be one of those with the name missing.
/// This is a policy constant, not an inference.
const EMPTY_OBJECT_PLACEHOLDER_FIELD: &str = "name";

/// Key used when a record is not a mapping at all.
const SYNTHETIC_VALUE_KEY: &str = "value";

/// Flatten a batch of raw records into flat rows plus the ordered column
/// schema.
///
/// Pure and deterministic; flattening an already-flat batch of scalar-only
/// records returns it unchanged. Every returned row carries every schema
/// column, with explicit nulls where a record had nothing to contribute.
pub fn flatten(records: &[JsonValue]) -> (Vec<FlatRecord>, ColumnSchema) {
    let shapes = classify_batch(records);
    let columns = plan_columns(&shapes);

    let rows: Vec<FlatRecord> = records
        .iter()
        .map(|record| materialize_row(record, &columns))
        .collect();

    let schema = infer_schema(&columns, &rows);
    (rows, schema)
}

/// Shape of one key across the whole batch.
///
/// `NullOnly` means the key was only ever observed as JSON null; null
/// occurrences never constrain a key's shape, so it merges neutrally.
#[derive(Debug, Clone, PartialEq)]
enum KeyShape {
    NullOnly,
    Scalar,
    /// Union of child keys, first-seen order.
    FlatObject(Vec<String>),
    EmptyObject,
    Opaque,
}

impl KeyShape {
    fn of(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => KeyShape::NullOnly,
            JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) => KeyShape::Scalar,
            JsonValue::Object(map) if map.is_empty() => KeyShape::EmptyObject,
            JsonValue::Object(map) => {
                if map.values().all(is_scalar_or_null) {
                    KeyShape::FlatObject(map.keys().cloned().collect())
                } else {
                    KeyShape::Opaque
                }
            }
            JsonValue::Array(_) => KeyShape::Opaque,
        }
    }

    fn merge(self, other: KeyShape) -> Self {
        use KeyShape::*;
        match (self, other) {
            (NullOnly, shape) | (shape, NullOnly) => shape,
            (Scalar, Scalar) => Scalar,
            (EmptyObject, EmptyObject) => EmptyObject,
            (FlatObject(a), FlatObject(b)) => FlatObject(union_ordered(a, b)),
            (FlatObject(children), EmptyObject) | (EmptyObject, FlatObject(children)) => {
                FlatObject(children)
            }
            // Scalar-vs-mapping conflicts, arrays, deeper nesting.
            _ => Opaque,
        }
    }
}

fn is_scalar_or_null(value: &JsonValue) -> bool {
    matches!(
        value,
        JsonValue::Null | JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_)
    )
}

fn union_ordered(mut a: Vec<String>, b: Vec<String>) -> Vec<String> {
    for key in b {
        if !a.contains(&key) {
            a.push(key);
        }
    }
    a
}

/// Pass 1: classify every top-level key across the batch, first-seen order.
fn classify_batch(records: &[JsonValue]) -> Vec<(String, KeyShape)> {
    let mut shapes: Vec<(String, KeyShape)> = Vec::new();
    for record in records {
        for (key, value) in record_entries(record) {
            let observed = KeyShape::of(value);
            match shapes.iter_mut().find(|(name, _)| name.as_str() == key) {
                Some((_, shape)) => {
                    let merged = std::mem::replace(shape, KeyShape::Opaque).merge(observed);
                    *shape = merged;
                }
                None => shapes.push((key.to_string(), observed)),
            }
        }
    }
    shapes
}

/// View a record as key/value entries. Non-mapping records (already degraded
/// by extraction, or handed in directly) count as `{"value": record}`.
fn record_entries(record: &JsonValue) -> Vec<(&str, &JsonValue)> {
    match record {
        JsonValue::Object(map) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
        other => vec![(SYNTHETIC_VALUE_KEY, other)],
    }
}

/// Where one output column takes its value from.
#[derive(Debug, Clone)]
enum ColumnSource {
    /// Scalar key kept unchanged.
    Direct(String),
    /// `parent` mapping flattened one level into `parent_child`.
    Child { parent: String, child: String },
    /// Key that only ever occurs as an empty mapping; always null.
    Placeholder(String),
    /// Canonical JSON text of the raw value under the original key.
    Opaque(String),
}

/// Pass 2: derive the output column list, first-seen order. On a name
/// collision (a scalar `vendor_name` next to `vendor: {name: ..}`) the first
/// writer wins and the column is emitted once.
fn plan_columns(shapes: &[(String, KeyShape)]) -> Vec<(String, ColumnSource)> {
    fn push(columns: &mut Vec<(String, ColumnSource)>, name: String, source: ColumnSource) {
        if columns.iter().any(|(existing, _)| *existing == name) {
            log::warn!("flatten: duplicate column '{}' dropped (first writer wins)", name);
            return;
        }
        columns.push((name, source));
    }

    let mut columns: Vec<(String, ColumnSource)> = Vec::new();
    for (key, shape) in shapes {
        match shape {
            KeyShape::NullOnly | KeyShape::Scalar => {
                push(&mut columns, key.clone(), ColumnSource::Direct(key.clone()));
            }
            KeyShape::FlatObject(children) => {
                for child in children {
                    push(
                        &mut columns,
                        format!("{}_{}", key, child),
                        ColumnSource::Child {
                            parent: key.clone(),
                            child: child.clone(),
                        },
                    );
                }
            }
            KeyShape::EmptyObject => {
                push(
                    &mut columns,
                    format!("{}_{}", key, EMPTY_OBJECT_PLACEHOLDER_FIELD),
                    ColumnSource::Placeholder(key.clone()),
                );
            }
            KeyShape::Opaque => {
                push(&mut columns, key.clone(), ColumnSource::Opaque(key.clone()));
            }
        }
    }
    columns
}

/// Pass 3: project one record onto the planned columns.
fn materialize_row(record: &JsonValue, columns: &[(String, ColumnSource)]) -> FlatRecord {
    fn lookup<'a>(entries: &[(&'a str, &'a JsonValue)], key: &str) -> Option<&'a JsonValue> {
        entries.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    let entries = record_entries(record);
    let mut row = Map::with_capacity(columns.len());
    for (name, source) in columns {
        let value = match source {
            ColumnSource::Direct(key) => lookup(&entries, key).cloned().unwrap_or(JsonValue::Null),
            ColumnSource::Child { parent, child } => match lookup(&entries, parent) {
                Some(JsonValue::Object(map)) => map.get(child).cloned().unwrap_or(JsonValue::Null),
                _ => JsonValue::Null,
            },
            ColumnSource::Placeholder(_) => JsonValue::Null,
            ColumnSource::Opaque(key) => match lookup(&entries, key) {
                None | Some(JsonValue::Null) => JsonValue::Null,
                Some(value) => JsonValue::String(canonical_json(value)),
            },
        };
        row.insert(name.clone(), value);
    }
    row
}

/// Canonical serialization used for opaque values: compact encoding,
/// original key order (the parser preserves it).
fn canonical_json(value: &JsonValue) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

/// Scalar type observations per column, widened to the most specific common
/// type; `Text` on conflict.
#[derive(Debug, Clone, Copy, PartialEq)]
enum TypeObservation {
    Nothing,
    Bool,
    Int,
    Float,
    Text,
}

impl TypeObservation {
    fn of(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => TypeObservation::Nothing,
            JsonValue::Bool(_) => TypeObservation::Bool,
            JsonValue::Number(n) => {
                if n.is_i64() {
                    TypeObservation::Int
                } else {
                    // Floats and out-of-range u64 both land on DOUBLE.
                    TypeObservation::Float
                }
            }
            JsonValue::String(_) => TypeObservation::Text,
            // Flat rows never contain these.
            JsonValue::Object(_) | JsonValue::Array(_) => TypeObservation::Text,
        }
    }

    fn merge(self, other: Self) -> Self {
        use TypeObservation::*;
        match (self, other) {
            (Nothing, x) | (x, Nothing) => x,
            (a, b) if a == b => a,
            (Int, Float) | (Float, Int) => Float,
            _ => Text,
        }
    }

    fn into_column_type(self) -> ColumnType {
        match self {
            TypeObservation::Bool => ColumnType::Boolean,
            TypeObservation::Int => ColumnType::BigInt,
            TypeObservation::Float => ColumnType::Double,
            TypeObservation::Nothing | TypeObservation::Text => ColumnType::Text,
        }
    }
}

fn infer_schema(columns: &[(String, ColumnSource)], rows: &[FlatRecord]) -> ColumnSchema {
    let defs = columns
        .iter()
        .map(|(name, source)| {
            let data_type = match source {
                // Serialized JSON text or an always-null placeholder.
                ColumnSource::Opaque(_) | ColumnSource::Placeholder(_) => ColumnType::Text,
                _ => rows
                    .iter()
                    .filter_map(|row| row.get(name))
                    .fold(TypeObservation::Nothing, |acc, v| {
                        acc.merge(TypeObservation::of(v))
                    })
                    .into_column_type(),
            };
            ColumnDef::new(name.clone(), data_type)
        })
        .collect();
    ColumnSchema::new(defs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_records_pass_through_unchanged() {
        let records = vec![
            json!({"id": 1, "name": "alpha", "open": true}),
            json!({"id": 2, "name": "beta", "open": false}),
        ];
        let (rows, schema) = flatten(&records);

        assert_eq!(schema.names(), vec!["id", "name", "open"]);
        assert_eq!(JsonValue::Object(rows[0].clone()), records[0]);
        assert_eq!(JsonValue::Object(rows[1].clone()), records[1]);

        // Idempotence: flattening the output again is a no-op.
        let flat: Vec<JsonValue> = rows.iter().cloned().map(JsonValue::Object).collect();
        let (again, schema2) = flatten(&flat);
        assert_eq!(again, rows);
        assert_eq!(schema2, schema);
    }

    #[test]
    fn test_nested_object_flattens_one_level() {
        let records = vec![
            json!({"id": 26, "vendor": {"name": "Unknown"}}),
            json!({"id": 27, "vendor": {"name": "Herman Miller"}}),
        ];
        let (rows, schema) = flatten(&records);

        assert_eq!(schema.names(), vec!["id", "vendor_name"]);
        assert_eq!(rows[0]["id"], json!(26));
        assert_eq!(rows[0]["vendor_name"], json!("Unknown"));
        assert_eq!(rows[1]["vendor_name"], json!("Herman Miller"));
    }

    #[test]
    fn test_child_key_union_across_records() {
        let records = vec![
            json!({"vendor": {"name": "Acme"}}),
            json!({"vendor": {"name": "Globex", "tier": 2}}),
        ];
        let (rows, schema) = flatten(&records);

        assert_eq!(schema.names(), vec!["vendor_name", "vendor_tier"]);
        assert_eq!(rows[0]["vendor_tier"], JsonValue::Null);
        assert_eq!(rows[1]["vendor_tier"], json!(2));
    }

    #[test]
    fn test_empty_object_learns_schema_from_other_records() {
        let records = vec![
            json!({"vendor": {}}),
            json!({"vendor": {"name": "Acme"}}),
        ];
        let (rows, schema) = flatten(&records);

        assert_eq!(schema.names(), vec!["vendor_name"]);
        assert_eq!(rows[0]["vendor_name"], JsonValue::Null);
        assert_eq!(rows[1]["vendor_name"], json!("Acme"));
    }

    #[test]
    fn test_always_empty_object_emits_placeholder() {
        let records = vec![json!({"id": 1, "vendor": {}}), json!({"id": 2, "vendor": {}})];
        let (rows, schema) = flatten(&records);

        assert_eq!(schema.names(), vec!["id", "vendor_name"]);
        assert!(rows.iter().all(|r| r["vendor_name"] == JsonValue::Null));
    }

    #[test]
    fn test_deep_nesting_is_opaque_and_lossless() {
        let original = json!({"created_by": "admin", "tags": ["a", "b"]});
        let records = vec![json!({"id": 1, "metadata": original.clone()})];
        let (rows, schema) = flatten(&records);

        assert_eq!(schema.names(), vec!["id", "metadata"]);
        let serialized = rows[0]["metadata"].as_str().unwrap();
        let parsed: JsonValue = serde_json::from_str(serialized).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_array_value_is_opaque() {
        let records = vec![json!({"id": 1, "tags": ["a", "b"]})];
        let (rows, schema) = flatten(&records);

        assert_eq!(schema.names(), vec!["id", "tags"]);
        assert_eq!(rows[0]["tags"], json!("[\"a\",\"b\"]"));
    }

    #[test]
    fn test_shape_conflict_degrades_key_to_opaque() {
        let records = vec![
            json!({"status": "open"}),
            json!({"status": {"name": "closed"}}),
        ];
        let (rows, schema) = flatten(&records);

        assert_eq!(schema.names(), vec!["status"]);
        assert_eq!(rows[0]["status"], json!("\"open\""));
        assert_eq!(rows[1]["status"], json!("{\"name\":\"closed\"}"));
    }

    #[test]
    fn test_null_occurrence_does_not_constrain_shape() {
        let records = vec![
            json!({"vendor": null}),
            json!({"vendor": {"name": "Acme"}}),
        ];
        let (rows, schema) = flatten(&records);

        assert_eq!(schema.names(), vec!["vendor_name"]);
        assert_eq!(rows[0]["vendor_name"], JsonValue::Null);
        assert_eq!(rows[1]["vendor_name"], json!("Acme"));
    }

    #[test]
    fn test_column_union_covers_sparse_keys() {
        let records = vec![json!({"a": 1}), json!({"b": 2})];
        let (rows, schema) = flatten(&records);

        assert_eq!(schema.names(), vec!["a", "b"]);
        assert_eq!(rows[0]["b"], JsonValue::Null);
        assert_eq!(rows[1]["a"], JsonValue::Null);
    }

    #[test]
    fn test_type_inference() {
        let records = vec![
            json!({"i": 1, "f": 1.5, "b": true, "s": "x", "mixed": 1}),
            json!({"i": 2, "f": 2, "b": false, "s": "y", "mixed": "two"}),
        ];
        let (_, schema) = flatten(&records);

        assert_eq!(schema.resolve("i").unwrap().data_type, ColumnType::BigInt);
        assert_eq!(schema.resolve("f").unwrap().data_type, ColumnType::Double);
        assert_eq!(schema.resolve("b").unwrap().data_type, ColumnType::Boolean);
        assert_eq!(schema.resolve("s").unwrap().data_type, ColumnType::Text);
        assert_eq!(schema.resolve("mixed").unwrap().data_type, ColumnType::Text);
    }

    #[test]
    fn test_all_null_column_falls_back_to_text() {
        let records = vec![json!({"x": null}), json!({"x": null})];
        let (_, schema) = flatten(&records);
        assert_eq!(schema.resolve("x").unwrap().data_type, ColumnType::Text);
    }

    #[test]
    fn test_non_mapping_record_synthesizes_value_key() {
        let records = vec![json!(7)];
        let (rows, schema) = flatten(&records);

        assert_eq!(schema.names(), vec!["value"]);
        assert_eq!(rows[0]["value"], json!(7));
    }

    #[test]
    fn test_empty_batch() {
        let (rows, schema) = flatten(&[]);
        assert!(rows.is_empty());
        assert!(schema.is_empty());
    }

    #[test]
    fn test_determinism() {
        let records = vec![
            json!({"id": 1, "vendor": {"name": "Acme"}, "tags": [1]}),
            json!({"id": 2, "vendor": {}, "extra": true}),
        ];
        let first = flatten(&records);
        let second = flatten(&records);
        assert_eq!(first, second);
    }
}
