//! Locating the record list inside an ingestion payload.

use serde_json::{Map, Value as JsonValue};

/// Envelope field conventionally holding the record list.
const ENVELOPE_LIST_FIELD: &str = "data";

/// Locate the list of records inside a raw ingestion payload.
///
/// Accepted shapes, in order:
/// - a JSON array of objects: the records themselves;
/// - an object whose `data` field is an array of objects (the response
///   envelope shape of the upstream source): that array;
/// - any other object: a single record;
/// - anything else (scalar, null, or a list containing non-objects): the
///   whole payload becomes one synthetic record `{"value": <payload>}` and
///   the flattener's opaque rule keeps it lossless.
///
/// This is a total function: malformed input degrades to the synthetic
/// single-record form instead of erroring.
pub fn extract_records(payload: JsonValue) -> Vec<JsonValue> {
    match payload {
        JsonValue::Array(items) => records_from_list(items),
        JsonValue::Object(map) => {
            if let Some(JsonValue::Array(items)) = map.get(ENVELOPE_LIST_FIELD) {
                if items.iter().all(JsonValue::is_object) {
                    return items.clone();
                }
                log::debug!(
                    "envelope '{}' field is not a list of objects; treating envelope as one record",
                    ENVELOPE_LIST_FIELD
                );
            }
            vec![JsonValue::Object(map)]
        }
        other => vec![synthetic_record(other)],
    }
}

fn records_from_list(items: Vec<JsonValue>) -> Vec<JsonValue> {
    if items.iter().all(JsonValue::is_object) {
        items
    } else {
        log::debug!("record list contains non-object entries; treating input as one record");
        vec![synthetic_record(JsonValue::Array(items))]
    }
}

fn synthetic_record(value: JsonValue) -> JsonValue {
    let mut map = Map::new();
    map.insert("value".to_string(), value);
    JsonValue::Object(map)
}
