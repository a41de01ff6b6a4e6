use serde_json::{Map, Value};
use uuid::Uuid;

use crate::database::models::schema::{FieldType, Schema};

/// A stored record: field -> JSON value, always carrying the table's primary key
pub type Record = Map<String, Value>;

/// Default primary-key field for tables that never designated one
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Errors that can occur while turning request payloads into records
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
}

/// Accept a JSON object as a record, rejecting arrays and scalars
pub fn from_json(json: Value) -> Result<Record, RecordError> {
    match json {
        Value::Object(map) => Ok(map),
        _ => Err(RecordError::InvalidJson("Expected JSON object".to_string())),
    }
}

/// Render a scalar the way it would appear in a URL segment or query string.
/// Objects and arrays have no such form.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some("null".to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Does this record's primary key equal the id taken from the path?
pub fn key_matches(record: &Record, primary_key: &str, id: &str) -> bool {
    record
        .get(primary_key)
        .filter(|v| !v.is_null())
        .and_then(scalar_to_string)
        .map(|k| k == id)
        .unwrap_or(false)
}

/// Is `value` already used as a primary key in `records`? Keys compare by their
/// path form, so `1` and `"1"` collide.
pub fn key_taken(records: &[Record], primary_key: &str, value: &Value) -> bool {
    match scalar_to_string(value) {
        Some(id) => records.iter().any(|r| key_matches(r, primary_key, &id)),
        None => false,
    }
}

/// Produce a fresh primary key. Tables whose schema types the key as Number get
/// `max + 1`, everything else gets a UUID v4 string. `None` once the numeric
/// range is used up.
pub fn generate_key(records: &[Record], primary_key: &str, schema: Option<&Schema>) -> Option<Value> {
    let numeric = schema
        .and_then(|s| s.get(primary_key))
        .map(|t| *t == FieldType::Number)
        .unwrap_or(false);

    if numeric {
        let max = records
            .iter()
            .filter_map(|r| r.get(primary_key).and_then(Value::as_i64))
            .max()
            .unwrap_or(0);
        max.checked_add(1).map(Value::from)
    } else {
        Some(Value::String(Uuid::new_v4().to_string()))
    }
}

/// Shallow merge: supplied fields overwrite, everything else is kept
pub fn merge(target: &mut Record, changes: Record) {
    for (key, value) in changes {
        target.insert(key, value);
    }
}
