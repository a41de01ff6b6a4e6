use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::database::record::Record;

/// Column types a table schema may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(alias = "string")]
    String,
    #[serde(alias = "number")]
    Number,
    #[serde(alias = "boolean", alias = "bool")]
    Boolean,
    #[serde(alias = "date")]
    Date,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "String",
            FieldType::Number => "Number",
            FieldType::Boolean => "Boolean",
            FieldType::Date => "Date",
        };
        write!(f, "{}", name)
    }
}

/// field name -> declared type. Ordered so the first violation is deterministic.
pub type Schema = BTreeMap<String, FieldType>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Field '{field}' must be of type {expected}")]
    TypeMismatch { field: String, expected: FieldType },
}

impl SchemaError {
    pub fn field(&self) -> &str {
        match self {
            SchemaError::TypeMismatch { field, .. } => field,
        }
    }
}

/// Check every schema-declared field that is present and non-null in the payload.
/// Absent and null fields are not enforced. Reports the first violation only.
pub fn validate(payload: &Record, schema: &Schema) -> Result<(), SchemaError> {
    for (field, expected) in schema {
        match payload.get(field) {
            None | Some(Value::Null) => continue,
            Some(value) if value_matches(value, *expected) => continue,
            Some(_) => {
                return Err(SchemaError::TypeMismatch {
                    field: field.clone(),
                    expected: *expected,
                })
            }
        }
    }
    Ok(())
}

pub fn value_matches(value: &Value, expected: FieldType) -> bool {
    match expected {
        FieldType::String => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Date => match value {
            Value::String(s) => parses_as_timestamp(s),
            // epoch milliseconds
            Value::Number(n) => n.as_f64().map(f64::is_finite).unwrap_or(false),
            _ => false,
        },
    }
}

fn parses_as_timestamp(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    fn schema(pairs: &[(&str, FieldType)]) -> Schema {
        pairs.iter().map(|(k, t)| (k.to_string(), *t)).collect()
    }

    #[test]
    fn matching_payload_passes() {
        let s = schema(&[
            ("name", FieldType::String),
            ("age", FieldType::Number),
            ("active", FieldType::Boolean),
            ("born", FieldType::Date),
        ]);
        let p = record(json!({"name": "ada", "age": 36, "active": true, "born": "1815-12-10"}));
        assert!(validate(&p, &s).is_ok());
    }

    #[test]
    fn absent_and_null_fields_are_not_enforced() {
        let s = schema(&[("age", FieldType::Number), ("name", FieldType::String)]);
        let p = record(json!({"age": null, "extra": [1, 2]}));
        assert!(validate(&p, &s).is_ok());
    }

    #[test]
    fn mismatch_names_the_field_and_type() {
        let s = schema(&[("age", FieldType::Number)]);
        let err = validate(&record(json!({"age": "x"})), &s).unwrap_err();
        assert_eq!(err.field(), "age");
        assert_eq!(err.to_string(), "Field 'age' must be of type Number");
    }

    #[test]
    fn reports_first_violation_in_field_order() {
        let s = schema(&[("b", FieldType::Boolean), ("a", FieldType::String)]);
        let err = validate(&record(json!({"a": 1, "b": "no"})), &s).unwrap_err();
        assert_eq!(err.field(), "a");
    }

    #[test]
    fn dates_accept_timestamps_and_reject_garbage() {
        assert!(value_matches(&json!("2024-03-01T10:00:00Z"), FieldType::Date));
        assert!(value_matches(&json!("2024-03-01T10:00:00.123"), FieldType::Date));
        assert!(value_matches(&json!(1709287200000_i64), FieldType::Date));
        assert!(!value_matches(&json!("next tuesday"), FieldType::Date));
        assert!(!value_matches(&json!(true), FieldType::Date));
    }

    #[test]
    fn types_deserialize_from_either_case() {
        let s: Schema = serde_json::from_value(json!({"a": "number", "b": "String"})).unwrap();
        assert_eq!(s["a"], FieldType::Number);
        assert_eq!(s["b"], FieldType::String);
    }
}
