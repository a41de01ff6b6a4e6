use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::schema::Schema;
use crate::database::record::{key_matches, Record, DEFAULT_PRIMARY_KEY};
use crate::types::Verb;

/// A table that carries metadata next to its records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredTable {
    #[serde(default)]
    pub schema: Schema,
    #[serde(default)]
    pub custom_paths: BTreeMap<Verb, String>,
    /// Explicitly designated primary key. `None` means the default `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    pub records: Vec<Record>,
}

/// Stored table. Starts bare (a plain record list) and is upgraded to
/// `Structured` by the first schema, primary-key or custom-path mutation.
///
/// `Bare` must stay first: serde tries untagged variants in order and a
/// derived struct would also accept a JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Table {
    Bare(Vec<Record>),
    Structured(StructuredTable),
}

impl Default for Table {
    fn default() -> Self {
        Table::Bare(Vec::new())
    }
}

impl Table {
    pub fn primary_key(&self) -> &str {
        match self {
            Table::Structured(StructuredTable { primary_key: Some(pk), .. }) => pk,
            _ => DEFAULT_PRIMARY_KEY,
        }
    }

    pub fn has_explicit_primary_key(&self) -> bool {
        matches!(self, Table::Structured(StructuredTable { primary_key: Some(_), .. }))
    }

    pub fn schema(&self) -> Option<&Schema> {
        match self {
            Table::Structured(t) if !t.schema.is_empty() => Some(&t.schema),
            _ => None,
        }
    }

    pub fn custom_paths(&self) -> Option<&BTreeMap<Verb, String>> {
        match self {
            Table::Structured(t) => Some(&t.custom_paths),
            Table::Bare(_) => None,
        }
    }

    pub fn records(&self) -> &[Record] {
        match self {
            Table::Bare(records) => records,
            Table::Structured(t) => &t.records,
        }
    }

    pub fn records_mut(&mut self) -> &mut Vec<Record> {
        match self {
            Table::Bare(records) => records,
            Table::Structured(t) => &mut t.records,
        }
    }

    /// Upgrade in place to a structured table, keeping records untouched
    pub fn structured(&mut self) -> &mut StructuredTable {
        if let Table::Bare(records) = self {
            let records = std::mem::take(records);
            *self = Table::Structured(StructuredTable {
                records,
                ..Default::default()
            });
        }
        match self {
            Table::Structured(table) => table,
            Table::Bare(_) => unreachable!("bare table was upgraded above"),
        }
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        let pk = self.primary_key();
        self.records().iter().position(|r| key_matches(r, pk, id))
    }

    pub fn find(&self, id: &str) -> Option<&Record> {
        self.position(id).map(|i| &self.records()[i])
    }

    /// Metadata view used by `_init` responses and introspection
    pub fn describe(&self) -> Value {
        let custom_paths: BTreeMap<&str, &String> = self
            .custom_paths()
            .map(|paths| paths.iter().map(|(v, p)| (v.as_str(), p)).collect())
            .unwrap_or_default();

        json!({
            "primaryKey": self.primary_key(),
            "schema": self.schema().cloned().unwrap_or_default(),
            "customPaths": custom_paths,
            "count": self.records().len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::schema::FieldType;

    #[test]
    fn bare_and_structured_tables_round_trip_through_json() {
        let bare: Table = serde_json::from_value(json!([{"id": "1"}])).unwrap();
        assert!(matches!(bare, Table::Bare(ref r) if r.len() == 1));

        let structured: Table = serde_json::from_value(json!({
            "schema": {"age": "Number"},
            "customPaths": {"get": "/api/items"},
            "primaryKey": "sku",
            "records": [{"sku": "a"}]
        }))
        .unwrap();
        assert_eq!(structured.primary_key(), "sku");
        assert_eq!(structured.custom_paths().unwrap()[&Verb::Get], "/api/items");

        let text = serde_json::to_value(&structured).unwrap();
        assert_eq!(text["customPaths"]["get"], "/api/items");
    }

    #[test]
    fn upgrade_preserves_records_exactly() {
        let records: Vec<Record> = vec![
            serde_json::from_value(json!({"id": "1", "a": 1})).unwrap(),
            serde_json::from_value(json!({"id": "2", "b": [true]})).unwrap(),
        ];
        let mut table = Table::Bare(records.clone());
        table.structured().schema.insert("a".into(), FieldType::Number);

        assert_eq!(table.records(), records.as_slice());
        assert_eq!(table.primary_key(), "id");
        assert!(!table.has_explicit_primary_key());
        assert!(table.schema().is_some());
    }

    #[test]
    fn finds_records_by_primary_key() {
        let table: Table = serde_json::from_value(json!({
            "primaryKey": "sku",
            "records": [{"sku": 10, "n": "a"}, {"sku": 11, "n": "b"}]
        }))
        .unwrap();
        assert_eq!(table.position("11"), Some(1));
        assert!(table.find("12").is_none());
    }
}
