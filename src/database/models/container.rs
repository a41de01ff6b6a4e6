use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::table::Table;

/// A named bag of tables scoped to one workspace. Persisted as one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Container {
    pub tables: BTreeMap<String, Table>,
}

impl Container {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Fetch a table, creating an empty bare one on first write
    pub fn table_or_create(&mut self, name: &str) -> &mut Table {
        self.tables.entry(name.to_string()).or_default()
    }
}
