use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

use crate::database::models::schema::{self, FieldType, Schema, SchemaError};
use crate::database::models::{Container, Table};
use crate::database::record::{generate_key, key_taken, merge, scalar_to_string, Record};
use crate::filter::{ListOutput, ListQuery};
use crate::services::path_index::{normalize_alias, AliasError, TableRef, RESERVED_SUFFIXES};
use crate::state::AppState;
use crate::storage::StorageError;
use crate::types::{is_valid_identifier, Verb};

/// Container names that would shadow service routes
pub const RESERVED_CONTAINERS: &[&str] = &["auth", "containers", "introspect", "health"];

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    QuotaExceeded(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Alias(#[from] AliasError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Table initialisation carried by `POST /:container/:table` with `_init`
#[derive(Debug, Default, Clone)]
pub struct TableInit {
    pub schema: Option<Schema>,
    pub custom_paths: BTreeMap<Verb, Option<String>>,
    pub primary_key: Option<String>,
}

/// Bulk record transform. Applied in order: remove, rename, set.
#[derive(Debug, Default, Clone)]
pub struct Transform {
    pub remove: Vec<String>,
    pub rename: BTreeMap<String, String>,
    pub set: Record,
}

impl Transform {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.rename.is_empty() && self.set.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnChange {
    Add { field: String, field_type: FieldType },
    Remove { field: String },
}

/// Alias index edits made during one mutation. Reservations are rolled back
/// if the container write fails; retired aliases are released once it lands.
#[derive(Debug, Default)]
struct AliasChanges {
    reserved: Vec<(Verb, String)>,
    retired: Vec<(Verb, String)>,
}

/// Record and table operations on one `(workspace, container, table)`.
///
/// Every mutation is a whole-container read-modify-write performed under the
/// container's write lock. Reads take no lock.
pub struct Repository<'a> {
    state: &'a AppState,
    workspace: &'a str,
    container: &'a str,
    table: &'a str,
}

impl<'a> Repository<'a> {
    pub fn new(state: &'a AppState, workspace: &'a str, container: &'a str, table: &'a str) -> Result<Self, DataError> {
        check_container_name(container)?;
        check_name("table", table)?;
        Ok(Self {
            state,
            workspace,
            container,
            table,
        })
    }

    fn table_ref(&self) -> TableRef {
        TableRef::new(self.container, self.table)
    }

    fn table_not_found(&self) -> DataError {
        DataError::NotFound(format!("Table '{}/{}' not found", self.container, self.table))
    }

    fn record_not_found(&self, id: &str) -> DataError {
        DataError::NotFound(format!("Record '{}' not found in '{}/{}'", id, self.container, self.table))
    }

    pub async fn load_table(&self) -> Result<Table, DataError> {
        self.state
            .storage
            .read_container(self.workspace, self.container)
            .await?
            .and_then(|mut container| container.tables.remove(self.table))
            .ok_or_else(|| self.table_not_found())
    }

    pub async fn list(&self, query: &ListQuery) -> Result<ListOutput, DataError> {
        let table = self.load_table().await?;
        Ok(query.apply(table.records()))
    }

    pub async fn select_one(&self, id: &str) -> Result<Record, DataError> {
        let table = self.load_table().await?;
        table.find(id).cloned().ok_or_else(|| self.record_not_found(id))
    }

    /// Append a record, assigning a primary key when none is supplied
    pub async fn create(&self, mut record: Record) -> Result<Record, DataError> {
        let max_records = self.state.config.api.max_records_per_table;

        self.mutate(true, |container, _| {
            let table = container.table_or_create(self.table);
            if table.records().len() >= max_records {
                return Err(DataError::QuotaExceeded(format!(
                    "Table '{}' already holds the maximum of {} records",
                    self.table, max_records
                )));
            }

            let pk = table.primary_key().to_string();
            match record.get(&pk) {
                Some(value) if !value.is_null() => {
                    if !table.has_explicit_primary_key() {
                        return Err(DataError::BadRequest(format!(
                            "Field '{}' is assigned by the server; designate a primary key to supply your own",
                            pk
                        )));
                    }
                    let text = scalar_to_string(value).ok_or_else(|| {
                        DataError::BadRequest(format!("Primary key '{}' must be a scalar", pk))
                    })?;
                    check_addressable_key(&pk, &text)?;
                    if key_taken(table.records(), &pk, value) {
                        return Err(DataError::BadRequest(format!(
                            "Duplicate value for unique field '{}'",
                            pk
                        )));
                    }
                }
                _ => {
                    let key = generate_key(table.records(), &pk, table.schema()).ok_or_else(|| {
                        DataError::BadRequest(format!(
                            "No numeric value left for primary key '{}'; supply one explicitly",
                            pk
                        ))
                    })?;
                    record.insert(pk, key);
                }
            }

            if let Some(declared) = table.schema() {
                schema::validate(&record, declared)?;
            }
            table.records_mut().push(record.clone());
            Ok(record)
        })
        .await
    }

    /// Full overwrite. The stored primary key always wins.
    pub async fn replace(&self, id: &str, mut record: Record) -> Result<Record, DataError> {
        self.mutate(false, |container, _| {
            let table = container.table_mut(self.table).ok_or_else(|| self.table_not_found())?;
            let index = table.position(id).ok_or_else(|| self.record_not_found(id))?;
            let pk = table.primary_key().to_string();

            let key = table.records()[index].get(&pk).cloned().unwrap_or(Value::Null);
            record.insert(pk, key);
            if let Some(declared) = table.schema() {
                schema::validate(&record, declared)?;
            }

            table.records_mut()[index] = record.clone();
            Ok(record)
        })
        .await
    }

    /// Shallow merge. Only supplied fields are validated.
    pub async fn update(&self, id: &str, mut changes: Record) -> Result<Record, DataError> {
        self.mutate(false, |container, _| {
            let table = container.table_mut(self.table).ok_or_else(|| self.table_not_found())?;
            let index = table.position(id).ok_or_else(|| self.record_not_found(id))?;

            changes.remove(table.primary_key());
            if let Some(declared) = table.schema() {
                schema::validate(&changes, declared)?;
            }

            let record = &mut table.records_mut()[index];
            merge(record, changes);
            Ok(record.clone())
        })
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), DataError> {
        self.mutate(false, |container, _| {
            let table = container.table_mut(self.table).ok_or_else(|| self.table_not_found())?;
            let index = table.position(id).ok_or_else(|| self.record_not_found(id))?;
            table.records_mut().remove(index);
            Ok(())
        })
        .await
    }

    /// Create or reconfigure a table without inserting a record
    pub async fn init_table(&self, init: TableInit) -> Result<Value, DataError> {
        if !init.custom_paths.is_empty() {
            self.state
                .paths
                .ensure_loaded(self.state.storage.as_ref(), self.workspace)
                .await?;
        }

        let view = self
            .mutate(true, |container, aliases| {
                let table = container.table_or_create(self.table);
                if let Some(pk) = &init.primary_key {
                    assign_primary_key(table, pk)?;
                }
                if let Some(schema) = &init.schema {
                    table.structured().schema = schema.clone();
                }
                if !init.custom_paths.is_empty() {
                    self.apply_custom_paths(table, &init.custom_paths, aliases)?;
                }
                Ok(table.describe())
            })
            .await?;

        info!("Initialised table {}/{} in workspace {}", self.container, self.table, self.workspace);
        Ok(view)
    }

    pub async fn drop_table(&self) -> Result<(), DataError> {
        self.mutate(false, |container, _| {
            container
                .tables
                .remove(self.table)
                .map(|_| ())
                .ok_or_else(|| self.table_not_found())
        })
        .await?;

        self.state.paths.remove_table(self.workspace, &self.table_ref());
        Ok(())
    }

    /// Move the table (records and metadata) to `new_name` in the same container
    pub async fn rename_table(&self, new_name: &str) -> Result<Value, DataError> {
        check_name("table", new_name)?;

        let view = self
            .mutate(false, |container, _| {
                if container.tables.contains_key(new_name) {
                    return Err(DataError::BadRequest(format!(
                        "Table '{}' already exists in '{}'",
                        new_name, self.container
                    )));
                }
                let table = container.tables.remove(self.table).ok_or_else(|| self.table_not_found())?;
                let view = table.describe();
                container.tables.insert(new_name.to_string(), table);
                Ok(view)
            })
            .await?;

        self.state
            .paths
            .rename_table(self.workspace, &self.table_ref(), &TableRef::new(self.container, new_name));
        Ok(json!({ "name": new_name, "table": view }))
    }

    /// Bulk `remove` / `rename` / `set` across every record in one pass
    pub async fn transform(&self, transform: Transform) -> Result<Value, DataError> {
        if transform.is_empty() {
            return Err(DataError::BadRequest(
                "Expected at least one of 'remove', 'rename' or 'set'".to_string(),
            ));
        }

        self.mutate(false, |container, _| {
            let table = container.table_mut(self.table).ok_or_else(|| self.table_not_found())?;
            let pk = table.primary_key().to_string();

            let touches_key = transform.remove.contains(&pk)
                || transform.rename.iter().any(|(from, to)| *from == pk || *to == pk)
                || transform.set.contains_key(&pk);
            if touches_key {
                return Err(DataError::BadRequest(format!(
                    "Primary key '{}' cannot be changed by a transform",
                    pk
                )));
            }

            // Keep any declared types following their fields
            if let Table::Structured(structured) = &mut *table {
                for field in &transform.remove {
                    structured.schema.remove(field);
                }
                let moved: Vec<(&String, FieldType)> = transform
                    .rename
                    .iter()
                    .filter_map(|(from, to)| structured.schema.remove(from).map(|t| (to, t)))
                    .collect();
                for (to, field_type) in moved {
                    structured.schema.insert(to.clone(), field_type);
                }
            }
            if let Some(declared) = table.schema() {
                schema::validate(&transform.set, declared)?;
            }

            let records = table.records_mut();
            for record in records.iter_mut() {
                for field in &transform.remove {
                    record.remove(field);
                }
                // Lift every source out before inserting so swaps keep both values
                let moved: Vec<(&String, Value)> = transform
                    .rename
                    .iter()
                    .filter_map(|(from, to)| record.remove(from).map(|value| (to, value)))
                    .collect();
                for (to, value) in moved {
                    record.insert(to.clone(), value);
                }
                merge(record, transform.set.clone());
            }
            let updated = records.len();

            Ok(json!({ "updated": updated, "table": table.describe() }))
        })
        .await
    }

    /// Add or remove one typed column. Stored records are left untouched.
    pub async fn define_column(&self, change: ColumnChange) -> Result<Value, DataError> {
        self.mutate(false, |container, _| {
            let table = container.table_mut(self.table).ok_or_else(|| self.table_not_found())?;
            let schema = &mut table.structured().schema;

            match &change {
                ColumnChange::Add { field, field_type } => {
                    if schema.contains_key(field) {
                        return Err(DataError::BadRequest(format!("Field '{}' is already defined", field)));
                    }
                    schema.insert(field.clone(), *field_type);
                }
                ColumnChange::Remove { field } => {
                    if schema.remove(field).is_none() {
                        return Err(DataError::NotFound(format!("Field '{}' is not defined", field)));
                    }
                }
            }
            Ok(table.describe())
        })
        .await
    }

    /// Set (`Some`) or clear (`None`) the alias for each listed verb
    pub async fn set_custom_paths(&self, changes: BTreeMap<Verb, Option<String>>) -> Result<Value, DataError> {
        self.state
            .paths
            .ensure_loaded(self.state.storage.as_ref(), self.workspace)
            .await?;

        self.mutate(false, |container, aliases| {
            let table = container.table_mut(self.table).ok_or_else(|| self.table_not_found())?;
            self.apply_custom_paths(table, &changes, aliases)?;
            Ok(table.describe())
        })
        .await
    }

    pub async fn set_primary_key(&self, field: &str) -> Result<Value, DataError> {
        self.mutate(false, |container, _| {
            let table = container.table_mut(self.table).ok_or_else(|| self.table_not_found())?;
            assign_primary_key(table, field)?;
            Ok(table.describe())
        })
        .await
    }

    fn apply_custom_paths(
        &self,
        table: &mut Table,
        changes: &BTreeMap<Verb, Option<String>>,
        aliases: &mut AliasChanges,
    ) -> Result<(), DataError> {
        let target = self.table_ref();
        let paths = &mut table.structured().custom_paths;

        for (verb, requested) in changes {
            let current = paths.get(verb).cloned();
            match requested {
                Some(raw) => {
                    let path = normalize_alias(raw)?;
                    if current.as_deref() == Some(path.as_str()) {
                        continue;
                    }
                    self.state.paths.reserve(self.workspace, *verb, &path, &target)?;
                    aliases.reserved.push((*verb, path.clone()));
                    if let Some(old) = current {
                        aliases.retired.push((*verb, old));
                    }
                    paths.insert(*verb, path);
                }
                None => {
                    if let Some(old) = paths.remove(verb) {
                        aliases.retired.push((*verb, old));
                    }
                }
            }
        }
        Ok(())
    }

    /// Locked read-modify-write of the whole container document
    async fn mutate<T, F>(&self, create: bool, apply: F) -> Result<T, DataError>
    where
        F: FnOnce(&mut Container, &mut AliasChanges) -> Result<T, DataError>,
    {
        let _workspace = self.state.locks.workspace_shared(self.workspace).await;
        let _guard = self.state.locks.container(self.workspace, self.container).await;

        let mut container = match self.state.storage.read_container(self.workspace, self.container).await? {
            Some(container) => container,
            None if create => {
                self.check_container_quota().await?;
                Container::default()
            }
            None => return Err(self.table_not_found()),
        };

        let mut aliases = AliasChanges::default();
        let written = match apply(&mut container, &mut aliases) {
            Ok(out) => self
                .state
                .storage
                .write_container(self.workspace, self.container, &container)
                .await
                .map(|_| out)
                .map_err(DataError::from),
            Err(e) => Err(e),
        };

        let target = self.table_ref();
        match written {
            Ok(out) => {
                for (verb, path) in &aliases.retired {
                    self.state.paths.release(self.workspace, *verb, path, &target);
                }
                Ok(out)
            }
            Err(e) => {
                for (verb, path) in &aliases.reserved {
                    self.state.paths.release(self.workspace, *verb, path, &target);
                }
                Err(e)
            }
        }
    }

    async fn check_container_quota(&self) -> Result<(), DataError> {
        let max = self.state.config.api.max_containers_per_workspace;
        let existing = self.state.storage.list_containers(self.workspace).await?.len();
        if existing >= max {
            warn!("Workspace {} hit the container quota ({})", self.workspace, max);
            return Err(DataError::QuotaExceeded(format!(
                "Workspace already holds the maximum of {} containers",
                max
            )));
        }
        Ok(())
    }
}

/// Delete a whole container and every alias its tables registered
pub async fn delete_container(state: &AppState, workspace: &str, name: &str) -> Result<(), DataError> {
    check_container_name(name)?;

    let _workspace = state.locks.workspace_shared(workspace).await;
    let _guard = state.locks.container(workspace, name).await;
    if !state.storage.delete_container(workspace, name).await? {
        return Err(DataError::NotFound(format!("Container '{}' not found", name)));
    }
    state.paths.remove_container(workspace, name);
    debug!("Deleted container {} in workspace {}", name, workspace);
    Ok(())
}

/// Designate `field` as the primary key. Every record must already carry a
/// unique, non-null scalar value for it.
fn assign_primary_key(table: &mut Table, field: &str) -> Result<(), DataError> {
    let field = field.trim();
    if field.is_empty() {
        return Err(DataError::BadRequest("Primary key field must not be empty".to_string()));
    }

    let mut seen = HashSet::new();
    for record in table.records() {
        let value = record
            .get(field)
            .filter(|v| !v.is_null())
            .and_then(scalar_to_string)
            .ok_or_else(|| {
                DataError::BadRequest(format!("Every record needs a value for primary key '{}'", field))
            })?;
        check_addressable_key(field, &value)?;
        if !seen.insert(value) {
            return Err(DataError::BadRequest(format!(
                "Duplicate value for unique field '{}'",
                field
            )));
        }
    }

    table.structured().primary_key = Some(field.to_string());
    Ok(())
}

/// Record keys end up as the last path segment, so they must not collide with
/// the table-management routes or span segments.
fn check_addressable_key(field: &str, key: &str) -> Result<(), DataError> {
    let shadowed = RESERVED_SUFFIXES
        .iter()
        .any(|suffix| suffix.strip_prefix('/') == Some(key));
    if key.is_empty() || key.contains('/') || shadowed {
        return Err(DataError::BadRequest(format!(
            "Value '{}' cannot be used for primary key '{}'",
            key, field
        )));
    }
    Ok(())
}

fn check_name(kind: &str, name: &str) -> Result<(), DataError> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(DataError::BadRequest(format!(
            "Invalid {} name '{}': use 1-64 letters, digits, '-' or '_'",
            kind, name
        )))
    }
}

fn check_container_name(name: &str) -> Result<(), DataError> {
    check_name("container", name)?;
    if RESERVED_CONTAINERS.contains(&name) {
        return Err(DataError::BadRequest(format!("Container name '{}' is reserved", name)));
    }
    Ok(())
}

/// Parse a `{"get": "/alias", "post": null, ...}` map
pub fn parse_custom_paths(raw: &Map<String, Value>) -> Result<BTreeMap<Verb, Option<String>>, DataError> {
    raw.iter()
        .map(|(key, value)| {
            let verb = Verb::parse(key)
                .ok_or_else(|| DataError::BadRequest(format!("Unknown method '{}' in custom paths", key)))?;
            match value {
                Value::String(path) => Ok((verb, Some(path.clone()))),
                Value::Null => Ok((verb, None)),
                _ => Err(DataError::BadRequest(format!(
                    "Custom path for '{}' must be a string or null",
                    key
                ))),
            }
        })
        .collect()
}
