//! Custom path alias index.
//!
//! Each workspace gets a `(verb, alias) -> table` map, built from storage the
//! first time the workspace is seen and then kept current by every mutation
//! that adds, removes or moves an alias. Lookups never scan containers.

use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

use crate::storage::{StorageBackend, StorageError};
use crate::types::Verb;

/// Path roots owned by the service itself. Aliases may not live under them.
pub const RESERVED_ROOTS: &[&str] = &["/auth", "/introspect", "/containers", "/health"];

/// Table-management sub-paths. Requests ending in these are never rewritten.
pub const RESERVED_SUFFIXES: &[&str] = &[
    "/custom-paths",
    "/schema",
    "/schema-definition",
    "/rename",
    "/primary-key",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub container: String,
    pub table: String,
}

impl TableRef {
    pub fn new(container: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            table: table.into(),
        }
    }
}

/// Result of a successful alias lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub target: TableRef,
    pub id: Option<String>,
}

impl Resolved {
    /// Canonical `/container/table[/id]` path
    pub fn canonical_path(&self) -> String {
        match &self.id {
            Some(id) => format!("/{}/{}/{}", self.target.container, self.target.table, id),
            None => format!("/{}/{}", self.target.container, self.target.table),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AliasError {
    #[error("Custom path must start with '/': {0}")]
    NotAbsolute(String),
    #[error("Custom path '{0}' is not allowed")]
    Invalid(String),
    #[error("Custom path '{0}' collides with a reserved route")]
    Reserved(String),
    #[error("{verb} {path} is already used by {container}/{table}")]
    Conflict {
        verb: &'static str,
        path: String,
        container: String,
        table: String,
    },
}

/// Normalise an alias: absolute, no trailing slash, no query, not reserved
pub fn normalize_alias(raw: &str) -> Result<String, AliasError> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('/') {
        return Err(AliasError::NotAbsolute(trimmed.to_string()));
    }
    let path = trimmed.trim_end_matches('/');
    if path.is_empty() || path.contains("//") || path.contains(['?', '#', ' ']) {
        return Err(AliasError::Invalid(trimmed.to_string()));
    }
    let reserved_root = RESERVED_ROOTS
        .iter()
        .any(|root| path == *root || path.starts_with(&format!("{}/", root)));
    let reserved_suffix = RESERVED_SUFFIXES.iter().any(|s| path.ends_with(s));
    if reserved_root || reserved_suffix {
        return Err(AliasError::Reserved(path.to_string()));
    }
    Ok(path.to_string())
}

/// Paths the resolver must leave alone
pub fn is_reserved_path(path: &str) -> bool {
    path == "/"
        || RESERVED_ROOTS
            .iter()
            .any(|root| path == *root || path.starts_with(&format!("{}/", root)))
        || RESERVED_SUFFIXES.iter().any(|s| path.ends_with(s))
}

type WorkspaceAliases = HashMap<(Verb, String), TableRef>;

#[derive(Default)]
pub struct PathIndex {
    workspaces: RwLock<HashMap<String, WorkspaceAliases>>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self, workspace: &str) -> bool {
        self.read().contains_key(workspace)
    }

    /// Build the workspace's aliases from storage unless already indexed
    pub async fn ensure_loaded(&self, storage: &dyn StorageBackend, workspace: &str) -> Result<(), StorageError> {
        if self.is_loaded(workspace) {
            return Ok(());
        }

        let names = storage.list_containers(workspace).await?;
        let containers = try_join_all(names.iter().map(|name| storage.read_container(workspace, name))).await?;

        let mut aliases = WorkspaceAliases::new();
        for (name, container) in names.iter().zip(containers) {
            let Some(container) = container else { continue };
            for (table_name, table) in &container.tables {
                let Some(paths) = table.custom_paths() else { continue };
                for (verb, path) in paths {
                    let target = TableRef::new(name.as_str(), table_name.as_str());
                    if let Some(existing) = aliases.get(&(*verb, path.clone())) {
                        warn!(
                            "Duplicate alias {} {} in workspace {}: keeping {}/{}",
                            verb.as_str(), path, workspace, existing.container, existing.table
                        );
                        continue;
                    }
                    aliases.insert((*verb, path.clone()), target);
                }
            }
        }

        debug!("Indexed {} custom paths for workspace {}", aliases.len(), workspace);
        // A concurrent loader may have won; its view is just as fresh
        self.write().entry(workspace.to_string()).or_insert(aliases);
        Ok(())
    }

    pub fn lookup(&self, workspace: &str, verb: Verb, path: &str) -> Option<Resolved> {
        let guard = self.read();
        let aliases = guard.get(workspace)?;
        let path = path.trim_end_matches('/');

        if let Some(target) = aliases.get(&(verb, path.to_string())) {
            return Some(Resolved {
                target: target.clone(),
                id: None,
            });
        }

        let (prefix, id) = path.rsplit_once('/')?;
        if id.is_empty() {
            return None;
        }
        aliases.get(&(verb, prefix.to_string())).map(|target| Resolved {
            target: target.clone(),
            id: Some(id.to_string()),
        })
    }

    /// Claim `(verb, path)` for `target`. Re-claiming for the same table is a no-op.
    pub fn reserve(&self, workspace: &str, verb: Verb, path: &str, target: &TableRef) -> Result<(), AliasError> {
        let mut guard = self.write();
        let aliases = guard.entry(workspace.to_string()).or_default();
        match aliases.get(&(verb, path.to_string())) {
            Some(existing) if existing != target => Err(AliasError::Conflict {
                verb: verb.as_str(),
                path: path.to_string(),
                container: existing.container.clone(),
                table: existing.table.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                aliases.insert((verb, path.to_string()), target.clone());
                Ok(())
            }
        }
    }

    /// Drop `(verb, path)` if it still points at `target`
    pub fn release(&self, workspace: &str, verb: Verb, path: &str, target: &TableRef) {
        let mut guard = self.write();
        if let Some(aliases) = guard.get_mut(workspace) {
            let key = (verb, path.to_string());
            if aliases.get(&key) == Some(target) {
                aliases.remove(&key);
            }
        }
    }

    pub fn remove_table(&self, workspace: &str, target: &TableRef) {
        if let Some(aliases) = self.write().get_mut(workspace) {
            aliases.retain(|_, t| t != target);
        }
    }

    pub fn rename_table(&self, workspace: &str, from: &TableRef, to: &TableRef) {
        if let Some(aliases) = self.write().get_mut(workspace) {
            for target in aliases.values_mut() {
                if target == from {
                    *target = to.clone();
                }
            }
        }
    }

    pub fn remove_container(&self, workspace: &str, container: &str) {
        if let Some(aliases) = self.write().get_mut(workspace) {
            aliases.retain(|_, t| t.container != container);
        }
    }

    pub fn forget_workspace(&self, workspace: &str) {
        self.write().remove(workspace);
    }

    pub fn rename_workspace(&self, old: &str, new: &str) {
        let mut guard = self.write();
        if let Some(aliases) = guard.remove(old) {
            guard.insert(new.to_string(), aliases);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, WorkspaceAliases>> {
        self.workspaces.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, WorkspaceAliases>> {
        self.workspaces.write().unwrap_or_else(PoisonError::into_inner)
    }
}
