use futures::future::try_join_all;
use serde_json::{json, Map, Value};

use crate::state::AppState;
use crate::storage::StorageError;
use crate::types::Role;

/// Full workspace dump for `GET /introspect`: every container, table,
/// record and the metadata attached to each table.
pub async fn describe_workspace(
    state: &AppState,
    workspace: &str,
    role: Option<Role>,
) -> Result<Value, StorageError> {
    let policy = state
        .storage
        .read_workspace(workspace)
        .await?
        .map(|document| document.auth_policy)
        .unwrap_or_default();

    let names = state.storage.list_containers(workspace).await?;
    let documents = try_join_all(
        names
            .iter()
            .map(|name| state.storage.read_container(workspace, name)),
    )
    .await?;

    let mut containers = Map::new();
    for (name, container) in names.into_iter().zip(documents) {
        // Deleted between listing and reading
        let Some(container) = container else { continue };

        let mut tables = Map::new();
        for (table_name, table) in &container.tables {
            let mut view = table.describe();
            view["records"] = Value::Array(
                table
                    .records()
                    .iter()
                    .cloned()
                    .map(Value::Object)
                    .collect(),
            );
            tables.insert(table_name.clone(), view);
        }
        containers.insert(name, json!({ "tables": tables }));
    }

    Ok(json!({
        "workspaceId": workspace,
        "role": role.map(|r| r.as_str()),
        "authPolicy": policy,
        "containers": containers,
    }))
}
