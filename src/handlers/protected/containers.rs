use axum::extract::{Extension, Path, State};
use futures::future::try_join_all;
use serde_json::{json, Value};

use crate::database::repository;
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::state::AppState;

/// GET /containers - `[{"name": "app", "tables": ["todos", ...]}, ...]`
pub async fn containers_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Value> {
    let workspace = auth.workspace_id.as_str();
    let names = state.storage.list_containers(workspace).await?;
    let documents = try_join_all(names.iter().map(|name| state.storage.read_container(workspace, name))).await?;

    let listing: Vec<Value> = names
        .into_iter()
        .zip(documents)
        .filter_map(|(name, container)| {
            let tables: Vec<&String> = container.as_ref()?.tables.keys().collect();
            Some(json!({ "name": name, "tables": tables }))
        })
        .collect();

    Ok(ApiResponse::success(Value::Array(listing)))
}

/// DELETE /containers/:name - Drop a container and everything in it
pub async fn container_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(name): Path<String>,
) -> ApiResult<()> {
    repository::delete_container(&state, &auth.workspace_id, &name).await?;
    Ok(ApiResponse::no_content())
}
