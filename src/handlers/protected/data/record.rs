use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    response::Json,
};
use serde_json::Value;

use crate::database::record;
use crate::database::repository::Repository;
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::state::AppState;

/// GET /:container/:table/:id - Get a single record by primary key
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((container, table, id)): Path<(String, String, String)>,
) -> ApiResult<Value> {
    let repository = Repository::new(&state, &auth.workspace_id, &container, &table)?;
    let record = repository.select_one(&id).await?;
    Ok(ApiResponse::success(Value::Object(record)))
}

/// PUT /:container/:table/:id - Replace a record; the primary key is kept
pub async fn put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((container, table, id)): Path<(String, String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(payload) = payload?;
    let replacement = record::from_json(payload)?;

    let repository = Repository::new(&state, &auth.workspace_id, &container, &table)?;
    let record = repository.replace(&id, replacement).await?;
    Ok(ApiResponse::success(Value::Object(record)))
}

/// PATCH /:container/:table/:id - Merge the supplied fields into a record
pub async fn patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((container, table, id)): Path<(String, String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(payload) = payload?;
    let changes = record::from_json(payload)?;

    let repository = Repository::new(&state, &auth.workspace_id, &container, &table)?;
    let record = repository.update(&id, changes).await?;
    Ok(ApiResponse::success(Value::Object(record)))
}

/// DELETE /:container/:table/:id - 204, or 404 if already gone
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((container, table, id)): Path<(String, String, String)>,
) -> ApiResult<()> {
    Repository::new(&state, &auth.workspace_id, &container, &table)?
        .delete(&id)
        .await?;
    Ok(ApiResponse::no_content())
}
