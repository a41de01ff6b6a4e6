use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::database::models::FieldType;
use crate::database::repository::{parse_custom_paths, ColumnChange, Repository, Transform};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    #[serde(alias = "name")]
    pub new_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransformRequest {
    #[serde(default)]
    pub remove: Vec<String>,
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    #[serde(default)]
    pub set: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnAction {
    Add,
    Remove,
}

#[derive(Debug, Deserialize)]
pub struct ColumnRequest {
    pub action: ColumnAction,
    pub field: String,
    #[serde(rename = "type")]
    pub field_type: Option<FieldType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryKeyRequest {
    #[serde(alias = "field")]
    pub primary_key: String,
}

/// PATCH /:container/:table/rename - `{"newName": "tasks"}`; 400 if taken
pub async fn rename_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((container, table)): Path<(String, String)>,
    payload: Result<Json<RenameRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let repository = Repository::new(&state, &auth.workspace_id, &container, &table)?;
    let view = repository.rename_table(request.new_name.trim()).await?;
    Ok(ApiResponse::success(view))
}

/// PATCH /:container/:table/schema - Bulk transform of every record:
/// `{"remove": [..], "rename": {"old": "new"}, "set": {"field": value}}`
pub async fn schema_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((container, table)): Path<(String, String)>,
    payload: Result<Json<TransformRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let transform = to_transform(request)?;
    let repository = Repository::new(&state, &auth.workspace_id, &container, &table)?;
    Ok(ApiResponse::success(repository.transform(transform).await?))
}

/// PATCH /:container/:table/schema-definition -
/// `{"action": "add", "field": "age", "type": "Number"}` or
/// `{"action": "remove", "field": "age"}`
pub async fn schema_definition_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((container, table)): Path<(String, String)>,
    payload: Result<Json<ColumnRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let change = to_column_change(request)?;
    let repository = Repository::new(&state, &auth.workspace_id, &container, &table)?;
    Ok(ApiResponse::success(repository.define_column(change).await?))
}

/// PATCH /:container/:table/custom-paths - `{"get": "/api/items", "post": null}`;
/// a string sets the alias for that method, `null` removes it
pub async fn custom_paths_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((container, table)): Path<(String, String)>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let changes = parse_custom_paths(&request)?;
    if changes.is_empty() {
        return Err(ApiError::bad_request("Expected at least one method"));
    }
    let repository = Repository::new(&state, &auth.workspace_id, &container, &table)?;
    Ok(ApiResponse::success(repository.set_custom_paths(changes).await?))
}

/// PATCH /:container/:table/primary-key - `{"primaryKey": "sku"}`
pub async fn primary_key_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((container, table)): Path<(String, String)>,
    payload: Result<Json<PrimaryKeyRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let repository = Repository::new(&state, &auth.workspace_id, &container, &table)?;
    Ok(ApiResponse::success(repository.set_primary_key(&request.primary_key).await?))
}

fn to_transform(request: TransformRequest) -> Result<Transform, ApiError> {
    let blank = request.remove.iter().any(|f| f.trim().is_empty())
        || request
            .rename
            .iter()
            .any(|(from, to)| from.trim().is_empty() || to.trim().is_empty());
    if blank {
        return Err(ApiError::bad_request("Field names must not be empty"));
    }

    Ok(Transform {
        remove: request.remove,
        rename: request.rename,
        set: request.set,
    })
}

fn to_column_change(request: ColumnRequest) -> Result<ColumnChange, ApiError> {
    let field = request.field.trim().to_string();
    if field.is_empty() {
        return Err(ApiError::bad_request("Field name must not be empty"));
    }

    match request.action {
        ColumnAction::Add => {
            let field_type = request
                .field_type
                .ok_or_else(|| ApiError::bad_request("Adding a field requires a 'type'"))?;
            Ok(ColumnChange::Add { field, field_type })
        }
        ColumnAction::Remove => Ok(ColumnChange::Remove { field }),
    }
}
