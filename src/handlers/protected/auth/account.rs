use axum::extract::{Extension, State};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::services::WorkspaceService;
use crate::state::AppState;

/// PATCH /auth/update-uuid - Move the workspace to a new identifier.
/// Existing sessions move with it; clients must switch `x-user-id`.
pub async fn update_uuid_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Value> {
    let new_id = WorkspaceService::new(&state).rotate(&auth.workspace_id).await?;
    Ok(ApiResponse::success(json!({
        "workspaceId": new_id,
        "previousWorkspaceId": auth.workspace_id,
    })))
}

/// DELETE /auth/account - Irreversibly wipe the workspace
pub async fn account_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<()> {
    if !WorkspaceService::new(&state).delete(&auth.workspace_id).await? {
        return Err(ApiError::not_found("Workspace not found"));
    }
    Ok(ApiResponse::no_content())
}
