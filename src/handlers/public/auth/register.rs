// handlers/public/auth/register.rs - POST /auth/register handler

use axum::extract::State;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// POST /auth/register - Allocate a fresh, empty workspace
///
/// ```json
/// { "workspaceId": "6f1c..." }
/// ```
pub async fn register_post(State(state): State<AppState>) -> ApiResult<Value> {
    let workspace_id = state.sessions.register().await?;
    state.activity.touch(&workspace_id);
    Ok(ApiResponse::created(json!({ "workspaceId": workspace_id })))
}
