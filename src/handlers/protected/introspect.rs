use axum::extract::{Extension, State};
use serde_json::Value;

use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::services::describe_workspace;
use crate::state::AppState;

/// GET /introspect - Every container, table, record and piece of table metadata
pub async fn introspect_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Value> {
    let dump = describe_workspace(&state, &auth.workspace_id, auth.role).await?;
    Ok(ApiResponse::success(dump))
}
