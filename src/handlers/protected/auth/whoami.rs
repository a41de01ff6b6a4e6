use axum::extract::Extension;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthContext};

/// GET /auth/whoami - Who the middleware decided the caller is
pub async fn whoami_get(Extension(auth): Extension<AuthContext>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "workspaceId": auth.workspace_id,
        "role": auth.role,
        "credential": auth.credential,
    })))
}
