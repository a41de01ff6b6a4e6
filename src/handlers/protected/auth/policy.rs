use axum::extract::{rejection::JsonRejection, Extension, State};
use axum::Json;
use serde_json::{Map, Value};

use crate::database::models::AuthPolicy;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthContext};
use crate::state::AppState;
use crate::types::Verb;

/// GET /auth/policy - Which methods require a token
pub async fn policy_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<AuthPolicy> {
    let document = state
        .storage
        .read_workspace(&auth.workspace_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Workspace not found"))?;
    Ok(ApiResponse::success(document.auth_policy))
}

/// PATCH /auth/policy - `{"get": false}` makes reads anonymous. Omitted
/// methods keep their current setting.
pub async fn policy_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<AuthPolicy> {
    let Json(payload) = payload?;
    let changes = parse_policy_changes(&payload)?;
    let policy = state.sessions.update_policy(&auth.workspace_id, &changes).await?;
    tracing::info!("Updated auth policy for workspace {}", auth.workspace_id);
    Ok(ApiResponse::success(policy))
}

fn parse_policy_changes(payload: &Map<String, Value>) -> Result<Vec<(Verb, bool)>, ApiError> {
    if payload.is_empty() {
        return Err(ApiError::bad_request("Expected at least one method flag"));
    }
    payload
        .iter()
        .map(|(method, flag)| {
            let verb = Verb::parse(method).ok_or_else(|| ApiError::bad_request(format!("Unknown method '{}'", method)))?;
            let required = flag
                .as_bool()
                .ok_or_else(|| ApiError::bad_request(format!("Flag for '{}' must be a boolean", method)))?;
            Ok((verb, required))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_flags_and_rejects_junk() {
        let ok = json!({"GET": false, "post": true});
        let changes = parse_policy_changes(ok.as_object().unwrap()).unwrap();
        assert!(changes.contains(&(Verb::Get, false)));
        assert!(changes.contains(&(Verb::Post, true)));

        assert!(parse_policy_changes(json!({"get": "no"}).as_object().unwrap()).is_err());
        assert!(parse_policy_changes(json!({"trace": true}).as_object().unwrap()).is_err());
        assert!(parse_policy_changes(&Map::new()).is_err());
    }
}
