use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::services::activity::PERSIST_INTERVAL_SECS;
use crate::state::AppState;
use crate::types::{is_valid_identifier, Role, Verb};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const API_KEY_HEADER: &str = "x-api-key";
const CSRF_HEADERS: &[&str] = &["csrf-token", "x-csrf-token"];

/// How the caller proved who they are
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Credential {
    ApiKey,
    Token,
    /// Method exempted by the workspace policy and no token presented
    None,
}

/// Caller context attached to every request that passed authentication
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub workspace_id: String,
    /// `None` only for policy-exempted requests that carried no token
    pub role: Option<Role>,
    pub credential: Credential,
}

/// Identity, selective auth and RBAC for everything behind `x-user-id`.
///
/// Order: workspace header, API-key bypass, token (bearer, CSRF header or
/// cookie), per-method policy, role check on mutating verbs.
pub async fn workspace_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = request.headers();
    let workspace_id = extract_workspace_id(headers)?;

    if state.config.api.enable_rate_limiting && !state.limiter.allow(&workspace_id) {
        warn!("Rate limit exceeded for workspace {}", workspace_id);
        return Err(ApiError::too_many_requests("Rate limit exceeded"));
    }

    let document = state
        .storage
        .read_workspace(&workspace_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unknown workspace"))?;

    // HEAD and OPTIONS are treated like reads
    let verb = Verb::from_method(request.method()).unwrap_or(Verb::Get);
    let management = request.uri().path().starts_with("/auth/");

    let (role, credential) = if api_key_matches(headers, &workspace_id) {
        (Some(Role::Admin), Credential::ApiKey)
    } else {
        match extract_token(headers, &state.config.security.cookie_name) {
            Some(token) => {
                let session = state.sessions.validate_in(&document, &token).map_err(|e| {
                    warn!("Rejected token for workspace {}: {}", workspace_id, e);
                    ApiError::from(e)
                })?;
                (Some(session.role), Credential::Token)
            }
            None if management || document.auth_policy.requires_token(verb) => {
                return Err(ApiError::unauthorized("Authentication token required"));
            }
            None => (None, Credential::None),
        }
    };

    if verb.is_mutating() && role.is_some_and(|r| r != Role::Admin) {
        return Err(ApiError::forbidden(format!(
            "Role '{}' may not perform {} requests",
            role.map(|r| r.as_str()).unwrap_or_default(),
            verb.as_str().to_uppercase()
        )));
    }

    debug!(
        "Authorized {} {} for workspace {} as {:?}",
        verb.as_str(),
        request.uri().path(),
        workspace_id,
        role
    );
    state.activity.touch(&workspace_id);
    if Utc::now() - document.last_active_at > Duration::seconds(PERSIST_INTERVAL_SECS) {
        if let Err(e) = state.sessions.mark_active(&workspace_id).await {
            warn!("Could not persist activity for workspace {}: {}", workspace_id, e);
        }
    }
    request.extensions_mut().insert(AuthContext {
        workspace_id,
        role,
        credential,
    });

    Ok(next.run(request).await)
}

/// Required on every workspace-scoped request
pub fn extract_workspace_id(headers: &HeaderMap) -> Result<String, ApiError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::unauthorized("Missing x-user-id header"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid x-user-id header"))?
        .trim();

    if !is_valid_identifier(raw) {
        return Err(ApiError::unauthorized("Invalid x-user-id header"));
    }
    Ok(raw.to_string())
}

fn api_key_matches(headers: &HeaderMap, workspace_id: &str) -> bool {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|key| key.trim() == workspace_id)
        .unwrap_or(false)
}

/// Token from `Authorization: Bearer`, a CSRF header, or the session cookie
fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let csrf = || {
        CSRF_HEADERS
            .iter()
            .filter_map(|name| headers.get(*name))
            .filter_map(|v| v.to_str().ok())
            .map(str::trim)
            .next()
    };

    bearer
        .or_else(csrf)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| {
            CookieJar::from_headers(headers)
                .get(cookie_name)
                .map(|c| c.value().to_string())
                .filter(|t| !t.is_empty())
        })
}
