// handlers/public/auth/login.rs - POST /auth/login handler

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Duration;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::middleware::auth::extract_workspace_id;
use crate::state::AppState;
use crate::types::Role;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub role: Role,
    /// Session lifetime in milliseconds. Defaults to the configured TTL.
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub use_cookie: bool,
}

/// POST /auth/login - Open a session on the workspace named by `x-user-id`
///
/// Input: `{"role": "admin" | "viewer", "expiresIn": 3600000, "useCookie": false}`
///
/// Output: `{"token": "eyJ...", "expires_at": 1760000000000, "role": "admin"}`
/// where `expires_at` is epoch milliseconds. With `useCookie` the token is
/// also set as an HttpOnly cookie.
pub async fn login_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let workspace_id = extract_workspace_id(&headers)?;
    let Json(request) = payload?;

    let security = &state.config.security;
    let ttl_ms = validate_ttl(request.expires_in, security)?;

    let issued = state
        .sessions
        .login(&workspace_id, request.role, Duration::milliseconds(ttl_ms))
        .await?;
    state.activity.touch(&workspace_id);
    info!("Login to workspace {} as {}", workspace_id, issued.role.as_str());

    let body = Json(json!({
        "token": issued.token,
        "expires_at": issued.expires_at.timestamp_millis(),
        "role": issued.role,
    }));

    if request.use_cookie {
        let cookie = session_cookie(security, issued.token, ttl_ms);
        Ok((jar.add(cookie), body).into_response())
    } else {
        Ok(body.into_response())
    }
}

fn validate_ttl(requested: Option<i64>, security: &SecurityConfig) -> Result<i64, ApiError> {
    let ttl = requested.unwrap_or(security.default_session_ttl_ms);
    if ttl <= 0 {
        return Err(ApiError::bad_request("expiresIn must be a positive number of milliseconds"));
    }
    if ttl > security.max_session_ttl_ms {
        return Err(ApiError::bad_request(format!(
            "expiresIn may not exceed {} milliseconds",
            security.max_session_ttl_ms
        )));
    }
    Ok(ttl)
}

fn session_cookie(security: &SecurityConfig, token: String, ttl_ms: i64) -> Cookie<'static> {
    // Max-Age has whole-second resolution; never round a live session down to 0
    let max_age = ((ttl_ms + 999) / 1000).max(1);
    Cookie::build((security.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(security.cookie_secure)
        .max_age(time::Duration::seconds(max_age))
        .build()
}
