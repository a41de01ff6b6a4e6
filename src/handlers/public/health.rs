use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service banner
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": "MockDB API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Self-hosted mock JSON database for frontend prototyping",
        "storage": state.storage.kind(),
        "endpoints": {
            "register": "POST /auth/register (public)",
            "login": "POST /auth/login (public, x-user-id)",
            "auth": "/auth/whoami, /auth/policy, /auth/update-uuid, /auth/account",
            "introspect": "GET /introspect",
            "containers": "GET /containers, DELETE /containers/:name",
            "data": "/:container/:table[/:id]",
            "meta": "PATCH /:container/:table/{rename,schema,schema-definition,custom-paths,primary-key}",
        },
    }))
}

/// GET /health - storage reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.storage.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "storage": state.storage.kind(),
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "storage": state.storage.kind(),
                    "error": "storage unavailable",
                })),
            )
        }
    }
}
