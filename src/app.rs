use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Router,
};
use std::any::Any;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::middleware::{custom_paths_middleware, html_errors_middleware, workspace_auth_middleware};
use crate::state::AppState;

/// The complete service. Custom-path rewriting wraps the router so aliases
/// are resolved before any route is matched.
pub fn app(state: AppState) -> Router {
    Router::new()
        .fallback_service(routes(state.clone()))
        .layer(middleware::from_fn_with_state(state, custom_paths_middleware))
}

fn routes(state: AppState) -> Router {
    let body_limit = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config.security);

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(auth_public_routes())
        // Workspace-scoped
        .merge(protected_routes(state.clone()))
        .fallback(not_found)
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn(html_errors_middleware))
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/register", post(auth::register_post))
        .route("/auth/login", post(auth::login_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(container_routes())
        .merge(meta_routes())
        .merge(data_routes())
        .route_layer(middleware::from_fn_with_state(state, workspace_auth_middleware))
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/auth/whoami", get(auth::whoami_get))
        .route("/auth/policy", get(auth::policy_get).patch(auth::policy_patch))
        .route("/auth/update-uuid", patch(auth::update_uuid_patch))
        .route("/auth/account", delete(auth::account_delete))
}

fn container_routes() -> Router<AppState> {
    use protected::{containers, introspect};

    Router::new()
        .route("/introspect", get(introspect::introspect_get))
        .route("/containers", get(containers::containers_get))
        .route("/containers/:name", delete(containers::container_delete))
}

fn meta_routes() -> Router<AppState> {
    use protected::meta;

    Router::new()
        .route("/:container/:table/rename", patch(meta::rename_patch))
        .route("/:container/:table/schema", patch(meta::schema_patch))
        .route("/:container/:table/schema-definition", patch(meta::schema_definition_patch))
        .route("/:container/:table/custom-paths", patch(meta::custom_paths_patch))
        .route("/:container/:table/primary-key", patch(meta::primary_key_patch))
}

fn data_routes() -> Router<AppState> {
    use protected::data;

    Router::new()
        // Table-level operations
        .route(
            "/:container/:table",
            get(data::table_get).post(data::table_post).delete(data::table_delete),
        )
        // Record-level operations
        .route(
            "/:container/:table/:id",
            get(data::record_get)
                .put(data::record_put)
                .patch(data::record_patch)
                .delete(data::record_delete),
        )
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static("x-api-key"),
            HeaderName::from_static("csrf-token"),
            HeaderName::from_static("x-csrf-token"),
        ])
        .allow_credentials(true)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Handler panicked: {}", detail);
    ApiError::internal_server_error("An unexpected error occurred").into_response()
}
