use axum::{
    extract::{Request, State},
    http::Uri,
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};

use crate::middleware::auth::extract_workspace_id;
use crate::services::path_index::is_reserved_path;
use crate::state::AppState;
use crate::types::Verb;

/// Rewrite custom-path aliases to their canonical `/container/table[/id]`
/// before routing. Anything that does not resolve passes through untouched
/// and is left for the router (and auth) to reject.
pub async fn custom_paths_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    // Request bodies are not Sync, so only owned parts cross the await
    let verb = Verb::from_method(request.method());
    let workspace = extract_workspace_id(request.headers()).ok();
    let uri = request.uri().clone();

    let rewritten = match (verb, workspace) {
        (Some(verb), Some(workspace)) => resolve(&state, verb, &workspace, &uri).await,
        _ => None,
    };
    if let Some(rewritten) = rewritten {
        debug!("Rewrote {} {} -> {}", request.method(), request.uri(), rewritten);
        *request.uri_mut() = rewritten;
    }
    next.run(request).await
}

async fn resolve(state: &AppState, verb: Verb, workspace: &str, uri: &Uri) -> Option<Uri> {
    let path = uri.path();
    if is_reserved_path(path) {
        return None;
    }

    if !state.paths.is_loaded(workspace) {
        // Only index workspaces that exist; unknown ids must not grow the index
        match state.storage.read_workspace(workspace).await {
            Ok(Some(_)) => {}
            Ok(None) => return None,
            Err(e) => {
                error!("Failed to read workspace {} for path resolution: {}", workspace, e);
                return None;
            }
        }
        if let Err(e) = state.paths.ensure_loaded(state.storage.as_ref(), workspace).await {
            error!("Failed to index custom paths for workspace {}: {}", workspace, e);
            return None;
        }
    }

    let resolved = state.paths.lookup(workspace, verb, path)?;
    let target = match uri.query() {
        Some(query) => format!("{}?{}", resolved.canonical_path(), query),
        None => resolved.canonical_path(),
    };
    target.parse().ok()
}
