use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::auth::SessionStore;
use crate::config::AppConfig;
use crate::database::locks::WriteLocks;
use crate::middleware::rate_limit::RateLimiter;
use crate::services::{ActivityTracker, PathIndex};
use crate::storage::StorageBackend;

/// Everything handlers need, built once at startup and cloned per request.
/// Only the data behind the `Arc`s changes after construction.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageBackend>,
    pub locks: Arc<WriteLocks>,
    pub paths: Arc<PathIndex>,
    pub sessions: Arc<SessionStore>,
    pub activity: Arc<ActivityTracker>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(mut config: AppConfig, storage: Arc<dyn StorageBackend>) -> Self {
        if config.security.jwt_secret.is_empty() {
            warn!("JWT_SECRET not set; using a per-process secret, tokens will not survive a restart");
            config.security.jwt_secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        }

        let locks = Arc::new(WriteLocks::new());
        let sessions = Arc::new(SessionStore::new(
            storage.clone(),
            locks.clone(),
            config.security.jwt_secret.clone(),
        ));
        let limiter = Arc::new(RateLimiter::new(
            config.api.rate_limit_requests,
            config.api.rate_limit_window_secs,
        ));

        Self {
            config: Arc::new(config),
            storage,
            locks,
            paths: Arc::new(PathIndex::new()),
            sessions,
            activity: Arc::new(ActivityTracker::new()),
            limiter,
        }
    }
}
