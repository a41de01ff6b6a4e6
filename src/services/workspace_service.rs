use chrono::{Duration, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::state::AppState;
use crate::storage::StorageError;

/// Workspace lifecycle: identifier rotation, deletion and idle eviction.
/// Keeps storage, the alias index and the activity tracker in step.
pub struct WorkspaceService<'a> {
    state: &'a AppState,
}

impl<'a> WorkspaceService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Move the workspace to a freshly generated id. On failure the old id
    /// stays authoritative.
    pub async fn rotate(&self, workspace: &str) -> Result<String, StorageError> {
        let _guard = self.state.locks.workspace(workspace).await;

        let new_id = loop {
            let candidate = Uuid::new_v4().to_string();
            if self.state.storage.read_workspace(&candidate).await?.is_none() {
                break candidate;
            }
        };

        self.state.storage.rename_workspace(workspace, &new_id).await?;
        self.state.paths.rename_workspace(workspace, &new_id);
        self.state.activity.rename(workspace, &new_id);

        info!("Rotated workspace {} -> {}", workspace, new_id);
        Ok(new_id)
    }

    /// Irreversibly wipe the workspace. Returns false if it did not exist.
    pub async fn delete(&self, workspace: &str) -> Result<bool, StorageError> {
        let _guard = self.state.locks.workspace(workspace).await;
        let existed = self.state.storage.delete_workspace(workspace).await?;
        self.state.paths.forget_workspace(workspace);
        self.state.activity.forget(workspace);

        if existed {
            info!("Deleted workspace {}", workspace);
        }
        Ok(existed)
    }

    /// Delete every workspace idle for longer than the configured window.
    /// Best effort: a request racing the sweep may still see the workspace.
    pub async fn evict_idle(&self) -> Result<Vec<String>, StorageError> {
        let idle = Duration::seconds(self.state.config.eviction.idle_secs as i64);
        let cutoff = Utc::now() - idle;
        let mut evicted = Vec::new();

        for workspace in self.state.storage.list_workspaces().await? {
            let persisted = match self.state.storage.read_workspace(&workspace).await {
                Ok(Some(document)) => document.last_active_at,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping workspace {} during eviction: {}", workspace, e);
                    continue;
                }
            };
            let last_seen = self
                .state
                .activity
                .last_seen(&workspace)
                .map_or(persisted, |seen| seen.max(persisted));

            if last_seen < cutoff && self.delete(&workspace).await? {
                evicted.push(workspace);
            }
        }

        let pruned = self.state.locks.prune();
        if !evicted.is_empty() || pruned > 0 {
            info!("Eviction sweep removed {} workspaces, pruned {} idle locks", evicted.len(), pruned);
        }
        Ok(evicted)
    }
}

/// Start the periodic eviction task if enabled
pub fn spawn_eviction_sweep(state: AppState) -> Option<JoinHandle<()>> {
    if !state.config.eviction.enabled {
        return None;
    }

    let period = std::time::Duration::from_secs(state.config.eviction.sweep_interval_secs.max(1));
    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // First tick fires immediately; skip it so startup is not a sweep
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = WorkspaceService::new(&state).evict_idle().await {
                error!("Eviction sweep failed: {}", e);
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::models::{Container, Workspace};
    use crate::database::record::Record;
    use crate::database::repository::{DataError, Repository};
    use crate::testing::TestContext;

    async fn context() -> TestContext {
        let mut config = AppConfig::development();
        config.eviction.idle_secs = 60;
        TestContext::with_config(config).await.unwrap()
    }

    #[tokio::test]
    async fn rotate_moves_data_to_a_new_id() {
        let ctx = context().await;
        let (state, ws) = (&ctx.state, ctx.workspace.clone());
        state.storage.write_container(&ws, "app", &Container::default()).await.unwrap();

        let new_id = WorkspaceService::new(state).rotate(&ws).await.unwrap();
        assert_ne!(new_id, ws);
        assert!(state.storage.read_workspace(&ws).await.unwrap().is_none());
        assert_eq!(state.storage.list_containers(&new_id).await.unwrap(), vec!["app"]);
    }

    #[tokio::test]
    async fn eviction_removes_only_idle_workspaces() {
        let ctx = context().await;
        let state = &ctx.state;
        let stale = "stale-ws";
        let long_ago = Utc::now() - Duration::hours(2);
        let mut document = Workspace::new(long_ago);
        document.last_active_at = long_ago;
        state.storage.write_workspace(stale, &document).await.unwrap();

        let fresh = &ctx.workspace;

        let evicted = WorkspaceService::new(state).evict_idle().await.unwrap();
        assert_eq!(evicted, vec![stale.to_string()]);
        assert!(state.storage.read_workspace(fresh).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn recent_activity_protects_a_workspace() {
        let ctx = context().await;
        let state = &ctx.state;
        let ws = "busy-ws";
        let long_ago = Utc::now() - Duration::hours(2);
        let mut document = Workspace::new(long_ago);
        document.last_active_at = long_ago;
        state.storage.write_workspace(ws, &document).await.unwrap();
        state.activity.touch(ws);

        let evicted = WorkspaceService::new(state).evict_idle().await.unwrap();
        assert!(evicted.is_empty());
    }

    #[tokio::test]
    async fn persisted_activity_survives_a_restart() {
        let ctx = context().await;
        let state = &ctx.state;
        let ws = ctx.workspace.clone();
        let mut document = state.storage.read_workspace(&ws).await.unwrap().unwrap();
        document.last_active_at = Utc::now() - Duration::hours(2);
        state.storage.write_workspace(&ws, &document).await.unwrap();

        state.sessions.mark_active(&ws).await.unwrap();

        // Same storage, empty in-memory tracker
        let restarted = AppState::new((*state.config).clone(), state.storage.clone());
        let evicted = WorkspaceService::new(&restarted).evict_idle().await.unwrap();
        assert!(evicted.is_empty());
        assert!(restarted.storage.read_workspace(&ws).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn writes_after_delete_leave_nothing_behind() {
        let ctx = context().await;
        let state = &ctx.state;
        let ws = ctx.workspace.clone();
        let repo = Repository::new(state, &ws, "app", "todos").unwrap();
        repo.create(Record::new()).await.unwrap();

        assert!(WorkspaceService::new(state).delete(&ws).await.unwrap());

        let err = repo.create(Record::new()).await.unwrap_err();
        assert!(matches!(err, DataError::Storage(StorageError::NotFound(_))));
        assert!(state.storage.list_workspaces().await.unwrap().is_empty());
        assert!(state.storage.list_containers(&ws).await.unwrap().is_empty());
    }
}
