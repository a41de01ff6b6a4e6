use std::sync::Arc;
use tempfile::TempDir;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::storage::{FileBackend, StorageBackend};

/// Unit-test fixture: an `AppState` over a throwaway file backend with one
/// registered workspace. The data directory lives as long as the context.
pub struct TestContext {
    pub state: AppState,
    pub workspace: String,
    _dir: TempDir,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_config(AppConfig::development()).await
    }

    pub async fn with_config(config: AppConfig) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let storage: Arc<dyn StorageBackend> = Arc::new(FileBackend::open(dir.path()).await?);
        let state = AppState::new(config, storage);
        let workspace = state.sessions.register().await?;

        Ok(Self {
            state,
            workspace,
            _dir: dir,
        })
    }
}
