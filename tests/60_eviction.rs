mod common;

use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use common::TestServer;
use mockdb_api::services::WorkspaceService;
use mockdb_api::AppState;
use reqwest::StatusCode;

async fn backdate(server: &TestServer, workspace: &str) -> Result<()> {
    let storage = &server.state.storage;
    let mut document = storage
        .read_workspace(workspace)
        .await?
        .ok_or_else(|| anyhow!("workspace {} missing", workspace))?;
    document.last_active_at = Utc::now() - Duration::hours(2);
    storage.write_workspace(workspace, &document).await?;
    Ok(())
}

#[tokio::test]
async fn requests_keep_a_workspace_alive_across_restarts() -> Result<()> {
    let server = TestServer::start_with(|config| config.eviction.idle_secs = 3600).await?;
    let busy = server.register().await?;
    let quiet = server.register().await?;
    backdate(&server, &busy).await?;
    backdate(&server, &quiet).await?;

    let res = server
        .client
        .get(server.url("/containers"))
        .header("x-user-id", &busy)
        .header("x-api-key", &busy)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // Fresh process state over the same data directory
    let restarted = AppState::new((*server.state.config).clone(), server.state.storage.clone());
    let evicted = WorkspaceService::new(&restarted).evict_idle().await?;
    assert_eq!(evicted, vec![quiet]);
    assert!(restarted.storage.read_workspace(&busy).await?.is_some());
    Ok(())
}
