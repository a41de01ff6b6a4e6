#![allow(dead_code)]

use anyhow::{anyhow, Context, Result};
use mockdb_api::config::AppConfig;
use mockdb_api::storage::{FileBackend, StorageBackend};
use mockdb_api::AppState;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A server bound to a free local port, serving from a throwaway data dir.
/// Each test gets its own, so workspaces never leak between tests.
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    /// Shared with the running server; lets tests reach storage directly
    pub state: AppState,
    handle: JoinHandle<()>,
    _dir: TempDir,
}

/// A registered workspace plus a token for it
pub struct Session {
    pub workspace: String,
    pub token: String,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with(|_| {}).await
    }

    pub async fn start_with(configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let dir = tempfile::tempdir()?;

        let mut config = AppConfig::development();
        config.storage.data_dir = dir.path().to_path_buf();
        config.security.jwt_secret = "integration-test-secret".to_string();
        configure(&mut config);

        let storage: Arc<dyn StorageBackend> = Arc::new(FileBackend::open(dir.path()).await?);
        let state = AppState::new(config, storage);

        let port = portpicker::pick_unused_port().ok_or_else(|| anyhow!("no free port"))?;
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("binding port {}", port))?;

        let app = mockdb_api::app(state.clone());
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: Client::new(),
            state,
            handle,
            _dir: dir,
        };
        server.wait_ready().await?;
        Ok(server)
    }

    async fn wait_ready(&self) -> Result<()> {
        for _ in 0..50 {
            if let Ok(res) = self.client.get(self.url("/health")).send().await {
                if res.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Err(anyhow!("server did not become ready at {}", self.base_url))
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn register(&self) -> Result<String> {
        let res = self.client.post(self.url("/auth/register")).send().await?;
        if res.status() != StatusCode::CREATED {
            return Err(anyhow!("register failed: {}", res.status()));
        }
        let body: Value = res.json().await?;
        body["workspaceId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("no workspaceId in {}", body))
    }

    pub async fn login(&self, workspace: &str, role: &str, expires_in: Option<i64>) -> Result<String> {
        let mut payload = json!({ "role": role });
        if let Some(ms) = expires_in {
            payload["expiresIn"] = json!(ms);
        }

        let res = self
            .client
            .post(self.url("/auth/login"))
            .header("x-user-id", workspace)
            .json(&payload)
            .send()
            .await?;
        if res.status() != StatusCode::OK {
            return Err(anyhow!("login failed: {} {}", res.status(), res.text().await?));
        }
        let body: Value = res.json().await?;
        body["token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("no token in {}", body))
    }

    /// Fresh workspace with an admin token
    pub async fn admin(&self) -> Result<Session> {
        let workspace = self.register().await?;
        let token = self.login(&workspace, "admin", None).await?;
        Ok(Session { workspace, token })
    }

    pub fn get(&self, session: &Session, path: &str) -> RequestBuilder {
        session.sign(self.client.get(self.url(path)))
    }

    pub fn post(&self, session: &Session, path: &str) -> RequestBuilder {
        session.sign(self.client.post(self.url(path)))
    }

    pub fn put(&self, session: &Session, path: &str) -> RequestBuilder {
        session.sign(self.client.put(self.url(path)))
    }

    pub fn patch(&self, session: &Session, path: &str) -> RequestBuilder {
        session.sign(self.client.patch(self.url(path)))
    }

    pub fn delete(&self, session: &Session, path: &str) -> RequestBuilder {
        session.sign(self.client.delete(self.url(path)))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl Session {
    pub fn sign(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("x-user-id", &self.workspace)
            .bearer_auth(&self.token)
    }

    pub fn with_token(&self, token: impl Into<String>) -> Session {
        Session {
            workspace: self.workspace.clone(),
            token: token.into(),
        }
    }
}
