//! Storage backends. A workspace owns one workspace document (sessions and
//! auth policy) and one document per container. Both backends implement the
//! same trait and the rest of the service never branches on which is active.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::{StorageConfig, StorageKind};
use crate::database::models::{Container, Workspace};

pub mod file;
pub mod postgres;

pub use file::FileBackend;
pub use postgres::PostgresBackend;

/// Errors from storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Corrupt document {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Short backend name for logs and the health endpoint
    fn kind(&self) -> &'static str;

    async fn health_check(&self) -> Result<(), StorageError>;

    async fn read_workspace(&self, workspace: &str) -> Result<Option<Workspace>, StorageError>;

    async fn write_workspace(&self, workspace: &str, document: &Workspace) -> Result<(), StorageError>;

    async fn list_workspaces(&self) -> Result<Vec<String>, StorageError>;

    /// Missing containers are `Ok(None)`, never an error
    async fn read_container(&self, workspace: &str, name: &str) -> Result<Option<Container>, StorageError>;

    /// Atomic replace: readers see either the old or the new document
    async fn write_container(&self, workspace: &str, name: &str, container: &Container) -> Result<(), StorageError>;

    /// Returns false when the container did not exist
    async fn delete_container(&self, workspace: &str, name: &str) -> Result<bool, StorageError>;

    async fn list_containers(&self, workspace: &str) -> Result<Vec<String>, StorageError>;

    /// Irreversibly removes the workspace document and every container.
    /// Returns false when the workspace did not exist.
    async fn delete_workspace(&self, workspace: &str) -> Result<bool, StorageError>;

    /// All-or-nothing move of everything owned by `old` to `new`.
    /// Fails with `AlreadyExists` when `new` is taken.
    async fn rename_workspace(&self, old: &str, new: &str) -> Result<(), StorageError>;
}

/// Build the configured backend and verify it is reachable.
/// Callers treat an error here as fatal.
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>, StorageError> {
    let backend: Arc<dyn StorageBackend> = match config.backend {
        StorageKind::File => Arc::new(FileBackend::open(&config.data_dir).await?),
        StorageKind::Postgres => Arc::new(PostgresBackend::connect(config).await?),
    };
    backend.health_check().await?;
    info!("Storage backend ready: {}", backend.kind());
    Ok(backend)
}
