use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use super::{StorageBackend, StorageError};
use crate::database::models::{Container, Workspace};
use crate::types::is_valid_identifier;

const WORKSPACE_FILE: &str = "workspace.json";
const CONTAINERS_DIR: &str = "containers";

/// Directory-per-workspace JSON store:
///
/// ```text
/// <root>/<workspace>/workspace.json
/// <root>/<workspace>/containers/<container>.json
/// ```
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn workspace_dir(&self, workspace: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_identifier(workspace) {
            return Err(StorageError::InvalidIdentifier(workspace.to_string()));
        }
        Ok(self.root.join(workspace))
    }

    fn container_file(&self, workspace: &str, name: &str) -> Result<PathBuf, StorageError> {
        if !is_valid_identifier(name) {
            return Err(StorageError::InvalidIdentifier(name.to_string()));
        }
        Ok(self
            .workspace_dir(workspace)?
            .join(CONTAINERS_DIR)
            .join(format!("{}.json", name)))
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                path: path.display().to_string(),
                source,
            })
    }

    /// Write to a sibling temp file, then rename over the target
    async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::InvalidIdentifier(path.display().to_string()))?;
        fs::create_dir_all(parent).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

        let bytes = serde_json::to_vec_pretty(value)?;
        fs::write(&tmp, &bytes).await?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn list_dir(dir: &Path) -> Result<Vec<(String, bool)>, StorageError> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let is_dir = entry.file_type().await?.is_dir();
            names.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
        }
        Ok(names)
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    fn kind(&self) -> &'static str {
        "file"
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        let meta = fs::metadata(&self.root).await?;
        if !meta.is_dir() {
            return Err(StorageError::NotFound(self.root.display().to_string()));
        }
        Ok(())
    }

    async fn read_workspace(&self, workspace: &str) -> Result<Option<Workspace>, StorageError> {
        let path = self.workspace_dir(workspace)?.join(WORKSPACE_FILE);
        Self::read_json(&path).await
    }

    async fn write_workspace(&self, workspace: &str, document: &Workspace) -> Result<(), StorageError> {
        let path = self.workspace_dir(workspace)?.join(WORKSPACE_FILE);
        Self::write_json(&path, document).await
    }

    async fn list_workspaces(&self) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = Self::list_dir(&self.root)
            .await?
            .into_iter()
            .filter(|(name, is_dir)| *is_dir && is_valid_identifier(name))
            .map(|(name, _)| name)
            .collect();
        names.sort();
        Ok(names)
    }

    async fn read_container(&self, workspace: &str, name: &str) -> Result<Option<Container>, StorageError> {
        let path = self.container_file(workspace, name)?;
        Self::read_json(&path).await
    }

    async fn write_container(&self, workspace: &str, name: &str, container: &Container) -> Result<(), StorageError> {
        let path = self.container_file(workspace, name)?;
        let owner = self.workspace_dir(workspace)?.join(WORKSPACE_FILE);
        if !fs::try_exists(&owner).await? {
            return Err(StorageError::NotFound(format!("Workspace '{}'", workspace)));
        }
        Self::write_json(&path, container).await
    }

    async fn delete_container(&self, workspace: &str, name: &str) -> Result<bool, StorageError> {
        let path = self.container_file(workspace, name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_containers(&self, workspace: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.workspace_dir(workspace)?.join(CONTAINERS_DIR);
        let mut names: Vec<String> = Self::list_dir(&dir)
            .await?
            .into_iter()
            .filter(|(_, is_dir)| !is_dir)
            .filter_map(|(name, _)| name.strip_suffix(".json").map(str::to_string))
            .filter(|name| is_valid_identifier(name))
            .collect();
        names.sort();
        Ok(names)
    }

    async fn delete_workspace(&self, workspace: &str) -> Result<bool, StorageError> {
        let dir = self.workspace_dir(workspace)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn rename_workspace(&self, old: &str, new: &str) -> Result<(), StorageError> {
        let from = self.workspace_dir(old)?;
        let to = self.workspace_dir(new)?;
        if fs::try_exists(&to).await? {
            return Err(StorageError::AlreadyExists(new.to_string()));
        }
        if !fs::try_exists(&from).await? {
            return Err(StorageError::NotFound(old.to_string()));
        }
        // Single directory rename: either everything moves or nothing does
        fs::rename(&from, &to).await?;
        Ok(())
    }
}
