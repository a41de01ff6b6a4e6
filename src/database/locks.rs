use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// What a write lock protects: one container document, or the workspace document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    Workspace(String),
    Container(String, String),
}

/// Per-key async locks serialising read-modify-write cycles.
///
/// Concurrent writers to the same container queue up instead of interleaving;
/// writers to different containers never block each other, and readers never
/// take a lock at all. Container writers also hold their workspace lock in
/// shared mode, so rotating or deleting a workspace waits for them to finish.
#[derive(Default)]
pub struct WriteLocks {
    entries: Mutex<HashMap<LockKey, Arc<RwLock<()>>>>,
}

pub type WriteGuard = OwnedRwLockWriteGuard<()>;
pub type SharedGuard = OwnedRwLockReadGuard<()>;

impl WriteLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn container(&self, workspace: &str, container: &str) -> WriteGuard {
        self.entry(LockKey::Container(workspace.to_string(), container.to_string()))
            .write_owned()
            .await
    }

    /// Exclusive: workspace document edits, rotation and deletion
    pub async fn workspace(&self, workspace: &str) -> WriteGuard {
        self.entry(LockKey::Workspace(workspace.to_string())).write_owned().await
    }

    /// Held alongside a container lock; take it first
    pub async fn workspace_shared(&self, workspace: &str) -> SharedGuard {
        self.entry(LockKey::Workspace(workspace.to_string())).read_owned().await
    }

    fn entry(&self, key: LockKey) -> Arc<RwLock<()>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.entry(key).or_default().clone()
    }

    /// Drop entries nobody holds or waits on
    pub fn prune(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
