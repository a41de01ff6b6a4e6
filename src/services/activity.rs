use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// How stale the persisted `lastActiveAt` may get before a request refreshes it
pub const PERSIST_INTERVAL_SECS: i64 = 60;

/// In-memory last-seen timestamps per workspace, fed by the auth middleware.
/// The eviction sweep falls back to the persisted `lastActiveAt` for
/// workspaces not seen since the process started.
#[derive(Default)]
pub struct ActivityTracker {
    seen: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch(&self, workspace: &str) {
        self.lock().insert(workspace.to_string(), Utc::now());
    }

    pub fn last_seen(&self, workspace: &str) -> Option<DateTime<Utc>> {
        self.lock().get(workspace).copied()
    }

    pub fn forget(&self, workspace: &str) {
        self.lock().remove(workspace);
    }

    pub fn rename(&self, old: &str, new: &str) {
        let mut seen = self.lock();
        if let Some(at) = seen.remove(old) {
            seen.insert(new.to_string(), at);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
