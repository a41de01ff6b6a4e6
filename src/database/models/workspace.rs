use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Role, Verb};

/// Per-workspace document: session list and selective-auth policy.
/// Containers live in their own documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub auth_policy: AuthPolicy,
}

impl Workspace {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            last_active_at: now,
            sessions: Vec::new(),
            auth_policy: AuthPolicy::default(),
        }
    }
}

/// One login. Only the SHA-256 of the issued token is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub token_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Which methods require a session token on the data surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthPolicy {
    pub get: bool,
    pub post: bool,
    pub put: bool,
    pub patch: bool,
    pub delete: bool,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            get: true,
            post: true,
            put: true,
            patch: true,
            delete: true,
        }
    }
}

impl AuthPolicy {
    pub fn requires_token(&self, verb: Verb) -> bool {
        match verb {
            Verb::Get => self.get,
            Verb::Post => self.post,
            Verb::Put => self.put,
            Verb::Patch => self.patch,
            Verb::Delete => self.delete,
        }
    }

    pub fn set(&mut self, verb: Verb, required: bool) {
        let slot = match verb {
            Verb::Get => &mut self.get,
            Verb::Post => &mut self.post,
            Verb::Put => &mut self.put,
            Verb::Patch => &mut self.patch,
            Verb::Delete => &mut self.delete,
        };
        *slot = required;
    }
}
