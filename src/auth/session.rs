use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::{decode_jwt, generate_jwt, hash_token, Claims, JwtError};
use crate::database::locks::WriteLocks;
use crate::database::models::{AuthPolicy, Session, Workspace};
use crate::storage::{StorageBackend, StorageError};
use crate::types::{Role, Verb};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Unknown workspace")]
    UnknownWorkspace,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Token handed out by `login`
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub session_id: Uuid,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Workspace registration, login and token validation
pub struct SessionStore {
    storage: Arc<dyn StorageBackend>,
    locks: Arc<WriteLocks>,
    secret: String,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn StorageBackend>, locks: Arc<WriteLocks>, secret: String) -> Self {
        Self { storage, locks, secret }
    }

    /// Allocate a fresh workspace with no sessions
    pub async fn register(&self) -> Result<String, SessionError> {
        let workspace_id = loop {
            let candidate = Uuid::new_v4().to_string();
            if self.storage.read_workspace(&candidate).await?.is_none() {
                break candidate;
            }
        };

        self.storage
            .write_workspace(&workspace_id, &Workspace::new(Utc::now()))
            .await?;
        info!("Registered workspace {}", workspace_id);
        Ok(workspace_id)
    }

    /// Append a session to the workspace and sign a token for it.
    /// Any number of sessions may be live at once.
    pub async fn login(&self, workspace: &str, role: Role, ttl: Duration) -> Result<IssuedToken, SessionError> {
        let _guard = self.locks.workspace(workspace).await;
        let mut document = self
            .storage
            .read_workspace(workspace)
            .await?
            .ok_or(SessionError::UnknownWorkspace)?;

        let now = Utc::now();
        let expires_at = now + ttl;
        let session_id = Uuid::new_v4();
        let token = generate_jwt(&Claims::new(session_id, role, now, expires_at), &self.secret)?;

        document.sessions.push(Session {
            id: session_id,
            token_hash: hash_token(&token),
            role,
            created_at: now,
            expires_at,
        });
        document.last_active_at = now;
        self.storage.write_workspace(workspace, &document).await?;

        debug!("Issued {} session {} for workspace {}", role.as_str(), session_id, workspace);
        Ok(IssuedToken {
            token,
            session_id,
            role,
            expires_at,
        })
    }

    pub async fn validate(&self, workspace: &str, token: &str) -> Result<Session, SessionError> {
        let document = self
            .storage
            .read_workspace(workspace)
            .await?
            .ok_or(SessionError::UnknownWorkspace)?;
        self.validate_in(&document, token)
    }

    /// Valid iff the signature checks out, the session exists in this
    /// workspace with a matching token hash, and it has not expired yet.
    pub fn validate_in(&self, document: &Workspace, token: &str) -> Result<Session, SessionError> {
        let claims = decode_jwt(token, &self.secret).map_err(|_| SessionError::InvalidToken)?;
        let token_hash = hash_token(token);

        let session = document
            .sessions
            .iter()
            .find(|s| s.id == claims.sid && s.token_hash == token_hash)
            .ok_or(SessionError::InvalidToken)?;

        if Utc::now() >= session.expires_at {
            return Err(SessionError::TokenExpired);
        }
        Ok(session.clone())
    }

    /// Persist `lastActiveAt = now` so idle eviction survives a restart.
    /// A workspace deleted or rotated in the meantime is left alone.
    pub async fn mark_active(&self, workspace: &str) -> Result<(), SessionError> {
        let _guard = self.locks.workspace(workspace).await;
        let mut document = self
            .storage
            .read_workspace(workspace)
            .await?
            .ok_or(SessionError::UnknownWorkspace)?;

        document.last_active_at = Utc::now();
        self.storage.write_workspace(workspace, &document).await?;
        Ok(())
    }

    pub async fn update_policy(&self, workspace: &str, changes: &[(Verb, bool)]) -> Result<AuthPolicy, SessionError> {
        let _guard = self.locks.workspace(workspace).await;
        let mut document = self
            .storage
            .read_workspace(workspace)
            .await?
            .ok_or(SessionError::UnknownWorkspace)?;

        for (verb, required) in changes {
            document.auth_policy.set(*verb, *required);
        }
        self.storage.write_workspace(workspace, &document).await?;
        Ok(document.auth_policy)
    }
}
