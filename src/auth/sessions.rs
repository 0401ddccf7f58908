//! Session lifecycle over the shared store.
//!
//! Sessions are keyed `session:{id}` with a per-user index set
//! `user_sessions:{user_id}` for enumeration and bulk revocation. Expiration
//! is sliding: every successful lookup rewrites the record with
//! `last_activity_at = now` and a fresh TTL. Sessions live only in the
//! shared store so every gateway process observes the same state; no
//! in-process caching.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::generate_secure_token;
use crate::error::GatewayError;
use crate::store::SharedStore;

/// One authenticated client binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub device_id: String,
    pub ip: String,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Request metadata captured at login.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub ip: String,
    pub user_agent: String,
    pub device_id: Option<String>,
}

/// Session CRUD against the shared store.
pub struct SessionManager {
    store: Arc<dyn SharedStore>,
    ttl: Duration,
}

fn session_key(id: &str) -> String {
    format!("session:{}", id)
}

fn user_sessions_key(user_id: &str) -> String {
    format!("user_sessions:{}", user_id)
}

impl SessionManager {
    pub fn new(store: Arc<dyn SharedStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Create a session with a cryptographically random 32-byte id, store it
    /// with the configured TTL, and index it under the user's active set.
    pub async fn create_session(
        &self,
        user_id: &str,
        ctx: SessionContext,
    ) -> Result<Session, GatewayError> {
        let now = Utc::now();
        let session = Session {
            id: generate_secure_token(32),
            user_id: user_id.to_string(),
            device_id: ctx
                .device_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            ip: ctx.ip,
            user_agent: ctx.user_agent,
            created_at: now,
            last_activity_at: now,
            expires_at: now + chrono::Duration::from_std(self.ttl).unwrap_or_default(),
        };

        self.write(&session).await?;
        self.store
            .sadd(&user_sessions_key(user_id), &session.id)
            .await?;
        self.store
            .expire(&user_sessions_key(user_id), self.ttl)
            .await?;

        tracing::info!(
            user_id = %user_id,
            session_id = %session.id,
            device_id = %session.device_id,
            "Created session"
        );
        Ok(session)
    }

    /// Look up a session. On hit, refreshes `last_activity_at` and re-extends
    /// the TTL (sliding expiration). On miss, returns `None` without side
    /// effects.
    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>, GatewayError> {
        let Some(raw) = self.store.get(&session_key(session_id)).await? else {
            return Ok(None);
        };
        let Ok(mut session) = serde_json::from_str::<Session>(&raw) else {
            tracing::warn!(session_id = %session_id, "Dropping unreadable session record");
            self.store.del(&session_key(session_id)).await?;
            return Ok(None);
        };

        let now = Utc::now();
        session.last_activity_at = now;
        session.expires_at = now + chrono::Duration::from_std(self.ttl).unwrap_or_default();
        self.write(&session).await?;
        // The per-user index must slide along with the record, or a session
        // kept alive past the original TTL would escape bulk revocation.
        self.store
            .expire(&user_sessions_key(&session.user_id), self.ttl)
            .await?;

        Ok(Some(session))
    }

    /// Remove a session and its index entry. Idempotent.
    pub async fn invalidate_session(&self, session_id: &str) -> Result<(), GatewayError> {
        let user_id = match self.read_raw(session_id).await? {
            Some(session) => Some(session.user_id),
            None => None,
        };

        self.store.del(&session_key(session_id)).await?;
        if let Some(user_id) = user_id {
            self.store
                .srem(&user_sessions_key(&user_id), session_id)
                .await?;
            tracing::info!(user_id = %user_id, session_id = %session_id, "Invalidated session");
        }
        Ok(())
    }

    /// Delete every session in the user's active set, then clear the set.
    /// Used on password change and account deletion.
    pub async fn invalidate_all_user_sessions(&self, user_id: &str) -> Result<(), GatewayError> {
        let ids = self.store.smembers(&user_sessions_key(user_id)).await?;
        for id in &ids {
            self.store.del(&session_key(id)).await?;
        }
        self.store.del(&user_sessions_key(user_id)).await?;
        tracing::info!(user_id = %user_id, count = ids.len(), "Invalidated all sessions");
        Ok(())
    }

    /// All live sessions for a user, most recently active first. Index
    /// entries whose record has already expired are silently skipped, not
    /// repaired.
    pub async fn get_user_sessions(&self, user_id: &str) -> Result<Vec<Session>, GatewayError> {
        let ids = self.store.smembers(&user_sessions_key(user_id)).await?;
        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(session) = self.read_raw(&id).await? {
                sessions.push(session);
            }
        }
        sessions.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(sessions)
    }

    /// Read without refreshing the TTL. Enumeration and revocation must not
    /// extend session lifetimes.
    async fn read_raw(&self, session_id: &str) -> Result<Option<Session>, GatewayError> {
        let Some(raw) = self.store.get(&session_key(session_id)).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&raw).ok())
    }

    async fn write(&self, session: &Session) -> Result<(), GatewayError> {
        let raw = serde_json::to_string(session)
            .map_err(|e| GatewayError::Config(format!("session serialization failed: {}", e)))?;
        self.store
            .set_ex(&session_key(&session.id), &raw, self.ttl)
            .await?;
        Ok(())
    }
}
