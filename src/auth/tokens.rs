//! Bearer token issuing and verification.
//!
//! Tokens are HS256-signed, time-boxed claim sets. A token is accepted only
//! when its signature and expiry check out, it is not blacklisted, and any
//! session it is bound to still resolves to a live record in the shared
//! store.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::permissions::Role;
use crate::auth::sessions::SessionManager;
use crate::crypto::CryptoEnvelope;
use crate::error::GatewayError;
use crate::store::SharedStore;

/// Whether a token grants API access or only a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims carried by a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    /// User id.
    pub sub: String,
    pub role: Role,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Token lifetimes, from configuration.
#[derive(Debug, Clone, Copy)]
pub struct TokenTtls {
    pub access: chrono::Duration,
    pub refresh: chrono::Duration,
}

/// Issues and verifies bearer tokens, cross-checking the session store and
/// the blacklist.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttls: TokenTtls,
    store: Arc<dyn SharedStore>,
    sessions: Arc<SessionManager>,
    crypto: Arc<CryptoEnvelope>,
}

impl TokenService {
    pub fn new(
        secret: &str,
        ttls: TokenTtls,
        store: Arc<dyn SharedStore>,
        sessions: Arc<SessionManager>,
        crypto: Arc<CryptoEnvelope>,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttls,
            store,
            sessions,
            crypto,
        }
    }

    /// Sign a new token for the user, optionally bound to a session.
    pub fn issue_token(
        &self,
        user_id: &str,
        role: Role,
        token_type: TokenType,
        session_id: Option<String>,
    ) -> Result<String, GatewayError> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.ttls.access,
            TokenType::Refresh => self.ttls.refresh,
        };
        let payload = TokenPayload {
            sub: user_id.to_string(),
            role,
            token_type,
            session_id,
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &payload, &self.encoding_key)
            .map_err(|e| GatewayError::Config(format!("token signing failed: {}", e)))
    }

    /// Verify signature and expiry, reject blacklisted tokens, and require
    /// that any bound session still exists. The session lookup refreshes the
    /// session's sliding TTL as a side effect.
    pub async fn verify_token(&self, token: &str) -> Result<TokenPayload, GatewayError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<TokenPayload>(token, &self.decoding_key, &validation)
            .map_err(|_| GatewayError::Authentication("invalid or expired token".into()))?;
        let payload = data.claims;

        if self.store.exists(&self.blacklist_key(token)).await? {
            return Err(GatewayError::Authentication("token has been revoked".into()));
        }

        if let Some(session_id) = &payload.session_id {
            if self.sessions.get_session(session_id).await?.is_none() {
                return Err(GatewayError::Authentication("session no longer exists".into()));
            }
        }

        Ok(payload)
    }

    /// Blacklist a token for the remainder of its lifetime. Used on logout
    /// and refresh-token rotation.
    pub async fn blacklist_token(&self, token: &str) -> Result<(), GatewayError> {
        // Accept expired-signature-valid tokens here: blacklisting an
        // already-expired token is a no-op either way.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;

        let data = decode::<TokenPayload>(token, &self.decoding_key, &validation)
            .map_err(|_| GatewayError::Authentication("invalid token".into()))?;

        let remaining = data.claims.exp - Utc::now().timestamp();
        if remaining <= 0 {
            return Ok(());
        }

        self.store
            .set_ex(
                &self.blacklist_key(token),
                "1",
                std::time::Duration::from_secs(remaining as u64),
            )
            .await?;
        tracing::info!(user_id = %data.claims.sub, "Blacklisted token");
        Ok(())
    }

    /// Blacklist keys are derived from a salted hash so raw tokens never
    /// appear as store keys.
    fn blacklist_key(&self, token: &str) -> String {
        format!("blacklist:{}", self.crypto.hash_data(token))
    }
}
