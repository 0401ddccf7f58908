//! Account lockout on repeated failed logins.
//!
//! Failed attempts are counted per account in the shared store with a
//! rolling window; reaching the limit locks the account for a fixed
//! duration. While locked, every login attempt is rejected with a lockout
//! error, deliberately distinct from a bad-credentials error, before any
//! credential check runs.

use std::sync::Arc;
use std::time::Duration;

use crate::error::GatewayError;
use crate::store::SharedStore;

pub struct LoginGuard {
    store: Arc<dyn SharedStore>,
    max_failures: i64,
    window: Duration,
    lock_duration: Duration,
}

fn failures_key(account: &str) -> String {
    format!("login_failures:{}", account)
}

fn lock_key(account: &str) -> String {
    format!("account_lock:{}", account)
}

impl LoginGuard {
    pub fn new(
        store: Arc<dyn SharedStore>,
        max_failures: i64,
        window: Duration,
        lock_duration: Duration,
    ) -> Self {
        Self {
            store,
            max_failures,
            window,
            lock_duration,
        }
    }

    /// Fails with [`GatewayError::AccountLocked`] when the account is locked.
    /// Call before checking credentials.
    pub async fn check(&self, account: &str) -> Result<(), GatewayError> {
        if self.store.exists(&lock_key(account)).await? {
            let retry_after = self
                .store
                .ttl(&lock_key(account))
                .await?
                .unwrap_or(self.lock_duration)
                .as_secs();
            return Err(GatewayError::AccountLocked { retry_after });
        }
        Ok(())
    }

    /// Record one failed attempt. Returns `true` when this failure locked
    /// the account.
    pub async fn record_failure(&self, account: &str) -> Result<bool, GatewayError> {
        let count = self.store.incr(&failures_key(account)).await?;
        if count == 1 {
            self.store.expire(&failures_key(account), self.window).await?;
        }

        if count >= self.max_failures {
            self.store
                .set_ex(&lock_key(account), "1", self.lock_duration)
                .await?;
            tracing::warn!(account = %account, failures = count, "Account locked");
            return Ok(true);
        }
        Ok(false)
    }

    /// Clear the failure counter after a successful login.
    pub async fn clear(&self, account: &str) -> Result<(), GatewayError> {
        self.store.del(&failures_key(account)).await?;
        Ok(())
    }
}
