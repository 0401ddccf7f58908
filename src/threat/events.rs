//! Security event types carried through the signal channel and the
//! durable event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a security-relevant occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventType {
    Access,
    FailedLogin,
    SuspiciousActivity,
    PermissionDenied,
    RateLimitExceeded,
    TokenBlacklisted,
    IpBlocked,
    AccountLocked,
}

impl SecurityEventType {
    /// Whether events of this type count toward the per-IP threat score.
    pub fn is_suspicious(&self) -> bool {
        matches!(
            self,
            SecurityEventType::FailedLogin | SecurityEventType::SuspiciousActivity
        )
    }
}

/// One security event, serialized as-is into the durable log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    #[serde(rename = "type")]
    pub event_type: SecurityEventType,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl SecurityEvent {
    pub fn new(event_type: SecurityEventType) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            ip: None,
            user_id: None,
            user_agent: None,
            details: None,
        }
    }

    pub fn with_ip(mut self, ip: &str) -> Self {
        self.ip = Some(ip.to_string());
        self
    }

    pub fn with_user_id(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Notification broadcast to in-process subscribers (alerting, audit).
#[derive(Debug, Clone)]
pub enum SecuritySignal {
    /// Every logged event, fanned out as-is.
    Event(SecurityEvent),
    /// An IP crossed the alert threshold but is not yet blocked.
    Alert { ip: String, count: i64 },
    /// An IP was blocked.
    IpBlocked { ip: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_serializes_snake_case() {
        let event = SecurityEvent::new(SecurityEventType::FailedLogin).with_ip("10.0.0.1");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "failed_login");
        assert_eq!(json["ip"], "10.0.0.1");
        assert!(json.get("user_id").is_none());
    }

    #[test]
    fn only_login_and_suspicious_events_score() {
        assert!(SecurityEventType::FailedLogin.is_suspicious());
        assert!(SecurityEventType::SuspiciousActivity.is_suspicious());
        assert!(!SecurityEventType::Access.is_suspicious());
        assert!(!SecurityEventType::RateLimitExceeded.is_suspicious());
        assert!(!SecurityEventType::PermissionDenied.is_suspicious());
    }
}
