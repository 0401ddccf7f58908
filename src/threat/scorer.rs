//! Per-IP threat scoring and blocking.
//!
//! Suspicious events increment a per-IP counter with a rolling one-hour
//! expiry. Crossing the alert threshold emits an operator alert; crossing
//! the block threshold writes a block record that the IP-block middleware
//! enforces on every subsequent request.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;

use crate::config::ThreatConfig;
use crate::observability::metrics;
use crate::store::{SharedStore, StoreError};
use crate::threat::events::{SecurityEvent, SecuritySignal};

const EVENT_LOG_KEY: &str = "security_events";

fn threat_key(ip: &str) -> String {
    format!("threat:{ip}")
}

fn block_key(ip: &str) -> String {
    format!("blocked_ip:{ip}")
}

pub struct ThreatScorer {
    store: Arc<dyn SharedStore>,
    signals: broadcast::Sender<SecuritySignal>,
    alert_threshold: i64,
    block_threshold: i64,
    counter_ttl: Duration,
    block_ttl: Duration,
    fail_open: bool,
}

impl ThreatScorer {
    pub fn new(
        store: Arc<dyn SharedStore>,
        signals: broadcast::Sender<SecuritySignal>,
        config: &ThreatConfig,
    ) -> Self {
        Self {
            store,
            signals,
            alert_threshold: config.alert_threshold,
            block_threshold: config.block_threshold,
            counter_ttl: Duration::from_secs(config.counter_ttl_secs),
            block_ttl: Duration::from_secs(config.block_ttl_secs),
            fail_open: config.fail_open,
        }
    }

    /// Whether the block middleware admits traffic when the blocklist
    /// lookup fails.
    pub fn fail_open(&self) -> bool {
        self.fail_open
    }

    /// Subscribe to the signal stream. Receivers that lag are dropped by
    /// the broadcast channel, never the senders.
    pub fn subscribe(&self) -> broadcast::Receiver<SecuritySignal> {
        self.signals.subscribe()
    }

    /// Record a security event: persist it, fan it out, and score the
    /// source IP if the event type counts as suspicious.
    ///
    /// The durable write happens off the request path; a slow or down
    /// store must not add latency to every rejected request.
    pub async fn log_security_event(&self, event: SecurityEvent) -> Result<(), StoreError> {
        if let Ok(serialized) = serde_json::to_string(&event) {
            let store = Arc::clone(&self.store);
            tokio::spawn(async move {
                if let Err(err) = store.rpush(EVENT_LOG_KEY, &serialized).await {
                    tracing::warn!(error = %err, "Failed to persist security event");
                }
            });
        }

        // Send fails only when nobody is subscribed, which is fine.
        let _ = self.signals.send(SecuritySignal::Event(event.clone()));

        if event.event_type.is_suspicious() {
            if let Some(ip) = &event.ip {
                self.score_ip(ip).await?;
            }
        }
        Ok(())
    }

    async fn score_ip(&self, ip: &str) -> Result<(), StoreError> {
        let key = threat_key(ip);
        let count = self.store.incr(&key).await?;
        if count == 1 {
            self.store.expire(&key, self.counter_ttl).await?;
        }

        if count == self.block_threshold {
            self.block_ip(ip, "threat threshold exceeded").await?;
        } else if count == self.alert_threshold {
            tracing::warn!(ip = %ip, count, "Suspicious activity alert");
            metrics::record_threat_alert();
            let _ = self.signals.send(SecuritySignal::Alert {
                ip: ip.to_string(),
                count,
            });
        }
        Ok(())
    }

    /// Block an IP for the configured duration.
    pub async fn block_ip(&self, ip: &str, reason: &str) -> Result<(), StoreError> {
        let record = serde_json::json!({
            "reason": reason,
            "blocked_at": Utc::now().to_rfc3339(),
        });
        self.store
            .set_ex(&block_key(ip), &record.to_string(), self.block_ttl)
            .await?;

        tracing::warn!(ip = %ip, reason = %reason, "IP blocked");
        metrics::record_ip_blocked();
        let _ = self.signals.send(SecuritySignal::IpBlocked {
            ip: ip.to_string(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    pub async fn is_ip_blocked(&self, ip: &str) -> Result<bool, StoreError> {
        self.store.exists(&block_key(ip)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::threat::events::SecurityEventType;

    fn scorer_with(config: ThreatConfig) -> (ThreatScorer, broadcast::Receiver<SecuritySignal>) {
        let (tx, rx) = broadcast::channel(64);
        let scorer = ThreatScorer::new(Arc::new(MemoryStore::new()), tx, &config);
        (scorer, rx)
    }

    fn suspicious(ip: &str) -> SecurityEvent {
        SecurityEvent::new(SecurityEventType::SuspiciousActivity).with_ip(ip)
    }

    #[tokio::test]
    async fn alert_fires_exactly_at_the_fifth_event() {
        let (scorer, mut rx) = scorer_with(ThreatConfig::default());

        for _ in 0..5 {
            scorer.log_security_event(suspicious("10.0.0.9")).await.unwrap();
        }

        let mut alerts = 0;
        while let Ok(signal) = rx.try_recv() {
            if let SecuritySignal::Alert { ip, count } = signal {
                assert_eq!(ip, "10.0.0.9");
                assert_eq!(count, 5);
                alerts += 1;
            }
        }
        assert_eq!(alerts, 1);
        assert!(!scorer.is_ip_blocked("10.0.0.9").await.unwrap());
    }

    #[tokio::test]
    async fn tenth_event_blocks_the_ip() {
        let (scorer, mut rx) = scorer_with(ThreatConfig::default());

        for _ in 0..9 {
            scorer.log_security_event(suspicious("10.0.0.7")).await.unwrap();
        }
        assert!(!scorer.is_ip_blocked("10.0.0.7").await.unwrap());

        scorer.log_security_event(suspicious("10.0.0.7")).await.unwrap();
        assert!(scorer.is_ip_blocked("10.0.0.7").await.unwrap());

        let mut blocked = false;
        while let Ok(signal) = rx.try_recv() {
            if let SecuritySignal::IpBlocked { ip, .. } = signal {
                assert_eq!(ip, "10.0.0.7");
                blocked = true;
            }
        }
        assert!(blocked);
    }

    #[tokio::test]
    async fn events_past_the_block_threshold_do_not_re_block() {
        let (scorer, mut rx) = scorer_with(ThreatConfig::default());

        for _ in 0..13 {
            scorer.log_security_event(suspicious("10.0.0.8")).await.unwrap();
        }
        assert!(scorer.is_ip_blocked("10.0.0.8").await.unwrap());

        // One block signal for the tenth event; the block TTL is not
        // restarted by later events.
        let mut blocks = 0;
        while let Ok(signal) = rx.try_recv() {
            if matches!(signal, SecuritySignal::IpBlocked { .. }) {
                blocks += 1;
            }
        }
        assert_eq!(blocks, 1);
    }

    #[tokio::test]
    async fn non_suspicious_events_do_not_score() {
        let (scorer, _rx) = scorer_with(ThreatConfig::default());

        for _ in 0..20 {
            scorer
                .log_security_event(
                    SecurityEvent::new(SecurityEventType::RateLimitExceeded).with_ip("10.0.0.3"),
                )
                .await
                .unwrap();
        }
        assert!(!scorer.is_ip_blocked("10.0.0.3").await.unwrap());
    }

    #[tokio::test]
    async fn ips_score_independently() {
        let (scorer, _rx) = scorer_with(ThreatConfig::default());

        for _ in 0..10 {
            scorer.log_security_event(suspicious("10.0.0.1")).await.unwrap();
        }
        scorer.log_security_event(suspicious("10.0.0.2")).await.unwrap();

        assert!(scorer.is_ip_blocked("10.0.0.1").await.unwrap());
        assert!(!scorer.is_ip_blocked("10.0.0.2").await.unwrap());
    }

    #[tokio::test]
    async fn manual_block_takes_effect_immediately() {
        let (scorer, _rx) = scorer_with(ThreatConfig::default());
        scorer.block_ip("203.0.113.5", "abuse report").await.unwrap();
        assert!(scorer.is_ip_blocked("203.0.113.5").await.unwrap());
    }

    #[tokio::test]
    async fn counter_expires_after_the_window() {
        let config = ThreatConfig {
            counter_ttl_secs: 1,
            ..ThreatConfig::default()
        };
        let (scorer, _rx) = scorer_with(config);

        for _ in 0..9 {
            scorer.log_security_event(suspicious("10.0.0.4")).await.unwrap();
        }
        tokio::time::sleep(std::time::Duration::from_millis(1_100)).await;

        // The window rolled over; one more event starts a fresh count.
        scorer.log_security_event(suspicious("10.0.0.4")).await.unwrap();
        assert!(!scorer.is_ip_blocked("10.0.0.4").await.unwrap());
    }
}
