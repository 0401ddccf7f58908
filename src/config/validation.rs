//! Configuration validation.
//!
//! Serde handles the syntactic side; this module checks semantics: value
//! ranges, key material shape, and referential sanity of service entries.
//! All errors are collected, not just the first.

use std::fmt;

use crate::config::schema::GatewayConfig;

/// A single semantic configuration problem.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Validate a parsed configuration. Pure function, run before the config is
/// accepted into the system.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(err("listener.bind_address", "not a valid socket address"));
    }

    if config.auth.jwt_secret.trim().is_empty() {
        errors.push(err("auth.jwt_secret", "must not be empty"));
    }
    if config.auth.access_token_ttl_mins <= 0 {
        errors.push(err("auth.access_token_ttl_mins", "must be positive"));
    }
    if config.auth.session_ttl_days == 0 {
        errors.push(err("auth.session_ttl_days", "must be positive"));
    }
    if config.auth.lockout_max_failures <= 0 {
        errors.push(err("auth.lockout_max_failures", "must be positive"));
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(err("rate_limit.window_secs", "must be positive"));
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(err("rate_limit.max_requests", "must be positive"));
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(err("circuit_breaker.failure_threshold", "must be positive"));
    }
    if config.circuit_breaker.reset_timeout_secs == 0 {
        errors.push(err("circuit_breaker.reset_timeout_secs", "must be positive"));
    }

    if config.threat.block_threshold < config.threat.alert_threshold {
        errors.push(err(
            "threat.block_threshold",
            "must be >= threat.alert_threshold",
        ));
    }

    match hex::decode(&config.crypto.key_hex) {
        Ok(key) if key.len() == 32 => {}
        Ok(_) => errors.push(err("crypto.key_hex", "must decode to exactly 32 bytes")),
        Err(_) => errors.push(err("crypto.key_hex", "not valid hex")),
    }

    for service in &config.services {
        if service.name.is_empty() {
            errors.push(err("services.name", "must not be empty"));
        }
        if service.instances.is_empty() {
            errors.push(err(
                "services.instances",
                format!("service '{}' has no instances", service.name),
            ));
        }
        for instance in &service.instances {
            if url::Url::parse(instance).is_err() {
                errors.push(err(
                    "services.instances",
                    format!("'{}' is not a valid URL", instance),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServiceConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn rejects_short_crypto_key() {
        let mut config = GatewayConfig::default();
        config.crypto.key_hex = "aabbcc".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "crypto.key_hex"));
    }

    #[test]
    fn rejects_service_without_instances() {
        let mut config = GatewayConfig::default();
        config.services.push(ServiceConfig {
            name: "orders".into(),
            instances: vec![],
        });
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("orders")));
    }

    #[test]
    fn collects_multiple_errors() {
        let mut config = GatewayConfig::default();
        config.rate_limit.window_secs = 0;
        config.circuit_breaker.failure_threshold = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 2);
    }
}
