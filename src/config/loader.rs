//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::validate_config;
use crate::error::GatewayError;

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, GatewayError> {
    let content = fs::read_to_string(path)
        .map_err(|e| GatewayError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    let config: GatewayConfig = toml::from_str(&content)
        .map_err(|e| GatewayError::Config(format!("failed to parse {}: {}", path.display(), e)))?;

    validate_config(&config).map_err(|errors| {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        GatewayError::Config(format!("validation failed: {}", joined))
    })?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_minimal_config() {
        let dir = std::env::temp_dir().join("reskflow-gateway-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("gateway.toml");
        std::fs::write(
            &path,
            r#"
[listener]
bind_address = "127.0.0.1:8080"

[[services]]
name = "orders"
instances = ["http://127.0.0.1:3001"]
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
        assert_eq!(config.services.len(), 1);
        assert_eq!(config.rate_limit.max_requests, 100);
    }

    #[test]
    fn rejects_invalid_values() {
        let dir = std::env::temp_dir().join("reskflow-gateway-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "[rate_limit]\nwindow_secs = 0\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
