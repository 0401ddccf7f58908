//! Request payload scanning for common injection patterns.
//!
//! Pattern matching over string leaves of a JSON document. This is a
//! first-line screen feeding the threat scorer, not a substitute for
//! parameterized queries and output encoding in the backends.

use regex::RegexSet;

use crate::config::ThreatConfig;

/// Patterns matched case-insensitively against every string value.
const SUSPICIOUS_PATTERNS: &[&str] = &[
    // SQL injection probes.
    r"(?i)\b(union\s+select|select\s+.+\s+from|insert\s+into|delete\s+from|drop\s+table|drop\s+database)\b",
    r"(?i)('\s*or\s+'?\d+'?\s*=\s*'?\d+|--\s*$|;\s*--)",
    // Script injection.
    r"(?i)<\s*script",
    r"(?i)\bon\w+\s*=",
    r"(?i)javascript\s*:",
    // Path traversal.
    r"\.\./",
];

const PATTERN_NAMES: &[&str] = &[
    "sql_keywords",
    "sql_tautology",
    "script_tag",
    "event_handler",
    "javascript_uri",
    "path_traversal",
];

pub struct InputValidator {
    patterns: RegexSet,
    max_payload_length: usize,
}

impl InputValidator {
    pub fn new(config: &ThreatConfig) -> Self {
        let patterns =
            RegexSet::new(SUSPICIOUS_PATTERNS).expect("suspicious patterns must compile");
        Self {
            patterns,
            max_payload_length: config.max_payload_length,
        }
    }

    /// Scan a JSON payload. Returns the names of every matched pattern;
    /// an oversized payload is itself a finding and is not scanned further.
    pub fn validate(&self, payload: &serde_json::Value) -> Vec<String> {
        let serialized = payload.to_string();
        if serialized.chars().count() > self.max_payload_length {
            return vec!["payload_too_large".to_string()];
        }

        let mut findings = Vec::new();
        self.scan_value(payload, &mut findings);
        findings.sort();
        findings.dedup();
        findings
    }

    fn scan_value(&self, value: &serde_json::Value, findings: &mut Vec<String>) {
        match value {
            serde_json::Value::String(s) => {
                for index in self.patterns.matches(s) {
                    findings.push(PATTERN_NAMES[index].to_string());
                }
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    self.scan_value(item, findings);
                }
            }
            serde_json::Value::Object(map) => {
                for (key, item) in map {
                    // Keys are attacker-controlled too.
                    for index in self.patterns.matches(key) {
                        findings.push(PATTERN_NAMES[index].to_string());
                    }
                    self.scan_value(item, findings);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validator() -> InputValidator {
        InputValidator::new(&ThreatConfig::default())
    }

    #[test]
    fn clean_payload_passes() {
        let findings = validator().validate(&json!({
            "name": "Bánh Mì Palace",
            "address": "42 Elm St, Apt 3",
            "notes": "extra onions; no cilantro",
        }));
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[test]
    fn detects_sql_injection() {
        let findings = validator().validate(&json!({
            "q": "1' UNION SELECT password FROM users",
        }));
        assert!(findings.contains(&"sql_keywords".to_string()));
    }

    #[test]
    fn detects_script_and_event_handlers() {
        let v = validator();
        assert!(v
            .validate(&json!({"bio": "<script>alert(1)</script>"}))
            .contains(&"script_tag".to_string()));
        assert!(v
            .validate(&json!({"bio": "<img src=x onerror=alert(1)>"}))
            .contains(&"event_handler".to_string()));
        assert!(v
            .validate(&json!({"url": "javascript:void(0)"}))
            .contains(&"javascript_uri".to_string()));
    }

    #[test]
    fn detects_path_traversal_in_nested_values_and_keys() {
        let v = validator();
        let findings = v.validate(&json!({
            "files": [{"path": "../../etc/passwd"}],
        }));
        assert!(findings.contains(&"path_traversal".to_string()));

        let findings = v.validate(&json!({ "../x": "value" }));
        assert!(findings.contains(&"path_traversal".to_string()));
    }

    #[test]
    fn oversized_payload_is_rejected_outright() {
        let v = validator();
        let big = "a".repeat(10_001);
        assert_eq!(
            v.validate(&json!({ "blob": big })),
            vec!["payload_too_large".to_string()]
        );
    }

    #[test]
    fn duplicate_findings_collapse() {
        let findings = validator().validate(&json!({
            "a": "../one",
            "b": "../two",
        }));
        assert_eq!(findings, vec!["path_traversal".to_string()]);
    }
}
