//! Compiled, immutable validation rules.
//!
//! Built once from [`SecurityConfig`] at startup and shared read-only by every
//! validator clone. A bad regex is a configuration error here, never a
//! validation-time failure.

use super::dialect::Dialect;
use super::injection::InjectionDetector;
use crate::config::SecurityConfig;
use crate::error::GateError;
use std::collections::HashMap;

/// Keyword, pattern and allow-list rules for every dialect.
#[derive(Debug)]
pub struct ValidationRules {
    sensitive_keywords: Vec<String>,
    injection: InjectionDetector,
    allowed_operations: HashMap<Dialect, Vec<String>>,
    mongo_denied_operations: Vec<String>,
    max_query_length: usize,
}

impl ValidationRules {
    /// Compile rules from configuration.
    pub fn from_config(config: &SecurityConfig) -> Result<Self, GateError> {
        if config.max_query_length == 0 {
            return Err(GateError::config("max_query_length must be greater than zero"));
        }

        let injection = InjectionDetector::compile(&config.injection_patterns)?;

        let allowed_operations = config
            .allowed_operations
            .iter()
            .map(|(dialect, ops)| (*dialect, normalize_tokens(ops)))
            .collect();

        let mongo_denied_operations = config
            .mongo_denied_operations
            .iter()
            .map(|op| op.trim().to_string())
            .filter(|op| !op.is_empty())
            .collect();

        Ok(Self {
            sensitive_keywords: normalize_tokens(&config.sensitive_keywords),
            injection,
            allowed_operations,
            mongo_denied_operations,
            max_query_length: config.max_query_length,
        })
    }

    /// Uppercase sensitive keywords, in configured order.
    pub fn sensitive_keywords(&self) -> &[String] {
        &self.sensitive_keywords
    }

    pub fn injection(&self) -> &InjectionDetector {
        &self.injection
    }

    /// Uppercase allowed leading operations for a dialect.
    pub fn allowed_operations(&self, dialect: Dialect) -> &[String] {
        self.allowed_operations
            .get(&dialect)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn mongo_denied_operations(&self) -> &[String] {
        &self.mongo_denied_operations
    }

    pub fn max_query_length(&self) -> usize {
        self.max_query_length
    }
}

impl Default for ValidationRules {
    fn default() -> Self {
        let config = SecurityConfig::default();
        Self {
            sensitive_keywords: normalize_tokens(&config.sensitive_keywords),
            injection: InjectionDetector::default(),
            allowed_operations: config
                .allowed_operations
                .iter()
                .map(|(dialect, ops)| (*dialect, normalize_tokens(ops)))
                .collect(),
            mongo_denied_operations: config.mongo_denied_operations,
            max_query_length: config.max_query_length,
        }
    }
}

/// Trim, uppercase and deduplicate tokens, keeping first-seen order.
fn normalize_tokens(tokens: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let token = token.trim().to_uppercase();
        if !token.is_empty() && !out.contains(&token) {
            out.push(token);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_normalized() {
        let config = SecurityConfig {
            sensitive_keywords: vec![" drop".into(), "DROP".into(), "exec ".into(), "".into()],
            ..SecurityConfig::default()
        };
        let rules = ValidationRules::from_config(&config).unwrap();
        assert_eq!(rules.sensitive_keywords(), &["DROP", "EXEC"]);
    }

    #[test]
    fn test_allowed_operations_lookup() {
        let rules = ValidationRules::default();
        assert_eq!(rules.allowed_operations(Dialect::SqlServer)[0], "SELECT");
        assert!(rules.allowed_operations(Dialect::ElasticSearch).is_empty());
    }

    #[test]
    fn test_invalid_pattern_rejected_at_load() {
        let config = SecurityConfig {
            injection_patterns: vec!["(unclosed".into()],
            ..SecurityConfig::default()
        };
        let err = ValidationRules::from_config(&config).unwrap_err();
        assert!(matches!(err, GateError::Config(_)));
    }

    #[test]
    fn test_zero_max_length_rejected() {
        let config = SecurityConfig {
            max_query_length: 0,
            ..SecurityConfig::default()
        };
        assert!(ValidationRules::from_config(&config).is_err());
    }
}
