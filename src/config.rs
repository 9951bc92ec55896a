//! Configuration management for the query gate.
//!
//! Configuration is loaded from environment variables following the 12-factor app pattern.
//! Every section also implements `Default` and serde, so an embedding service can
//! build it from its own configuration source instead.

use crate::constants::{
    DEFAULT_INFLUX_ALLOWED_OPERATIONS, DEFAULT_INJECTION_PATTERNS, DEFAULT_MAX_QUERY_LENGTH,
    DEFAULT_MONGO_DENIED_OPERATIONS, DEFAULT_SENSITIVE_KEYWORDS, DEFAULT_SQL_ALLOWED_OPERATIONS,
};
use crate::error::GateError;
use crate::security::Dialect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Gate configuration loaded from environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Query validation rules
    pub security: SecurityConfig,

    /// Credential cipher key material
    pub credentials: CredentialConfig,
}

/// Query validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Keywords rejected anywhere in a SQL query (case-insensitive)
    pub sensitive_keywords: Vec<String>,

    /// Injection regexes run against the normalized SQL query
    pub injection_patterns: Vec<String>,

    /// Leading operations permitted per dialect
    pub allowed_operations: HashMap<Dialect, Vec<String>>,

    /// Mongo shell methods rejected in `db.` calls
    pub mongo_denied_operations: Vec<String>,

    /// Maximum query length (bytes)
    pub max_query_length: usize,
}

/// Credential cipher configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Encryption key or passphrase. When unset an ephemeral key is generated.
    pub encryption_key: Option<String>,

    /// URL-safe base64 salt for passphrase derivation. When unset a random
    /// salt is drawn, so a passphrase-derived key changes on every start.
    pub key_salt: Option<String>,
}

impl fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "<redacted>"))
            .field("key_salt", &self.key_salt.is_some())
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// All optional:
    /// - `QUERY_GATE_SENSITIVE_KEYWORDS`: Comma-separated keywords
    /// - `QUERY_GATE_INJECTION_PATTERNS`: JSON array of regex strings
    /// - `QUERY_GATE_ALLOWED_OPERATIONS`: JSON object mapping dialect to prefixes,
    ///   merged over the defaults
    /// - `QUERY_GATE_MONGO_DENIED_OPERATIONS`: Comma-separated Mongo methods
    /// - `QUERY_GATE_MAX_QUERY_LENGTH`: Maximum query length in bytes (default: 1000000)
    /// - `QUERY_GATE_ENCRYPTION_KEY`: Encryption key or passphrase
    /// - `QUERY_GATE_ENCRYPTION_SALT`: Salt for passphrase derivation
    pub fn from_env() -> Result<Self, GateError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut security = SecurityConfig::default();

        if let Some(raw) = lookup("QUERY_GATE_SENSITIVE_KEYWORDS") {
            security.sensitive_keywords = split_list(&raw);
        }

        if let Some(raw) = lookup("QUERY_GATE_INJECTION_PATTERNS") {
            security.injection_patterns = serde_json::from_str(&raw).map_err(|e| {
                GateError::config(format!(
                    "QUERY_GATE_INJECTION_PATTERNS must be a JSON array of strings: {}",
                    e
                ))
            })?;
        }

        if let Some(raw) = lookup("QUERY_GATE_ALLOWED_OPERATIONS") {
            let overrides: HashMap<Dialect, Vec<String>> =
                serde_json::from_str(&raw).map_err(|e| {
                    GateError::config(format!(
                        "QUERY_GATE_ALLOWED_OPERATIONS must map dialects to prefix arrays: {}",
                        e
                    ))
                })?;
            security.allowed_operations.extend(overrides);
        }

        if let Some(raw) = lookup("QUERY_GATE_MONGO_DENIED_OPERATIONS") {
            security.mongo_denied_operations = split_list(&raw);
        }

        if let Some(raw) = lookup("QUERY_GATE_MAX_QUERY_LENGTH") {
            security.max_query_length = raw.trim().parse().map_err(|_| {
                GateError::config(format!(
                    "QUERY_GATE_MAX_QUERY_LENGTH must be a positive integer, got '{}'",
                    raw
                ))
            })?;
        }

        let credentials = CredentialConfig {
            encryption_key: lookup("QUERY_GATE_ENCRYPTION_KEY").filter(|k| !k.is_empty()),
            key_salt: lookup("QUERY_GATE_ENCRYPTION_SALT").filter(|s| !s.is_empty()),
        };

        Ok(Config {
            security,
            credentials,
        })
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        let mut allowed_operations = HashMap::new();
        for dialect in Dialect::ALL {
            let ops = if dialect.is_sql() {
                DEFAULT_SQL_ALLOWED_OPERATIONS
            } else if dialect == Dialect::InfluxDb {
                DEFAULT_INFLUX_ALLOWED_OPERATIONS
            } else {
                continue;
            };
            allowed_operations.insert(dialect, to_strings(ops));
        }

        Self {
            sensitive_keywords: to_strings(DEFAULT_SENSITIVE_KEYWORDS),
            injection_patterns: to_strings(DEFAULT_INJECTION_PATTERNS),
            allowed_operations,
            mongo_denied_operations: to_strings(DEFAULT_MONGO_DENIED_OPERATIONS),
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
