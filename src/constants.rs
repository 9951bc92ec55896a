//! Centralized constants for the query gate.
//!
//! Default rule sets, crypto parameters and logging limits live here so they
//! are easy to find, audit and override through configuration.

// =============================================================================
// Validation Defaults
// =============================================================================

/// Keywords that reject a SQL query wherever they appear.
pub const DEFAULT_SENSITIVE_KEYWORDS: &[&str] = &[
    "DELETE", "DROP", "ALTER", "TRUNCATE", "GRANT", "REVOKE", "INSERT", "UPDATE", "CREATE",
    "EXEC",
];

/// Injection patterns run against the uppercased SQL query, in order.
pub const DEFAULT_INJECTION_PATTERNS: &[&str] = &[
    // Comment injection
    r"--",
    r"#\s*$",
    r"/\*",
    // Statement terminators and stacked statements
    r";\s*$",
    r";\s*\S",
    // Union-based injection
    r"\bUNION\s+(ALL\s+)?SELECT\b",
    // Tautologies
    r"\bOR\s+1\s*=\s*1\b",
    r"'\s*OR\s+'[^']*'\s*=\s*'",
    // Time-based blind injection
    r"\bWAITFOR\s+DELAY\b",
    r"\bSLEEP\s*\(",
    r"\bPG_SLEEP\s*\(",
    r"\bBENCHMARK\s*\(",
    // Command execution
    r"\bXP_CMDSHELL\b",
];

/// Leading operations permitted for the SQL dialects.
pub const DEFAULT_SQL_ALLOWED_OPERATIONS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "EXPLAIN"];

/// Leading operations permitted for InfluxQL.
pub const DEFAULT_INFLUX_ALLOWED_OPERATIONS: &[&str] = &["SELECT", "SHOW"];

/// Mongo shell methods rejected in `db.` calls.
pub const DEFAULT_MONGO_DENIED_OPERATIONS: &[&str] = &["deleteMany", "drop", "dropDatabase"];

/// Mongo operators that execute server-side JavaScript.
pub const MONGO_JAVASCRIPT_OPERATORS: &[&str] = &["$where", "$function"];

/// Mongo shell methods that are always read-only.
pub const MONGO_READ_METHODS: &[&str] = &["find", "aggregate"];

/// Default maximum query length in bytes.
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 1_000_000;

// =============================================================================
// Credential Cipher Constants
// =============================================================================

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Salt length for password-based key derivation.
pub const SALT_LEN: usize = 16;

/// PBKDF2-HMAC-SHA256 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Leading version byte of every encrypted secret.
pub const SECRET_FORMAT_VERSION: u8 = 0x01;

/// Prefix of secrets written by the old base64-only fallback path.
pub const LEGACY_FALLBACK_PREFIX: &str = "fallback:";

/// Returned by `decrypt` when a secret cannot be recovered.
pub const DECRYPTION_FAILED_MARKER: &str = "[DECRYPTION FAILED]";

// =============================================================================
// Logging Constants
// =============================================================================

/// Default truncation length for query logging.
pub const LOG_QUERY_TRUNCATE_LENGTH: usize = 100;

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn,query_gate=info";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_operations_are_uppercase() {
        for op in DEFAULT_SQL_ALLOWED_OPERATIONS
            .iter()
            .chain(DEFAULT_INFLUX_ALLOWED_OPERATIONS)
        {
            assert_eq!(*op, op.to_uppercase());
        }
    }

    #[test]
    fn test_crypto_parameters() {
        assert_eq!(KEY_LEN * 8, 256);
        assert!(PBKDF2_ITERATIONS >= 100_000);
        assert_eq!(SALT_LEN, 16);
    }
}
