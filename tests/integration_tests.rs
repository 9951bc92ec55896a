//! Integration tests for the query gate.
//!
//! These exercise the public API the way a calling service does: load
//! configuration from the environment, validate request queries, and read
//! back stored credentials.
//!
//! Tests that touch process environment variables are `#[serial]`.

use query_gate::constants::DECRYPTION_FAILED_MARKER;
use query_gate::security::is_decryption_failure;
use query_gate::{
    Config, CredentialCipher, Dialect, GateError, QueryValidator, RejectReason, Verdict,
};
use serial_test::serial;
use std::sync::Arc;
use std::thread;

const ENV_VARS: &[&str] = &[
    "QUERY_GATE_SENSITIVE_KEYWORDS",
    "QUERY_GATE_INJECTION_PATTERNS",
    "QUERY_GATE_ALLOWED_OPERATIONS",
    "QUERY_GATE_MONGO_DENIED_OPERATIONS",
    "QUERY_GATE_MAX_QUERY_LENGTH",
    "QUERY_GATE_ENCRYPTION_KEY",
    "QUERY_GATE_ENCRYPTION_SALT",
];

/// Clears the gate's environment variables on creation and on drop.
struct EnvGuard;

impl EnvGuard {
    fn new() -> Self {
        clear_env();
        EnvGuard
    }

    fn set(&self, name: &str, value: &str) {
        std::env::set_var(name, value);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        clear_env();
    }
}

fn clear_env() {
    for name in ENV_VARS {
        std::env::remove_var(name);
    }
}

fn default_validator() -> QueryValidator {
    QueryValidator::from_config(&Config::default().security).unwrap()
}

// =============================================================================
// Validation scenarios
// =============================================================================

#[test]
fn test_documented_verdicts() {
    let v = default_validator();

    assert!(v.validate("DROP TABLE users", Dialect::PostgreSql).is_rejected());
    assert!(v
        .validate("SELECT * FROM users; --", Dialect::PostgreSql)
        .is_rejected());
    assert!(v
        .validate("SELECT * FROM users;", Dialect::PostgreSql)
        .is_rejected());
    assert!(v
        .validate(r#"{"$where": "this.a==1"}"#, Dialect::MongoDb)
        .is_rejected());
    assert!(v
        .validate("db.collection.find({})", Dialect::MongoDb)
        .is_allowed());
    assert!(v.validate("SHOW MEASUREMENTS", Dialect::InfluxDb).is_allowed());
    assert!(v
        .validate("DROP MEASUREMENT x", Dialect::InfluxDb)
        .is_rejected());
}

#[test]
fn test_reason_strings() {
    let v = default_validator();
    let cases = [
        ("", Dialect::MySql, "empty query"),
        ("DELETE FROM users", Dialect::MySql, "sensitive keyword: DELETE"),
        ("SELECT 1 UNION SELECT 2", Dialect::MySql, r"injection pattern: \bUNION\s+(ALL\s+)?SELECT\b"),
        ("{not json", Dialect::MongoDb, "malformed query"),
        (r#"{"script": {}}"#, Dialect::ElasticSearch, "script execution"),
        ("INSERT cpu value=1", Dialect::InfluxDb, "write or administrative operation"),
    ];

    for (query, dialect, expected) in cases {
        let verdict = v.validate(query, dialect);
        assert_eq!(
            verdict.reason().map(ToString::to_string).as_deref(),
            Some(expected),
            "query {:?} on {}",
            query,
            dialect
        );
    }
}

#[test]
fn test_request_tags() {
    let v = default_validator();
    assert!(v.validate_tag("SELECT 1", "postgresql").is_allowed());
    assert!(v.validate_tag("DROP TABLE t", "MySQL").is_rejected());
    // No ruleset for this tag: allowed with a warning
    assert_eq!(v.validate_tag("DROP TABLE t", "snowflake"), Verdict::Allow);
}

#[test]
fn test_validator_shared_across_threads() {
    let v = Arc::new(default_validator());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let v = Arc::clone(&v);
            thread::spawn(move || {
                let allowed = v.validate(&format!("SELECT {} FROM t", i), Dialect::PostgreSql);
                let rejected = v.validate(&format!("DROP TABLE t{}", i), Dialect::PostgreSql);
                (allowed.is_allowed(), rejected.is_rejected())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), (true, true));
    }
}

#[test]
fn test_rejection_propagates_as_error() {
    fn run(v: &QueryValidator, query: &str) -> query_gate::Result<&'static str> {
        v.validate(query, Dialect::SqlServer).into_result()?;
        Ok("executed")
    }

    let v = default_validator();
    assert_eq!(run(&v, "SELECT name FROM sys.tables").unwrap(), "executed");

    let err = run(&v, "EXEC xp_cmdshell 'dir'").unwrap_err();
    assert!(matches!(
        err,
        GateError::QueryRejected(RejectReason::SensitiveKeyword(_))
    ));
    assert!(!err.is_fatal());
}

// =============================================================================
// Credential scenarios
// =============================================================================

#[test]
fn test_batch_listing_degrades_gracefully() {
    let key = CredentialCipher::generate_key().unwrap();
    let cipher = CredentialCipher::new(Some(&key));
    let other = CredentialCipher::new(Some(&CredentialCipher::generate_key().unwrap()));

    let records = vec![
        cipher.encrypt("first").unwrap().into_string(),
        other.encrypt("written under another key").unwrap().into_string(),
        "garbage".to_string(),
        String::new(),
        cipher.encrypt("last").unwrap().into_string(),
    ];

    let listed: Vec<String> = records.iter().map(|r| cipher.decrypt(r)).collect();
    assert_eq!(listed[0], "first");
    assert!(is_decryption_failure(&listed[1]));
    assert_eq!(listed[2], DECRYPTION_FAILED_MARKER);
    assert_eq!(listed[3], "");
    assert_eq!(listed[4], "last");
}

#[test]
fn test_cipher_shared_across_threads() {
    let key = CredentialCipher::generate_key().unwrap();
    let cipher = Arc::new(CredentialCipher::new(Some(&key)));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let cipher = Arc::clone(&cipher);
            thread::spawn(move || {
                let secret = format!("password-{}", i);
                let sealed = cipher.encrypt(&secret).unwrap();
                cipher.decrypt(&sealed) == secret
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn test_encrypted_secret_serde() {
    let key = CredentialCipher::generate_key().unwrap();
    let cipher = CredentialCipher::new(Some(&key));
    let sealed = cipher.encrypt("s3cret").unwrap();

    let json = serde_json::to_string(&sealed).unwrap();
    assert_eq!(json, format!("\"{}\"", sealed.as_str()));

    let restored: query_gate::EncryptedSecret = serde_json::from_str(&json).unwrap();
    assert_eq!(cipher.decrypt(&restored), "s3cret");
}

// =============================================================================
// Environment configuration
// =============================================================================

#[test]
#[serial]
fn test_from_env_defaults() {
    let _env = EnvGuard::new();
    let config = Config::from_env().unwrap();
    let v = QueryValidator::from_config(&config.security).unwrap();
    assert!(v.validate("DROP TABLE users", Dialect::PostgreSql).is_rejected());
    assert!(config.credentials.encryption_key.is_none());
}

#[test]
#[serial]
fn test_from_env_custom_rules() {
    let env = EnvGuard::new();
    env.set("QUERY_GATE_SENSITIVE_KEYWORDS", "drop");
    env.set("QUERY_GATE_INJECTION_PATTERNS", r#"["\\bSECRET_TABLE\\b"]"#);
    env.set("QUERY_GATE_ALLOWED_OPERATIONS", r#"{"postgresql": ["SELECT", "WITH"]}"#);
    env.set("QUERY_GATE_MONGO_DENIED_OPERATIONS", "remove");

    let config = Config::from_env().unwrap();
    let v = QueryValidator::from_config(&config.security).unwrap();

    // Only DROP is sensitive now
    assert!(v.validate("DELETE FROM t", Dialect::PostgreSql).is_allowed());
    assert!(v.validate("DROP TABLE t", Dialect::PostgreSql).is_rejected());
    assert!(v
        .validate("SELECT * FROM secret_table", Dialect::PostgreSql)
        .is_rejected());
    assert!(v.validate("db.users.remove({})", Dialect::MongoDb).is_rejected());
    assert!(v.validate("db.users.deleteMany({})", Dialect::MongoDb).is_allowed());
}

#[test]
#[serial]
fn test_from_env_invalid_pattern_is_config_error() {
    let env = EnvGuard::new();
    env.set("QUERY_GATE_INJECTION_PATTERNS", r#"["(unclosed"]"#);

    let config = Config::from_env().unwrap();
    let err = QueryValidator::from_config(&config.security).unwrap_err();
    assert!(matches!(err, GateError::Config(_)));
}

#[test]
#[serial]
fn test_from_env_credentials_survive_restart_with_salt() {
    let env = EnvGuard::new();
    env.set("QUERY_GATE_ENCRYPTION_KEY", "a long operator passphrase");
    env.set("QUERY_GATE_ENCRYPTION_SALT", "AAECAwQFBgcICQoLDA0ODw==");

    let config = Config::from_env().unwrap();
    let before_restart = CredentialCipher::from_config(&config.credentials).unwrap();
    let sealed = before_restart.encrypt("db-password").unwrap();
    drop(before_restart);

    let after_restart = CredentialCipher::from_config(&config.credentials).unwrap();
    assert_eq!(after_restart.decrypt(&sealed), "db-password");
}

#[test]
#[serial]
fn test_from_env_configured_key() {
    let env = EnvGuard::new();
    let key = CredentialCipher::generate_key().unwrap();
    env.set("QUERY_GATE_ENCRYPTION_KEY", &key);

    let config = Config::from_env().unwrap();
    let cipher = CredentialCipher::from_config(&config.credentials).unwrap();
    assert_eq!(
        cipher.key_source(),
        query_gate::security::KeySource::Configured
    );
}
