//! # Query Gate
//!
//! The safety boundary in front of externally executed database queries.
//!
//! This crate provides:
//! - **Validation**: classify a dialect-specific query as allowed or rejected
//!   before it reaches a live connection
//! - **Credentials**: authenticated encryption of stored passwords and
//!   connection strings under a process-held key
//!
//! ## Usage
//!
//! ```
//! use query_gate::{Config, CredentialCipher, Dialect, QueryValidator};
//!
//! let config = Config::default();
//! let validator = QueryValidator::from_config(&config.security).unwrap();
//! assert!(validator.validate("SELECT * FROM users", Dialect::PostgreSql).is_allowed());
//! assert!(validator.validate("DROP TABLE users", Dialect::PostgreSql).is_rejected());
//!
//! let key = CredentialCipher::generate_key().unwrap();
//! let cipher = CredentialCipher::new(Some(&key));
//! let sealed = cipher.encrypt("hunter2").unwrap();
//! assert_eq!(cipher.decrypt(&sealed), "hunter2");
//! ```
//!
//! Both components hold only immutable state after construction and can be
//! shared across threads without locking.

pub mod config;
pub mod constants;
pub mod error;
pub mod security;
pub mod telemetry;

pub use config::{Config, CredentialConfig, SecurityConfig};
pub use error::{GateError, Result};
pub use security::{
    CredentialCipher, Dialect, EncryptedSecret, QueryValidator, RejectReason, Verdict,
};
