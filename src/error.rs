//! Error types for the query gate.
//!
//! Rejections and decryption failures are ordinary values in this crate. The
//! variants here exist for callers that want to propagate them with `?`, and
//! for the one hard failure: encrypting with an unavailable cipher.

use crate::security::RejectReason;
use thiserror::Error;

/// Domain errors for query validation and credential protection.
#[derive(Debug, Error)]
pub enum GateError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Query rejected by the validation policy
    #[error("Query rejected: {0}")]
    QueryRejected(RejectReason),

    /// The credential cipher has no usable key material
    #[error("Credential cipher unavailable: refusing to store secrets unencrypted")]
    CipherUnavailable,

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key, corrupted or unrecognized payload)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
}

impl GateError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a rejection error.
    pub fn rejected(reason: RejectReason) -> Self {
        Self::QueryRejected(reason)
    }

    /// Create an encryption error.
    pub fn encryption(msg: impl Into<String>) -> Self {
        Self::Encryption(msg.into())
    }

    /// Create a decryption error.
    pub fn decryption(msg: impl Into<String>) -> Self {
        Self::DecryptionFailed(msg.into())
    }

    /// Whether the caller must abort the operation that produced this error.
    ///
    /// Only a failed write of a secret is fatal; everything else is a policy
    /// decision or a degraded read.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CipherUnavailable | Self::Encryption(_))
    }

    /// Get a user-friendly suggestion for how to fix this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => Some("Check your environment variables and configuration"),
            Self::QueryRejected(_) => Some("Review your query against the validation rules"),
            Self::CipherUnavailable => {
                Some("Set QUERY_GATE_ENCRYPTION_KEY and restart the process")
            }
            Self::DecryptionFailed(_) => Some(
                "The stored credential was written under a different key; re-enter it",
            ),
            _ => None,
        }
    }
}

/// Result type alias for gate operations.
pub type Result<T> = std::result::Result<T, GateError>;
