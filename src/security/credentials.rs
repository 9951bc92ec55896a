//! Credential encryption at rest.
//!
//! Secrets are sealed with AES-256-GCM under a single key held by the process.
//! The stored form is URL-safe base64 of:
//!
//! ```text
//! version (1 byte) | nonce (12 bytes) | ciphertext | tag (16 bytes)
//! ```
//!
//! Key material comes from, in order of preference:
//! 1. a configured key that is already URL-safe base64 of 32 bytes,
//! 2. a configured passphrase run through PBKDF2-HMAC-SHA256,
//! 3. random bytes generated at startup. This key is never persisted, so
//!    anything sealed under it is unrecoverable once the process exits.

use crate::config::CredentialConfig;
use crate::constants::{
    DECRYPTION_FAILED_MARKER, KEY_LEN, LEGACY_FALLBACK_PREFIX, NONCE_LEN, PBKDF2_ITERATIONS,
    SALT_LEN, SECRET_FORMAT_VERSION, TAG_LEN,
};
use crate::error::GateError;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use tracing::{error, info, warn};
use zeroize::Zeroizing;

/// An encrypted secret, safe to persist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedSecret(String);

impl EncryptedSecret {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for EncryptedSecret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for EncryptedSecret {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncryptedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the cipher's key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Configured key used as-is.
    Configured,
    /// Derived from a configured passphrase.
    Derived,
    /// Generated for this process only.
    Ephemeral,
}

/// Encrypts and decrypts stored credentials under one process-held key.
///
/// The key is fixed at construction; `encrypt` and `decrypt` take `&self` and
/// are safe to call concurrently.
pub struct CredentialCipher {
    cipher: Option<Aes256Gcm>,
    source: KeySource,
}

impl CredentialCipher {
    /// Build a cipher from an optional configured key or passphrase.
    ///
    /// Passphrases are derived with a fresh random salt. Use
    /// [`CredentialCipher::from_config`] with a configured salt to get the same
    /// key on every start.
    pub fn new(configured_secret: Option<&str>) -> Self {
        Self::build(configured_secret, None)
    }

    /// Build a cipher from configuration.
    ///
    /// Fails only if the configured salt is not valid base64.
    pub fn from_config(config: &CredentialConfig) -> Result<Self, GateError> {
        let salt = config
            .key_salt
            .as_deref()
            .map(decode_salt)
            .transpose()?;
        Ok(Self::build(config.encryption_key.as_deref(), salt))
    }

    /// Build a cipher whose passphrase derivation uses a fixed salt.
    pub fn with_salt(configured_secret: Option<&str>, salt: [u8; SALT_LEN]) -> Self {
        Self::build(configured_secret, Some(salt))
    }

    fn build(configured_secret: Option<&str>, salt: Option<[u8; SALT_LEN]>) -> Self {
        let configured_secret = configured_secret.filter(|s| !s.trim().is_empty());
        let (key, source) = match key_material(configured_secret, salt) {
            Ok(material) => material,
            Err(e) => {
                error!(error = %e, "Could not obtain key material; credential cipher disabled");
                let intended = if configured_secret.is_some() {
                    KeySource::Derived
                } else {
                    KeySource::Ephemeral
                };
                return Self::unavailable(intended);
            }
        };

        match Aes256Gcm::new_from_slice(key.as_slice()) {
            Ok(cipher) => {
                info!(key_source = ?source, "Credential cipher initialized");
                Self {
                    cipher: Some(cipher),
                    source,
                }
            }
            Err(e) => {
                error!(error = %e, "AES-256-GCM rejected key; credential cipher disabled");
                Self::unavailable(source)
            }
        }
    }

    fn unavailable(source: KeySource) -> Self {
        Self {
            cipher: None,
            source,
        }
    }

    /// Generate a fresh key in the format accepted as a configured key.
    pub fn generate_key() -> Result<String, GateError> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng
            .try_fill_bytes(key.as_mut_slice())
            .map_err(|e| GateError::encryption(format!("random key generation failed: {}", e)))?;
        Ok(URL_SAFE.encode(key.as_slice()))
    }

    /// Check if the cipher has usable key material.
    pub fn is_available(&self) -> bool {
        self.cipher.is_some()
    }

    pub fn key_source(&self) -> KeySource {
        self.source
    }

    /// Encrypt a secret.
    ///
    /// Empty input is returned unchanged. An unavailable cipher is an error:
    /// secrets are never handed back in clear text.
    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedSecret, GateError> {
        if plaintext.is_empty() {
            return Ok(EncryptedSecret::default());
        }

        let cipher = self.cipher.as_ref().ok_or(GateError::CipherUnavailable)?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| GateError::encryption(format!("nonce generation failed: {}", e)))?;

        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| GateError::encryption("AES-GCM encryption failed"))?;

        let mut payload = Vec::with_capacity(1 + NONCE_LEN + sealed.len());
        payload.push(SECRET_FORMAT_VERSION);
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&sealed);

        Ok(EncryptedSecret(URL_SAFE.encode(payload)))
    }

    /// Decrypt a secret, returning [`DECRYPTION_FAILED_MARKER`] on any failure.
    ///
    /// Callers must treat the marker as "credential unavailable". One corrupt
    /// record does not abort a batch.
    pub fn decrypt(&self, ciphertext: impl AsRef<str>) -> String {
        match self.try_decrypt(ciphertext.as_ref()) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!(error = %e, "Credential could not be decrypted");
                DECRYPTION_FAILED_MARKER.to_string()
            }
        }
    }

    /// Decrypt a secret, reporting why it failed.
    ///
    /// Empty input is returned unchanged, and secrets written by the legacy
    /// base64 fallback are decoded without needing the key.
    pub fn try_decrypt(&self, ciphertext: &str) -> Result<String, GateError> {
        if ciphertext.is_empty() {
            return Ok(String::new());
        }

        if let Some(encoded) = ciphertext.strip_prefix(LEGACY_FALLBACK_PREFIX) {
            let bytes = STANDARD
                .decode(encoded.trim())
                .map_err(|e| GateError::decryption(format!("invalid legacy encoding: {}", e)))?;
            return String::from_utf8(bytes)
                .map_err(|_| GateError::decryption("legacy secret is not valid UTF-8"));
        }

        let cipher = self.cipher.as_ref().ok_or(GateError::CipherUnavailable)?;

        let payload = URL_SAFE
            .decode(ciphertext.trim())
            .map_err(|e| GateError::decryption(format!("invalid encoding: {}", e)))?;

        if payload.len() < 1 + NONCE_LEN + TAG_LEN {
            return Err(GateError::decryption("payload too short"));
        }
        if payload[0] != SECRET_FORMAT_VERSION {
            return Err(GateError::decryption(format!(
                "unsupported format version {}",
                payload[0]
            )));
        }

        let (nonce, sealed) = payload[1..].split_at(NONCE_LEN);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| GateError::decryption("authentication failed: wrong key or corrupted payload"))?;

        String::from_utf8(plaintext)
            .map_err(|_| GateError::decryption("decrypted secret is not valid UTF-8"))
    }
}

impl fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("available", &self.is_available())
            .field("key_source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Check whether a decrypted value is the failure marker rather than a secret.
pub fn is_decryption_failure(value: &str) -> bool {
    value == DECRYPTION_FAILED_MARKER
}

fn key_material(
    configured_secret: Option<&str>,
    salt: Option<[u8; SALT_LEN]>,
) -> Result<(Zeroizing<Vec<u8>>, KeySource), GateError> {
    match configured_secret {
        Some(secret) => {
            if let Some(key) = decode_key(secret) {
                return Ok((key, KeySource::Configured));
            }
            let salt = match salt {
                Some(salt) => salt,
                None => {
                    warn!(
                        "No key salt configured; passphrase-derived key will differ after restart"
                    );
                    random_salt()?
                }
            };
            Ok((derive_key(secret.as_bytes(), &salt), KeySource::Derived))
        }
        None => {
            warn!(
                "No encryption key configured; using an ephemeral key. \
                 Credentials encrypted now cannot be decrypted after restart"
            );
            let mut seed = Zeroizing::new([0u8; KEY_LEN]);
            OsRng
                .try_fill_bytes(seed.as_mut_slice())
                .map_err(|e| GateError::encryption(format!("random seed failed: {}", e)))?;
            let salt = random_salt()?;
            Ok((derive_key(seed.as_slice(), &salt), KeySource::Ephemeral))
        }
    }
}

/// Accept a configured key only if it is URL-safe base64 of exactly 32 bytes.
fn decode_key(secret: &str) -> Option<Zeroizing<Vec<u8>>> {
    let bytes = Zeroizing::new(URL_SAFE.decode(secret.trim()).ok()?);
    (bytes.len() == KEY_LEN).then_some(bytes)
}

fn derive_key(password: &[u8], salt: &[u8; SALT_LEN]) -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(vec![0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, PBKDF2_ITERATIONS, key.as_mut_slice());
    key
}

fn random_salt() -> Result<[u8; SALT_LEN], GateError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| GateError::encryption(format!("salt generation failed: {}", e)))?;
    Ok(salt)
}

fn decode_salt(encoded: &str) -> Result<[u8; SALT_LEN], GateError> {
    let bytes = URL_SAFE
        .decode(encoded.trim())
        .map_err(|e| GateError::config(format!("key salt is not URL-safe base64: {}", e)))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        GateError::config(format!(
            "key salt must be {} bytes, got {}",
            SALT_LEN,
            b.len()
        ))
    })
}
