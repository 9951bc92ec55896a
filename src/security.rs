//! Security module for query validation and credential protection.

mod credentials;
mod dialect;
mod injection;
mod rules;
mod validation;

pub use credentials::{is_decryption_failure, CredentialCipher, EncryptedSecret, KeySource};
pub use dialect::{Dialect, DialectFamily, UnknownDialect};
pub use injection::InjectionDetector;
pub use rules::ValidationRules;
pub use validation::{QueryValidator, RejectReason, Verdict};
