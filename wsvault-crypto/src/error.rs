//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors raised by key derivation and blob encryption.
///
/// Every variant is deterministic: the same inputs always produce the same
/// error, so callers never need to retry a crypto failure.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid KDF parameters: {0}")]
    InvalidKdfParams(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// The ciphertext did not verify against its key and sidecar. Covers a
    /// wrong key as well as truncated, extended or altered data.
    #[error("authentication failed (wrong key or tampered data)")]
    AuthenticationFailure,

    #[error("invalid key fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}
