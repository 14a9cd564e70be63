//! Key session and store error types.

use thiserror::Error;
use wsvault_crypto::CryptoError;

/// Result type for key session operations.
pub type KeyResult<T> = Result<T, KeyError>;

/// Result type for metadata and object store calls.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced to callers of the key subsystem.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("workspace key already initialized")]
    AlreadyInitialized,

    #[error("workspace key not initialized")]
    NotInitialized,

    #[error("invalid passphrase")]
    InvalidPassphrase,

    #[error("passphrase too short (min {min} characters)")]
    PassphraseTooShort { min: usize },

    #[error("workspace is locked")]
    WorkspaceLocked,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("authentication failed (wrong key or tampered data)")]
    AuthenticationFailure,

    #[error(
        "object encrypted under retired generation {object_generation} (current {current_generation}); re-upload required"
    )]
    LegacyObjectUnreadable {
        object_generation: u32,
        current_generation: u32,
    },

    #[error("key metadata store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("workspace key was rotated concurrently")]
    ConcurrentRotationConflict,

    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl KeyError {
    /// Environmental failures that may succeed on retry. Everything else
    /// needs different input (a passphrase prompt, a privileged actor).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            KeyError::StoreUnavailable(_) | KeyError::ConcurrentRotationConflict
        )
    }

    /// Whether the caller should prompt for the workspace passphrase.
    pub fn needs_passphrase(&self) -> bool {
        matches!(self, KeyError::WorkspaceLocked | KeyError::InvalidPassphrase)
    }
}

impl From<CryptoError> for KeyError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::AuthenticationFailure => KeyError::AuthenticationFailure,
            other => KeyError::Crypto(other),
        }
    }
}

/// Errors reported by [`crate::KeyMetadataStore`] and [`crate::ObjectStore`]
/// implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("record already exists for workspace {0}")]
    AlreadyInitialized(String),

    #[error("actor not permitted: {0}")]
    Unauthorized(String),

    #[error("stored fingerprint no longer matches expected fingerprint")]
    ConcurrentRotationConflict,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for KeyError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => KeyError::NotInitialized,
            StoreError::AlreadyInitialized(_) => KeyError::AlreadyInitialized,
            StoreError::Unauthorized(msg) => KeyError::Unauthorized(msg),
            StoreError::ConcurrentRotationConflict => KeyError::ConcurrentRotationConflict,
            other => KeyError::StoreUnavailable(other.to_string()),
        }
    }
}
