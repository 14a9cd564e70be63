//! Generation-based decryption dispatch.
//!
//! Generations are pinned: rotation never re-encrypts stored objects, and an
//! object sealed under a retired generation is refused outright. The key it
//! needs is not retained anywhere, so there is nothing to attempt.

use crate::error::{KeyError, KeyResult};
use crate::session::ReadyKey;
use tracing::debug;
use wsvault_crypto::{EncryptedObjectEnvelope, decrypt_blob};

/// How an object's generation relates to the session's key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Sealed under the session's generation; decryptable.
    Current,
    /// Sealed under a retired generation; permanently unreadable here.
    Legacy,
    /// Sealed under a generation newer than the session's key, which means
    /// the session itself is stale.
    AheadOfSession,
}

/// Gates decryption by the envelope's recorded generation.
pub struct VersionResolver;

impl VersionResolver {
    pub fn resolve(object_generation: u32, session_generation: u32) -> Resolution {
        use std::cmp::Ordering;
        match object_generation.cmp(&session_generation) {
            Ordering::Equal => Resolution::Current,
            Ordering::Less => Resolution::Legacy,
            Ordering::Greater => Resolution::AheadOfSession,
        }
    }

    /// Decrypts `envelope` if it belongs to `key`'s generation.
    ///
    /// Legacy objects fail with `LegacyObjectUnreadable` and objects from a
    /// newer generation fail with `WorkspaceLocked`; neither reaches the
    /// cipher.
    pub fn decrypt(key: &ReadyKey, envelope: &EncryptedObjectEnvelope) -> KeyResult<Vec<u8>> {
        match Self::resolve(envelope.encryption_generation, key.generation()) {
            Resolution::Current => Ok(decrypt_blob(key.key(), envelope)?),
            Resolution::Legacy => {
                debug!(
                    object_generation = envelope.encryption_generation,
                    current_generation = key.generation(),
                    "refusing legacy object"
                );
                Err(KeyError::LegacyObjectUnreadable {
                    object_generation: envelope.encryption_generation,
                    current_generation: key.generation(),
                })
            }
            Resolution::AheadOfSession => Err(KeyError::WorkspaceLocked),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_orders_generations() {
        assert_eq!(VersionResolver::resolve(2, 2), Resolution::Current);
        assert_eq!(VersionResolver::resolve(1, 2), Resolution::Legacy);
        assert_eq!(VersionResolver::resolve(3, 2), Resolution::AheadOfSession);
    }
}
