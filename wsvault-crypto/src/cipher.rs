//! Authenticated blob encryption (ChaCha20-Poly1305).
//!
//! Stateless: every call draws its own nonce, so independent objects can be
//! sealed and opened concurrently under one shared key.

use crate::envelope::{
    AlgorithmId, EncryptedObjectEnvelope, NONCE_SIZE, TAG_SIZE, associated_data,
};
use crate::error::{CryptoError, CryptoResult};
use crate::key::DerivedKey;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;

/// Encrypts `plaintext` into a new envelope tagged with `generation`.
pub fn encrypt_blob(
    key: &DerivedKey,
    generation: u32,
    mime_type: &str,
    plaintext: &[u8],
) -> CryptoResult<EncryptedObjectEnvelope> {
    let algorithm_id = AlgorithmId::ChaCha20Poly1305;
    let plaintext_size = plaintext.len() as u64;
    let aad = associated_data(algorithm_id, generation, mime_type, plaintext_size);

    let mut iv = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut iv);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: plaintext,
                aad: &aad,
            },
        )
        .map_err(|e| CryptoError::Encryption(format!("blob seal failed: {e}")))?;

    Ok(EncryptedObjectEnvelope {
        ciphertext_size: ciphertext.len() as u64,
        ciphertext,
        algorithm_id,
        iv,
        encryption_generation: generation,
        original_mime_type: mime_type.to_string(),
        plaintext_size,
    })
}

/// Decrypts an envelope, verifying its tag and bound metadata.
///
/// Returns the full plaintext or an error; never partial output. Ciphertext
/// whose length disagrees with the sidecar, or that is shorter than the tag,
/// is treated like any other corruption: `AuthenticationFailure`.
pub fn decrypt_blob(key: &DerivedKey, envelope: &EncryptedObjectEnvelope) -> CryptoResult<Vec<u8>> {
    if envelope.ciphertext.len() as u64 != envelope.ciphertext_size
        || envelope.ciphertext.len() < TAG_SIZE
    {
        return Err(CryptoError::AuthenticationFailure);
    }

    let aad = associated_data(
        envelope.algorithm_id,
        envelope.encryption_generation,
        &envelope.original_mime_type,
        envelope.plaintext_size,
    );

    match envelope.algorithm_id {
        AlgorithmId::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
            cipher
                .decrypt(
                    Nonce::from_slice(&envelope.iv),
                    Payload {
                        msg: &envelope.ciphertext,
                        aad: &aad,
                    },
                )
                .map_err(|_| CryptoError::AuthenticationFailure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::generate_random_key;

    #[test]
    fn roundtrip_records_sizes() {
        let key = generate_random_key();
        let env = encrypt_blob(&key, 1, "text/plain", b"hello").unwrap();
        assert_eq!(env.plaintext_size, 5);
        assert_eq!(env.ciphertext_size, (5 + TAG_SIZE) as u64);
        assert_eq!(decrypt_blob(&key, &env).unwrap(), b"hello");
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let key = generate_random_key();
        let env = encrypt_blob(&key, 1, "application/octet-stream", b"").unwrap();
        assert_eq!(env.ciphertext.len(), TAG_SIZE);
        assert!(decrypt_blob(&key, &env).unwrap().is_empty());
    }

    #[test]
    fn size_mismatch_fails_authentication() {
        let key = generate_random_key();
        let mut env = encrypt_blob(&key, 1, "text/plain", b"hello").unwrap();
        env.ciphertext_size += 1;
        assert!(matches!(
            decrypt_blob(&key, &env),
            Err(CryptoError::AuthenticationFailure)
        ));
    }

    #[test]
    fn truncated_below_tag_fails_authentication() {
        let key = generate_random_key();
        let mut env = encrypt_blob(&key, 1, "text/plain", b"hello").unwrap();
        env.ciphertext.truncate(4);
        env.ciphertext_size = 4;
        assert!(matches!(
            decrypt_blob(&key, &env),
            Err(CryptoError::AuthenticationFailure)
        ));
    }
}
