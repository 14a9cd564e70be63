//! Encrypted object envelope.
//!
//! An envelope is the ciphertext of one stored object plus the non-secret
//! metadata needed to decrypt it later. Object stores keep the ciphertext as
//! opaque bytes and the rest as a sidecar record ([`EnvelopeSidecar`]).

use serde::{Deserialize, Serialize};
use std::fmt;

/// ChaCha20-Poly1305 nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Domain prefix for the associated data bound into every envelope.
const AAD_DOMAIN: &[u8] = b"wsvault/blob/v1";

/// Authenticated cipher used to produce an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmId {
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl AlgorithmId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlgorithmId::ChaCha20Poly1305 => "chacha20-poly1305",
        }
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ciphertext plus decryption metadata for one stored object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedObjectEnvelope {
    /// ChaCha20-Poly1305 ciphertext including the trailing tag.
    #[serde(with = "crate::encoding::base64_bytes")]
    pub ciphertext: Vec<u8>,
    pub algorithm_id: AlgorithmId,
    /// Fresh random nonce; never reused under one key.
    #[serde(with = "crate::encoding::base64_array")]
    pub iv: [u8; NONCE_SIZE],
    /// Key generation the object was encrypted under.
    pub encryption_generation: u32,
    pub original_mime_type: String,
    pub plaintext_size: u64,
    pub ciphertext_size: u64,
}

/// Envelope fields stored next to the ciphertext bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeSidecar {
    pub algorithm_id: AlgorithmId,
    #[serde(with = "crate::encoding::base64_array")]
    pub iv: [u8; NONCE_SIZE],
    pub encryption_generation: u32,
    pub original_mime_type: String,
    pub plaintext_size: u64,
    pub ciphertext_size: u64,
}

impl EncryptedObjectEnvelope {
    /// Splits off the sidecar metadata.
    pub fn sidecar(&self) -> EnvelopeSidecar {
        EnvelopeSidecar {
            algorithm_id: self.algorithm_id,
            iv: self.iv,
            encryption_generation: self.encryption_generation,
            original_mime_type: self.original_mime_type.clone(),
            plaintext_size: self.plaintext_size,
            ciphertext_size: self.ciphertext_size,
        }
    }

    /// Reassembles an envelope from a sidecar and the stored ciphertext.
    pub fn from_parts(sidecar: EnvelopeSidecar, ciphertext: Vec<u8>) -> Self {
        Self {
            ciphertext,
            algorithm_id: sidecar.algorithm_id,
            iv: sidecar.iv,
            encryption_generation: sidecar.encryption_generation,
            original_mime_type: sidecar.original_mime_type,
            plaintext_size: sidecar.plaintext_size,
            ciphertext_size: sidecar.ciphertext_size,
        }
    }
}

/// Associated data covering every sidecar field except the nonce (which the
/// AEAD authenticates itself) and the ciphertext size (checked structurally).
pub(crate) fn associated_data(
    algorithm: AlgorithmId,
    generation: u32,
    mime_type: &str,
    plaintext_size: u64,
) -> Vec<u8> {
    let alg = algorithm.as_str().as_bytes();
    let mime = mime_type.as_bytes();
    let mut aad = Vec::with_capacity(AAD_DOMAIN.len() + alg.len() + mime.len() + 24);
    aad.extend_from_slice(AAD_DOMAIN);
    aad.extend_from_slice(&(alg.len() as u32).to_be_bytes());
    aad.extend_from_slice(alg);
    aad.extend_from_slice(&generation.to_be_bytes());
    aad.extend_from_slice(&(mime.len() as u32).to_be_bytes());
    aad.extend_from_slice(mime);
    aad.extend_from_slice(&plaintext_size.to_be_bytes());
    aad
}
