//! Key material, salts and KDF parameters.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of a workspace encryption key in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of a KDF salt in bytes.
pub const SALT_SIZE: usize = 16;

/// Symmetric key produced by [`crate::derive_key`].
///
/// Zeroized on drop. Deliberately not `Serialize`: a workspace key must never
/// reach durable storage.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_SIZE]);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Builds a key from a slice, checking its length.
    pub fn try_from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; KEY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: KEY_SIZE,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}

/// Generates a random key. Used for tests and for keys that are never
/// passphrase-derived.
pub fn generate_random_key() -> DerivedKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rng().fill_bytes(&mut bytes);
    DerivedKey(bytes)
}

/// Random per-generation KDF salt.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt(#[serde(with = "crate::encoding::base64_array")] [u8; SALT_SIZE]);

impl Salt {
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", hex::encode(self.0))
    }
}

/// Password-hashing algorithm recorded alongside every salt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KdfAlgorithm {
    Argon2id,
}

/// Cost parameters for the password KDF.
///
/// Stored with the salt so new generations can raise the cost without
/// invalidating records derived under older parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub algorithm: KdfAlgorithm,
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes over memory.
    pub iterations: u32,
    /// Degree of parallelism (lanes).
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            algorithm: KdfAlgorithm::Argon2id,
            memory_kib: 65536, // 64 MiB
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Minimal-cost parameters for tests. Never use for real workspaces.
    pub fn insecure_fast() -> Self {
        Self {
            algorithm: KdfAlgorithm::Argon2id,
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        }
    }

    /// Checks the parameters are accepted by the underlying algorithm.
    pub fn validate(&self) -> CryptoResult<()> {
        self.argon2_params().map(|_| ())
    }

    /// Whether these parameters meet a minimum cost policy.
    pub fn meets_floor(&self, min_memory_kib: u32, min_iterations: u32) -> bool {
        self.memory_kib >= min_memory_kib && self.iterations >= min_iterations
    }

    pub(crate) fn argon2_params(&self) -> CryptoResult<argon2::Params> {
        match self.algorithm {
            KdfAlgorithm::Argon2id => argon2::Params::new(
                self.memory_kib,
                self.iterations,
                self.parallelism,
                Some(KEY_SIZE),
            )
            .map_err(|e| CryptoError::InvalidKdfParams(e.to_string())),
        }
    }
}
