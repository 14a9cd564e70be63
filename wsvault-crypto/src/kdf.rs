//! Passphrase key derivation and key fingerprints.
//!
//! `derive_key` runs Argon2id over the passphrase to produce a root secret,
//! then expands the workspace encryption key from it with HKDF-SHA256.
//! `fingerprint` expands a separate 32-byte value from the encryption key
//! under a different label. The fingerprint is what the metadata store keeps
//! to verify an unlock; it is one-way, so holding it does not let anyone skip
//! the Argon2id cost when guessing passphrases.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, KEY_SIZE, KdfAlgorithm, KdfParams, Salt};
use argon2::{Algorithm, Argon2, Version};
use hkdf::Hkdf;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// HKDF label for the workspace encryption key.
pub const ENCRYPTION_KEY_LABEL: &[u8] = b"wsvault/encryption-key/v1";

/// HKDF label for key fingerprints. Must never equal [`ENCRYPTION_KEY_LABEL`].
pub const FINGERPRINT_LABEL: &[u8] = b"wsvault/key-fingerprint/v1";

/// Size of a key fingerprint in bytes.
pub const FINGERPRINT_SIZE: usize = 32;

/// Derives the workspace encryption key from a passphrase.
///
/// Deterministic in `(passphrase, salt, params)` and deliberately slow.
pub fn derive_key(passphrase: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<DerivedKey> {
    let mut root = Zeroizing::new([0u8; KEY_SIZE]);
    match params.algorithm {
        KdfAlgorithm::Argon2id => {
            let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.argon2_params()?);
            argon2
                .hash_password_into(passphrase.as_bytes(), salt.as_bytes(), &mut root[..])
                .map_err(|e| CryptoError::KeyDerivation(format!("argon2id failed: {e}")))?;
        }
    }

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    Hkdf::<Sha256>::new(Some(&salt.as_bytes()[..]), &root[..])
        .expand(ENCRYPTION_KEY_LABEL, &mut key[..])
        .map_err(|e| CryptoError::KeyDerivation(format!("HKDF expand failed: {e}")))?;

    Ok(DerivedKey::from_bytes(*key))
}

/// Computes the verification fingerprint of a derived key.
pub fn fingerprint(key: &DerivedKey) -> CryptoResult<KeyFingerprint> {
    let mut out = [0u8; FINGERPRINT_SIZE];
    Hkdf::<Sha256>::new(None, key.as_bytes())
        .expand(FINGERPRINT_LABEL, &mut out)
        .map_err(|e| CryptoError::KeyDerivation(format!("HKDF expand failed: {e}")))?;
    Ok(KeyFingerprint(out))
}

/// One-way digest identifying a derived key.
///
/// Equality is constant-time. Serialized as lowercase hex.
#[derive(Clone, Copy)]
pub struct KeyFingerprint([u8; FINGERPRINT_SIZE]);

impl KeyFingerprint {
    pub fn from_bytes(bytes: [u8; FINGERPRINT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| CryptoError::InvalidFingerprint(format!("not hex: {e}")))?;
        let arr: [u8; FINGERPRINT_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidFingerprint(format!(
                "must be {FINGERPRINT_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Constant-time comparison.
    pub fn ct_eq(&self, other: &KeyFingerprint) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl PartialEq for KeyFingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other)
    }
}

impl Eq for KeyFingerprint {}

impl fmt::Debug for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyFingerprint({}…)", &self.to_hex()[..12])
    }
}

impl Serialize for KeyFingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for KeyFingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
