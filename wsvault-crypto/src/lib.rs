//! Encryption primitives for workspace vaults.
//!
//! Provides workspace-key encryption using:
//! - Argon2id for key derivation from a shared workspace passphrase
//! - HKDF-SHA256 for domain-separated sub-keys and key fingerprints
//! - ChaCha20-Poly1305 for authenticated blob encryption
//! - Key zeroization on drop
//!
//! # Architecture
//!
//! 1. **Workspace Key**: Derived from the workspace passphrase, a random
//!    per-generation salt and stored cost parameters. Never stored.
//!
//! 2. **Fingerprint**: A one-way digest of the workspace key under a separate
//!    HKDF label. Stored centrally and used only to verify an unlock.
//!
//! 3. **Envelope**: Each stored object is sealed under the workspace key with
//!    a fresh nonce. The envelope records the key generation it was sealed
//!    under so readers can refuse objects from retired generations.

mod cipher;
mod encoding;
pub mod envelope;
mod error;
pub mod kdf;
mod key;

pub use cipher::{decrypt_blob, encrypt_blob};
pub use envelope::{AlgorithmId, EncryptedObjectEnvelope, EnvelopeSidecar, NONCE_SIZE, TAG_SIZE};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{FINGERPRINT_SIZE, KeyFingerprint, derive_key, fingerprint};
pub use key::{
    DerivedKey, KEY_SIZE, KdfAlgorithm, KdfParams, SALT_SIZE, Salt, generate_random_key,
};
