//! Key service configuration.

use crate::error::{KeyError, KeyResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use wsvault_crypto::KdfParams;

/// Configuration for workspace key sessions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyServiceConfig {
    /// Upper bound on a single metadata/object store call (milliseconds).
    pub store_timeout_ms: u64,

    /// Minimum passphrase length for new generations (characters).
    pub min_passphrase_len: usize,

    /// KDF cost used for new generations (initialize and rotate).
    pub kdf: KdfParams,

    /// Floor on `kdf.memory_kib` for new generations.
    pub min_kdf_memory_kib: u32,

    /// Floor on `kdf.iterations` for new generations.
    pub min_kdf_iterations: u32,
}

impl Default for KeyServiceConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: 5_000,
            min_passphrase_len: 8,
            kdf: KdfParams::default(),
            min_kdf_memory_kib: 19_456, // 19 MiB
            min_kdf_iterations: 2,
        }
    }
}

impl KeyServiceConfig {
    /// Parses a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> KeyResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| KeyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn validate(&self) -> KeyResult<()> {
        if self.store_timeout_ms == 0 {
            return Err(KeyError::Config("store_timeout_ms must be positive".into()));
        }
        self.new_generation_params().map(|_| ())
    }

    /// KDF parameters for a new generation, checked against the floor.
    pub fn new_generation_params(&self) -> KeyResult<KdfParams> {
        self.kdf
            .validate()
            .map_err(|e| KeyError::Config(e.to_string()))?;
        if !self
            .kdf
            .meets_floor(self.min_kdf_memory_kib, self.min_kdf_iterations)
        {
            return Err(KeyError::Config(format!(
                "kdf cost below floor (memory {} KiB < {} or iterations {} < {})",
                self.kdf.memory_kib,
                self.min_kdf_memory_kib,
                self.kdf.iterations,
                self.min_kdf_iterations
            )));
        }
        Ok(self.kdf)
    }

    /// Enforces the passphrase length policy for new generations.
    pub fn check_passphrase(&self, passphrase: &str) -> KeyResult<()> {
        if passphrase.chars().count() < self.min_passphrase_len {
            return Err(KeyError::PassphraseTooShort {
                min: self.min_passphrase_len,
            });
        }
        Ok(())
    }
}
