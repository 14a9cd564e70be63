//! Workspace key rotation.
//!
//! Rotation replaces the workspace's salt, parameters and fingerprint with a
//! new generation. The store write is guarded by the fingerprint the caller
//! holds, so of two racing rotations exactly one lands; the loser gets
//! `ConcurrentRotationConflict` and must unlock with the current passphrase
//! before retrying. Nothing is re-encrypted.

use crate::config::KeyServiceConfig;
use crate::derivation::derive_with_fingerprint;
use crate::error::{KeyError, KeyResult};
use crate::generation_registry::GenerationRegistry;
use crate::metadata_store::{KeyMetadataStore, bounded};
use crate::session::ReadyKey;
use crate::types::{Actor, RotationRequest};
use std::sync::Arc;
use tracing::{info, warn};
use wsvault_crypto::Salt;

/// Coordinates privileged key rotation for workspaces.
pub struct RotationCoordinator {
    store: Arc<dyn KeyMetadataStore>,
    registry: GenerationRegistry,
    config: Arc<KeyServiceConfig>,
}

impl RotationCoordinator {
    pub fn new(
        store: Arc<dyn KeyMetadataStore>,
        registry: GenerationRegistry,
        config: Arc<KeyServiceConfig>,
    ) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    /// Rotates `workspace_id` away from `current` to a key derived from
    /// `new_passphrase`.
    ///
    /// On success the new generation is published to the registry, which
    /// invalidates every other session for the workspace. On failure the
    /// stored generation and `current` are untouched.
    pub async fn rotate(
        &self,
        workspace_id: &str,
        current: &ReadyKey,
        new_passphrase: &str,
        actor: &Actor,
    ) -> KeyResult<ReadyKey> {
        if !actor.is_privileged() {
            warn!(workspace_id, user_id = %actor.user_id, "rotation denied");
            return Err(KeyError::Unauthorized(format!(
                "{} may not rotate workspace keys",
                actor.user_id
            )));
        }
        self.config.check_passphrase(new_passphrase)?;
        let params = self.config.new_generation_params()?;

        let salt = Salt::random();
        let (key, fingerprint) = derive_with_fingerprint(new_passphrase, salt, params).await?;

        let request = RotationRequest {
            workspace_id: workspace_id.to_string(),
            new_salt: salt,
            new_params: params,
            new_fingerprint: fingerprint,
            actor: actor.clone(),
            expected_fingerprint: *current.fingerprint(),
        };
        let row = bounded(
            self.config.store_timeout(),
            "rotate",
            self.store.rotate(request),
        )
        .await
        .inspect_err(|e| warn!(workspace_id, "rotation failed: {e}"))?;

        self.registry.observe(workspace_id, row.generation).await;
        info!(
            workspace_id,
            from_generation = current.generation(),
            to_generation = row.generation,
            "rotated workspace key"
        );

        Ok(ReadyKey::new(key, row.generation, row.key_fingerprint))
    }
}
