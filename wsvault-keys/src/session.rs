//! Per-workspace key session.
//!
//! A session is the only holder of a workspace key in the process. It moves
//! between three states:
//!
//! ```text
//! Uninitialized --initialize--> Ready
//! Locked        --unlock------> Ready
//! Ready         --lock--------> Locked
//! Ready         --rotate------> Ready (next generation)
//! ```
//!
//! The key sits behind an `Arc` that lock/unlock/rotate replace wholesale, so
//! an encrypt or decrypt already in flight finishes with the key it started
//! with. Store failures never leave the session outside these three states.

use crate::config::KeyServiceConfig;
use crate::derivation::derive_with_fingerprint;
use crate::error::{KeyError, KeyResult};
use crate::generation_registry::GenerationRegistry;
use crate::metadata_store::{KeyMetadataStore, bounded};
use crate::resolver::VersionResolver;
use crate::rotation::RotationCoordinator;
use crate::types::{Actor, NewKeyMetadata, SessionStatus};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use wsvault_crypto::{DerivedKey, EncryptedObjectEnvelope, KeyFingerprint, Salt, encrypt_blob};

/// A verified workspace key and the generation it belongs to.
pub struct ReadyKey {
    key: DerivedKey,
    generation: u32,
    fingerprint: KeyFingerprint,
}

impl ReadyKey {
    pub(crate) fn new(key: DerivedKey, generation: u32, fingerprint: KeyFingerprint) -> Self {
        Self {
            key,
            generation,
            fingerprint,
        }
    }

    /// The raw key. Callers must not persist it.
    pub fn key(&self) -> &DerivedKey {
        &self.key
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn fingerprint(&self) -> &KeyFingerprint {
        &self.fingerprint
    }

    /// Seals `plaintext` under this key and generation.
    pub fn encrypt(&self, plaintext: &[u8], mime_type: &str) -> KeyResult<EncryptedObjectEnvelope> {
        Ok(encrypt_blob(&self.key, self.generation, mime_type, plaintext)?)
    }

    /// Opens an envelope, dispatching on its generation.
    pub fn decrypt(&self, envelope: &EncryptedObjectEnvelope) -> KeyResult<Vec<u8>> {
        VersionResolver::decrypt(self, envelope)
    }
}

impl fmt::Debug for ReadyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadyKey")
            .field("generation", &self.generation)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

enum SessionState {
    Uninitialized,
    Locked,
    Ready(Arc<ReadyKey>),
}

impl SessionState {
    fn status(&self) -> SessionStatus {
        match self {
            SessionState::Uninitialized => SessionStatus::Uninitialized,
            SessionState::Locked => SessionStatus::Locked,
            SessionState::Ready(_) => SessionStatus::Ready,
        }
    }
}

/// In-memory key session for one workspace context.
pub struct WorkspaceKeySession {
    workspace_id: String,
    store: Arc<dyn KeyMetadataStore>,
    registry: GenerationRegistry,
    config: Arc<KeyServiceConfig>,
    state: RwLock<SessionState>,
}

impl WorkspaceKeySession {
    /// Opens a session, starting `Locked` if the workspace has key metadata
    /// and `Uninitialized` otherwise.
    pub async fn open(
        workspace_id: impl Into<String>,
        store: Arc<dyn KeyMetadataStore>,
        registry: GenerationRegistry,
        config: Arc<KeyServiceConfig>,
    ) -> KeyResult<Self> {
        let workspace_id = workspace_id.into();
        let existing = bounded(config.store_timeout(), "get", store.get(&workspace_id)).await?;

        let state = match existing {
            Some(row) => {
                registry.observe(&workspace_id, row.generation).await;
                SessionState::Locked
            }
            None => SessionState::Uninitialized,
        };
        debug!(workspace_id = %workspace_id, status = ?state.status(), "opened key session");

        Ok(Self {
            workspace_id,
            store,
            registry,
            config,
            state: RwLock::new(state),
        })
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.read().await.status()
    }

    /// Creates the workspace's first key generation and becomes `Ready`.
    pub async fn initialize(&self, passphrase: &str, actor: &Actor) -> KeyResult<()> {
        match self.status().await {
            SessionStatus::Uninitialized => {}
            _ => return Err(KeyError::AlreadyInitialized),
        }
        if !actor.is_privileged() {
            return Err(KeyError::Unauthorized(format!(
                "{} may not initialize workspace keys",
                actor.user_id
            )));
        }
        self.config.check_passphrase(passphrase)?;
        let params = self.config.new_generation_params()?;

        let salt = Salt::random();
        let (key, fingerprint) = derive_with_fingerprint(passphrase, salt, params).await?;

        let created = bounded(
            self.config.store_timeout(),
            "create",
            self.store.create(NewKeyMetadata {
                workspace_id: self.workspace_id.clone(),
                salt,
                kdf_params: params,
                key_fingerprint: fingerprint,
                actor: actor.clone(),
            }),
        )
        .await;

        let row = match created {
            Ok(row) => row,
            Err(KeyError::AlreadyInitialized) => {
                // Lost the race to another initializer.
                let mut state = self.state.write().await;
                if matches!(*state, SessionState::Uninitialized) {
                    *state = SessionState::Locked;
                }
                warn!(workspace_id = %self.workspace_id, "workspace initialized concurrently");
                return Err(KeyError::AlreadyInitialized);
            }
            Err(e) => return Err(e),
        };

        self.registry.observe(&self.workspace_id, row.generation).await;
        *self.state.write().await =
            SessionState::Ready(Arc::new(ReadyKey::new(key, row.generation, row.key_fingerprint)));
        info!(workspace_id = %self.workspace_id, generation = row.generation, "initialized workspace key");
        Ok(())
    }

    /// Verifies `passphrase` against the stored fingerprint and becomes
    /// `Ready` on a match. A mismatch leaves the session as it was.
    pub async fn unlock(&self, passphrase: &str) -> KeyResult<()> {
        let row = bounded(
            self.config.store_timeout(),
            "get",
            self.store.get(&self.workspace_id),
        )
        .await?;

        let Some(row) = row else {
            *self.state.write().await = SessionState::Uninitialized;
            return Err(KeyError::NotInitialized);
        };
        self.registry.observe(&self.workspace_id, row.generation).await;

        let (key, fingerprint) =
            derive_with_fingerprint(passphrase, row.salt, row.kdf_params).await?;
        if !fingerprint.ct_eq(&row.key_fingerprint) {
            warn!(workspace_id = %self.workspace_id, "unlock rejected: invalid passphrase");
            return Err(KeyError::InvalidPassphrase);
        }

        let mut state = self.state.write().await;
        if let SessionState::Ready(held) = &*state {
            if held.generation > row.generation {
                // A rotation on this session landed while we were deriving.
                return Ok(());
            }
        }
        *state = SessionState::Ready(Arc::new(ReadyKey::new(key, row.generation, fingerprint)));
        info!(workspace_id = %self.workspace_id, generation = row.generation, "unlocked workspace key");
        Ok(())
    }

    /// Discards the key and returns to `Locked`. No-op unless `Ready`.
    pub async fn lock(&self) {
        let mut state = self.state.write().await;
        if matches!(*state, SessionState::Ready(_)) {
            *state = SessionState::Locked;
            debug!(workspace_id = %self.workspace_id, "locked workspace key");
        }
    }

    /// Rotates the workspace to a key derived from `new_passphrase` and
    /// adopts it. Returns the new generation.
    pub async fn rotate(&self, new_passphrase: &str, actor: &Actor) -> KeyResult<u32> {
        let current = self.require_ready().await?;
        let coordinator = RotationCoordinator::new(
            self.store.clone(),
            self.registry.clone(),
            self.config.clone(),
        );
        let next = coordinator
            .rotate(&self.workspace_id, &current, new_passphrase, actor)
            .await?;

        let generation = next.generation;
        let mut state = self.state.write().await;
        match &*state {
            SessionState::Ready(held) if Arc::ptr_eq(held, &current) => {
                *state = SessionState::Ready(Arc::new(next));
            }
            _ => {
                // Locked (or re-keyed) while the rotation was in flight. The
                // new generation is live in the store; this session stays as
                // the caller left it.
                debug!(
                    workspace_id = %self.workspace_id,
                    generation,
                    "not adopting rotated key; session changed during rotation"
                );
            }
        }
        Ok(generation)
    }

    /// Returns the verified key, or `WorkspaceLocked`.
    ///
    /// A session whose generation has been superseded (another session
    /// rotated the workspace) locks itself here.
    pub async fn require_ready(&self) -> KeyResult<Arc<ReadyKey>> {
        let ready = match &*self.state.read().await {
            SessionState::Ready(key) => key.clone(),
            _ => return Err(KeyError::WorkspaceLocked),
        };

        if self
            .registry
            .is_superseded(&self.workspace_id, ready.generation)
            .await
        {
            self.invalidate(ready.generation).await;
            return Err(KeyError::WorkspaceLocked);
        }
        Ok(ready)
    }

    /// Checks the held key against the store's live fingerprint and locks if
    /// they differ. Detects rotations made by other processes.
    pub async fn verify_current(&self) -> KeyResult<()> {
        self.require_current().await.map(|_| ())
    }

    /// [`require_ready`](Self::require_ready) plus a store round trip
    /// confirming the held generation is still the live one. Every write
    /// path goes through here before sealing.
    pub async fn require_current(&self) -> KeyResult<Arc<ReadyKey>> {
        let ready = self.require_ready().await?;
        let row = bounded(
            self.config.store_timeout(),
            "get",
            self.store.get(&self.workspace_id),
        )
        .await?;

        match row {
            Some(row) if row.key_fingerprint.ct_eq(ready.fingerprint()) => Ok(ready),
            Some(row) => {
                self.registry.observe(&self.workspace_id, row.generation).await;
                self.invalidate(ready.generation).await;
                Err(KeyError::WorkspaceLocked)
            }
            None => {
                *self.state.write().await = SessionState::Uninitialized;
                Err(KeyError::NotInitialized)
            }
        }
    }

    /// Guarded encryption under the workspace's live generation.
    ///
    /// Fails `WorkspaceLocked` (and locks) if the workspace was rotated
    /// anywhere since this session unlocked.
    pub async fn encrypt(
        &self,
        plaintext: &[u8],
        mime_type: &str,
    ) -> KeyResult<EncryptedObjectEnvelope> {
        self.require_current().await?.encrypt(plaintext, mime_type)
    }

    /// Guarded decryption with generation dispatch.
    pub async fn decrypt(&self, envelope: &EncryptedObjectEnvelope) -> KeyResult<Vec<u8>> {
        let ready = self.require_ready().await?;
        let result = ready.decrypt(envelope);
        if matches!(result, Err(KeyError::WorkspaceLocked)) {
            self.invalidate(ready.generation).await;
        }
        result
    }

    /// Locks the session if it still holds `stale_generation` or older.
    async fn invalidate(&self, stale_generation: u32) {
        let mut state = self.state.write().await;
        if let SessionState::Ready(held) = &*state {
            if held.generation <= stale_generation {
                *state = SessionState::Locked;
                warn!(
                    workspace_id = %self.workspace_id,
                    generation = stale_generation,
                    "session key superseded; locking"
                );
            }
        }
    }
}

impl fmt::Debug for WorkspaceKeySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceKeySession")
            .field("workspace_id", &self.workspace_id)
            .finish_non_exhaustive()
    }
}
