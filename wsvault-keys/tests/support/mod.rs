//! Shared test helpers for key session integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use wsvault_crypto::KdfParams;
use wsvault_keys::{
    Actor, GenerationRegistry, InMemoryKeyMetadataStore, KeyMetadataStore, KeyServiceConfig,
    NewKeyMetadata, RotationRequest, StoreError, StoreResult, WorkspaceKeyMetadata,
    WorkspaceKeySession,
};

pub const WORKSPACE: &str = "ws-acme";
pub const PASSPHRASE: &str = "Sunrise-42!";
pub const ROTATED_PASSPHRASE: &str = "Autumn-7$";

/// Cheap KDF, short store timeout.
pub fn test_config() -> KeyServiceConfig {
    KeyServiceConfig {
        store_timeout_ms: 200,
        min_passphrase_len: 8,
        kdf: KdfParams::insecure_fast(),
        min_kdf_memory_kib: 8,
        min_kdf_iterations: 1,
    }
}

pub fn owner() -> Actor {
    Actor::owner("user-owner")
}

pub fn admin() -> Actor {
    Actor::admin("user-admin")
}

pub fn member() -> Actor {
    Actor::member("user-member")
}

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("wsvault_keys=debug")
        .with_test_writer()
        .try_init();
}

/// Opens a session against `store` with its own registry.
pub async fn open_session(store: Arc<dyn KeyMetadataStore>) -> WorkspaceKeySession {
    open_session_with(store, GenerationRegistry::new()).await
}

pub async fn open_session_with(
    store: Arc<dyn KeyMetadataStore>,
    registry: GenerationRegistry,
) -> WorkspaceKeySession {
    WorkspaceKeySession::open(WORKSPACE, store, registry, Arc::new(test_config()))
        .await
        .expect("open session")
}

/// A store with a Ready session already initialized by the owner.
pub async fn initialized() -> (
    Arc<InMemoryKeyMetadataStore>,
    GenerationRegistry,
    WorkspaceKeySession,
) {
    let store = Arc::new(InMemoryKeyMetadataStore::new());
    let registry = GenerationRegistry::new();
    let session = open_session_with(store.clone(), registry.clone()).await;
    session
        .initialize(PASSPHRASE, &owner())
        .await
        .expect("initialize");
    (store, registry, session)
}

/// In-memory store whose calls can be made to fail or stall on demand.
#[derive(Clone, Default)]
pub struct FaultyStore {
    pub inner: InMemoryKeyMetadataStore,
    fail: Arc<AtomicBool>,
    stall: Arc<AtomicBool>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call returns `StoreError::Unavailable`.
    pub fn set_failing(&self, on: bool) {
        self.fail.store(on, Ordering::SeqCst);
    }

    /// Every call sleeps well past the test timeout.
    pub fn set_stalled(&self, on: bool) {
        self.stall.store(on, Ordering::SeqCst);
    }

    async fn fault(&self) -> StoreResult<()> {
        if self.stall.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyMetadataStore for FaultyStore {
    async fn get(&self, workspace_id: &str) -> StoreResult<Option<WorkspaceKeyMetadata>> {
        self.fault().await?;
        self.inner.get(workspace_id).await
    }

    async fn create(&self, new: NewKeyMetadata) -> StoreResult<WorkspaceKeyMetadata> {
        self.fault().await?;
        self.inner.create(new).await
    }

    async fn rotate(&self, request: RotationRequest) -> StoreResult<WorkspaceKeyMetadata> {
        self.fault().await?;
        self.inner.rotate(request).await
    }
}
