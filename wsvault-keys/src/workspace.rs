//! Key service entry point and the active workspace context.

use crate::config::KeyServiceConfig;
use crate::error::KeyResult;
use crate::generation_registry::GenerationRegistry;
use crate::metadata_store::KeyMetadataStore;
use crate::rotation::RotationCoordinator;
use crate::session::WorkspaceKeySession;
use std::sync::Arc;
use tracing::debug;

/// Hands out key sessions that share one store, registry and config.
#[derive(Clone)]
pub struct KeyService {
    store: Arc<dyn KeyMetadataStore>,
    registry: GenerationRegistry,
    config: Arc<KeyServiceConfig>,
}

impl KeyService {
    pub fn new(store: Arc<dyn KeyMetadataStore>, config: KeyServiceConfig) -> KeyResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            registry: GenerationRegistry::new(),
            config: Arc::new(config),
        })
    }

    /// Opens a fresh session for a workspace.
    pub async fn open_session(&self, workspace_id: &str) -> KeyResult<WorkspaceKeySession> {
        WorkspaceKeySession::open(
            workspace_id,
            self.store.clone(),
            self.registry.clone(),
            self.config.clone(),
        )
        .await
    }

    pub fn rotation_coordinator(&self) -> RotationCoordinator {
        RotationCoordinator::new(
            self.store.clone(),
            self.registry.clone(),
            self.config.clone(),
        )
    }

    pub fn registry(&self) -> &GenerationRegistry {
        &self.registry
    }

    pub fn config(&self) -> &KeyServiceConfig {
        &self.config
    }
}

/// The workspace context a user is currently working in.
///
/// Holds at most one session. Switching workspaces locks the previous
/// session before it is dropped, so its key does not outlive the switch.
pub struct ActiveWorkspace {
    service: KeyService,
    current: Option<WorkspaceKeySession>,
}

impl ActiveWorkspace {
    pub fn new(service: KeyService) -> Self {
        Self {
            service,
            current: None,
        }
    }

    /// Makes `workspace_id` the active workspace. Re-activating the current
    /// workspace keeps its session as is. If opening the new session fails,
    /// no workspace is active.
    pub async fn activate(&mut self, workspace_id: &str) -> KeyResult<&WorkspaceKeySession> {
        let session = match self.current.take() {
            Some(session) if session.workspace_id() == workspace_id => session,
            previous => {
                // The old key is gone before the new session is opened, so a
                // failed open leaves nothing active.
                if let Some(previous) = previous {
                    previous.lock().await;
                    debug!(
                        from = previous.workspace_id(),
                        to = workspace_id,
                        "switched active workspace"
                    );
                }
                self.service.open_session(workspace_id).await?
            }
        };
        Ok(&*self.current.insert(session))
    }

    pub fn current(&self) -> Option<&WorkspaceKeySession> {
        self.current.as_ref()
    }

    /// Locks and drops the active session.
    pub async fn deactivate(&mut self) {
        if let Some(session) = self.current.take() {
            session.lock().await;
        }
    }
}
