//! Key metadata persistence seam.
//!
//! Production deployments back this with the service's relational store,
//! whose own access control (members read, owners/admins write) applies.
//! [`InMemoryKeyMetadataStore`] implements the same contract for embedding
//! and tests.

use crate::error::{KeyError, KeyResult, StoreError, StoreResult};
use crate::types::{NewKeyMetadata, RotationRequest, WorkspaceKeyMetadata};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Per-workspace key metadata store.
///
/// `create` and `rotate` must each be atomic: a failed call leaves the
/// stored row exactly as it was.
#[async_trait]
pub trait KeyMetadataStore: Send + Sync {
    /// Returns the active row, or `None` if the workspace has no key yet.
    async fn get(&self, workspace_id: &str) -> StoreResult<Option<WorkspaceKeyMetadata>>;

    /// Creates generation 1. Fails with `AlreadyInitialized` if a row exists.
    async fn create(&self, new: NewKeyMetadata) -> StoreResult<WorkspaceKeyMetadata>;

    /// Replaces the row with the next generation if the actor is privileged
    /// and the stored fingerprint equals `expected_fingerprint`.
    async fn rotate(&self, request: RotationRequest) -> StoreResult<WorkspaceKeyMetadata>;
}

/// Runs a store call under the configured timeout.
pub(crate) async fn bounded<T, F>(timeout: Duration, op: &'static str, fut: F) -> KeyResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(KeyError::from),
        Err(_) => {
            warn!(op, timeout_ms = timeout.as_millis() as u64, "store call timed out");
            Err(KeyError::StoreUnavailable(format!(
                "{op} timed out after {}ms",
                timeout.as_millis()
            )))
        }
    }
}

/// Builds generation 1 from a create request.
pub(crate) fn first_generation(new: NewKeyMetadata) -> StoreResult<WorkspaceKeyMetadata> {
    if !new.actor.is_privileged() {
        return Err(StoreError::Unauthorized(format!(
            "{} may not initialize workspace keys",
            new.actor.user_id
        )));
    }
    let now = Utc::now();
    Ok(WorkspaceKeyMetadata {
        workspace_id: new.workspace_id,
        generation: 1,
        salt: new.salt,
        kdf_params: new.kdf_params,
        key_fingerprint: new.key_fingerprint,
        created_by: new.actor.user_id,
        created_at: now,
        updated_at: now,
        rotated_by: None,
    })
}

/// Applies a rotation to the current row, enforcing privilege and the
/// optimistic fingerprint check.
pub(crate) fn next_generation(
    current: &WorkspaceKeyMetadata,
    request: RotationRequest,
) -> StoreResult<WorkspaceKeyMetadata> {
    if !request.actor.is_privileged() {
        return Err(StoreError::Unauthorized(format!(
            "{} may not rotate workspace keys",
            request.actor.user_id
        )));
    }
    if !current.key_fingerprint.ct_eq(&request.expected_fingerprint) {
        return Err(StoreError::ConcurrentRotationConflict);
    }
    Ok(WorkspaceKeyMetadata {
        workspace_id: current.workspace_id.clone(),
        generation: current.generation + 1,
        salt: request.new_salt,
        kdf_params: request.new_params,
        key_fingerprint: request.new_fingerprint,
        created_by: current.created_by.clone(),
        created_at: current.created_at,
        updated_at: Utc::now(),
        rotated_by: Some(request.actor.user_id),
    })
}

/// Thread-safe in-process metadata store. Clones share the same rows.
#[derive(Clone, Default)]
pub struct InMemoryKeyMetadataStore {
    rows: Arc<RwLock<HashMap<String, WorkspaceKeyMetadata>>>,
}

impl InMemoryKeyMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of initialized workspaces.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns true if no workspace has been initialized.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl KeyMetadataStore for InMemoryKeyMetadataStore {
    async fn get(&self, workspace_id: &str) -> StoreResult<Option<WorkspaceKeyMetadata>> {
        Ok(self.rows.read().await.get(workspace_id).cloned())
    }

    async fn create(&self, new: NewKeyMetadata) -> StoreResult<WorkspaceKeyMetadata> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&new.workspace_id) {
            return Err(StoreError::AlreadyInitialized(new.workspace_id));
        }
        let row = first_generation(new)?;
        rows.insert(row.workspace_id.clone(), row.clone());
        debug!(workspace_id = %row.workspace_id, "created key metadata");
        Ok(row)
    }

    async fn rotate(&self, request: RotationRequest) -> StoreResult<WorkspaceKeyMetadata> {
        let mut rows = self.rows.write().await;
        let current = rows
            .get(&request.workspace_id)
            .ok_or_else(|| StoreError::NotFound(request.workspace_id.clone()))?;
        let next = next_generation(current, request)?;
        rows.insert(next.workspace_id.clone(), next.clone());
        debug!(
            workspace_id = %next.workspace_id,
            generation = next.generation,
            "rotated key metadata"
        );
        Ok(next)
    }
}
