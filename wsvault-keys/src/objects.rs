//! Encrypted object upload/download.
//!
//! Seals file bytes under the session's workspace key before they reach the
//! object store, and stores the envelope sidecar beside the ciphertext.
//! Plaintext never crosses the [`ObjectStore`] boundary.

use crate::config::KeyServiceConfig;
use crate::error::{KeyError, KeyResult, StoreResult};
use crate::metadata_store::bounded;
use crate::session::WorkspaceKeySession;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;
use wsvault_crypto::{EncryptedObjectEnvelope, EnvelopeSidecar};

/// Ciphertext bytes plus sidecar, as held by an object store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredObject {
    pub workspace_id: String,
    pub object_id: String,
    pub sidecar: EnvelopeSidecar,
    pub ciphertext: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

impl StoredObject {
    pub fn envelope(&self) -> EncryptedObjectEnvelope {
        EncryptedObjectEnvelope::from_parts(self.sidecar.clone(), self.ciphertext.clone())
    }
}

/// Opaque ciphertext storage keyed by workspace and object ID.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, object: StoredObject) -> StoreResult<()>;

    async fn get(&self, workspace_id: &str, object_id: &str) -> StoreResult<Option<StoredObject>>;

    /// Returns whether an object was removed.
    async fn delete(&self, workspace_id: &str, object_id: &str) -> StoreResult<bool>;
}

/// In-process object store. Clones share the same objects.
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<HashMap<(String, String), StoredObject>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, object: StoredObject) -> StoreResult<()> {
        let key = (object.workspace_id.clone(), object.object_id.clone());
        self.objects.write().await.insert(key, object);
        Ok(())
    }

    async fn get(&self, workspace_id: &str, object_id: &str) -> StoreResult<Option<StoredObject>> {
        let key = (workspace_id.to_string(), object_id.to_string());
        Ok(self.objects.read().await.get(&key).cloned())
    }

    async fn delete(&self, workspace_id: &str, object_id: &str) -> StoreResult<bool> {
        let key = (workspace_id.to_string(), object_id.to_string());
        Ok(self.objects.write().await.remove(&key).is_some())
    }
}

/// Result of a successful upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedObject {
    pub object_id: String,
    pub encryption_generation: u32,
    pub plaintext_size: u64,
    pub ciphertext_size: u64,
}

/// A decrypted object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedObject {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Encrypts on upload and decrypts on download through a workspace session.
pub struct EncryptedObjects {
    store: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl EncryptedObjects {
    pub fn new(store: Arc<dyn ObjectStore>, config: &KeyServiceConfig) -> Self {
        Self {
            store,
            timeout: config.store_timeout(),
        }
    }

    /// Seals `bytes` under the session's key and stores it under a new ID.
    pub async fn upload(
        &self,
        session: &WorkspaceKeySession,
        bytes: &[u8],
        mime_type: &str,
    ) -> KeyResult<UploadedObject> {
        let envelope = session.encrypt(bytes, mime_type).await?;
        let object_id = Uuid::new_v4().to_string();

        let uploaded = UploadedObject {
            object_id: object_id.clone(),
            encryption_generation: envelope.encryption_generation,
            plaintext_size: envelope.plaintext_size,
            ciphertext_size: envelope.ciphertext_size,
        };
        let stored = StoredObject {
            workspace_id: session.workspace_id().to_string(),
            object_id,
            sidecar: envelope.sidecar(),
            ciphertext: envelope.ciphertext,
            stored_at: Utc::now(),
        };
        bounded(self.timeout, "put", self.store.put(stored)).await?;

        debug!(
            workspace_id = session.workspace_id(),
            object_id = %uploaded.object_id,
            generation = uploaded.encryption_generation,
            "uploaded object ({} bytes encrypted)",
            uploaded.ciphertext_size
        );
        Ok(uploaded)
    }

    /// Fetches and decrypts an object.
    pub async fn download(
        &self,
        session: &WorkspaceKeySession,
        object_id: &str,
    ) -> KeyResult<DownloadedObject> {
        let stored = bounded(
            self.timeout,
            "get",
            self.store.get(session.workspace_id(), object_id),
        )
        .await?
        .ok_or_else(|| KeyError::ObjectNotFound(object_id.to_string()))?;

        let envelope = stored.envelope();
        let bytes = session.decrypt(&envelope).await?;
        Ok(DownloadedObject {
            mime_type: envelope.original_mime_type,
            bytes,
        })
    }

    /// Deletes an object. Requires no key: ciphertext is opaque.
    pub async fn delete(&self, workspace_id: &str, object_id: &str) -> KeyResult<()> {
        let removed = bounded(
            self.timeout,
            "delete",
            self.store.delete(workspace_id, object_id),
        )
        .await?;
        if !removed {
            return Err(KeyError::ObjectNotFound(object_id.to_string()));
        }
        Ok(())
    }
}
