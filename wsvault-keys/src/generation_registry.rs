//! Thread-safe registry of the newest key generation seen per workspace.
//!
//! Sessions consult it on every guarded call. When a rotation publishes a
//! newer generation, every session still holding an older key for that
//! workspace locks itself on its next call. Only generation numbers live
//! here; key material never does.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared per-workspace generation watermark.
#[derive(Clone, Default)]
pub struct GenerationRegistry {
    latest: Arc<RwLock<HashMap<String, u32>>>,
}

impl GenerationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `generation` exists for a workspace. Never moves the
    /// watermark backwards. Returns the watermark after the update.
    pub async fn observe(&self, workspace_id: &str, generation: u32) -> u32 {
        let mut latest = self.latest.write().await;
        let entry = latest.entry(workspace_id.to_string()).or_insert(generation);
        if generation > *entry {
            *entry = generation;
        }
        *entry
    }

    /// Newest generation observed for a workspace, if any.
    pub async fn latest(&self, workspace_id: &str) -> Option<u32> {
        self.latest.read().await.get(workspace_id).copied()
    }

    /// True if a generation newer than `generation` has been observed.
    pub async fn is_superseded(&self, workspace_id: &str, generation: u32) -> bool {
        self.latest(workspace_id)
            .await
            .is_some_and(|latest| latest > generation)
    }

    /// Drops the watermark for a workspace (e.g. after it is deleted).
    pub async fn forget(&self, workspace_id: &str) -> Option<u32> {
        self.latest.write().await.remove(workspace_id)
    }

    /// Returns the number of tracked workspaces.
    pub async fn len(&self) -> usize {
        self.latest.read().await.len()
    }

    /// Returns true if no workspaces are tracked.
    pub async fn is_empty(&self) -> bool {
        self.latest.read().await.is_empty()
    }
}
