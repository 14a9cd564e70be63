//! JSON-file key metadata store.
//!
//! One file per workspace under a root directory. Writes go to a temporary
//! file that is renamed over the target, so a crash mid-write never leaves a
//! half-written row. A process-wide mutex serializes check-and-write.

use crate::error::{StoreError, StoreResult};
use crate::metadata_store::{KeyMetadataStore, first_generation, next_generation};
use crate::types::{NewKeyMetadata, RotationRequest, WorkspaceKeyMetadata};
use async_trait::async_trait;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Key metadata store persisted as JSON files.
pub struct FileKeyMetadataStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

/// Maps a workspace ID to a file name. ASCII alphanumerics and `-` pass
/// through; every other byte becomes `_xx`, which keeps the mapping
/// injective.
fn file_name_for(workspace_id: &str) -> String {
    let mut name = String::with_capacity(workspace_id.len() + 5);
    for b in workspace_id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            name.push(b as char);
        } else {
            let _ = write!(name, "_{b:02x}");
        }
    }
    name.push_str(".json");
    name
}

impl FileKeyMetadataStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, workspace_id: &str) -> PathBuf {
        self.root.join(file_name_for(workspace_id))
    }

    async fn read_row(&self, workspace_id: &str) -> StoreResult<Option<WorkspaceKeyMetadata>> {
        let path = self.path_for(workspace_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let row: WorkspaceKeyMetadata = serde_json::from_slice(&bytes)?;
        if row.workspace_id != workspace_id {
            return Err(StoreError::Unavailable(format!(
                "{} holds metadata for {}",
                path.display(),
                row.workspace_id
            )));
        }
        Ok(Some(row))
    }

    async fn write_row(&self, row: &WorkspaceKeyMetadata) -> StoreResult<()> {
        let path = self.path_for(&row.workspace_id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(row)?;
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyMetadataStore for FileKeyMetadataStore {
    async fn get(&self, workspace_id: &str) -> StoreResult<Option<WorkspaceKeyMetadata>> {
        self.read_row(workspace_id).await
    }

    async fn create(&self, new: NewKeyMetadata) -> StoreResult<WorkspaceKeyMetadata> {
        let _guard = self.write_lock.lock().await;
        if self.read_row(&new.workspace_id).await?.is_some() {
            return Err(StoreError::AlreadyInitialized(new.workspace_id));
        }
        let row = first_generation(new)?;
        self.write_row(&row).await?;
        debug!(workspace_id = %row.workspace_id, "wrote key metadata file");
        Ok(row)
    }

    async fn rotate(&self, request: RotationRequest) -> StoreResult<WorkspaceKeyMetadata> {
        let _guard = self.write_lock.lock().await;
        let current = self
            .read_row(&request.workspace_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(request.workspace_id.clone()))?;
        let next = next_generation(&current, request)?;
        self.write_row(&next).await?;
        debug!(
            workspace_id = %next.workspace_id,
            generation = next.generation,
            "rewrote key metadata file"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_injective_for_lookalikes() {
        assert_eq!(file_name_for("team-1"), "team-1.json");
        assert_ne!(file_name_for("a.b"), file_name_for("a_b"));
        assert_eq!(file_name_for("a/b"), "a_2fb.json");
        assert_eq!(file_name_for("../x"), "_2e_2e_2fx.json");
    }
}
