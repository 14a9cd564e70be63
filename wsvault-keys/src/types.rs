//! Shared types for workspace key management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wsvault_crypto::{KdfParams, KeyFingerprint, Salt};

/// A member's role within a workspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceRole {
    Owner,
    Admin,
    Member,
}

/// The authenticated user performing an operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub role: WorkspaceRole,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: WorkspaceRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn owner(user_id: impl Into<String>) -> Self {
        Self::new(user_id, WorkspaceRole::Owner)
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id, WorkspaceRole::Admin)
    }

    pub fn member(user_id: impl Into<String>) -> Self {
        Self::new(user_id, WorkspaceRole::Member)
    }

    /// Owners and admins may write key metadata.
    pub fn is_privileged(&self) -> bool {
        matches!(self.role, WorkspaceRole::Owner | WorkspaceRole::Admin)
    }
}

/// The active key record for a workspace. Never contains the key itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceKeyMetadata {
    pub workspace_id: String,
    /// Starts at 1 and increases by one per rotation.
    pub generation: u32,
    pub salt: Salt,
    pub kdf_params: KdfParams,
    pub key_fingerprint: KeyFingerprint,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub rotated_by: Option<String>,
}

/// Input to [`crate::KeyMetadataStore::create`].
#[derive(Clone, Debug)]
pub struct NewKeyMetadata {
    pub workspace_id: String,
    pub salt: Salt,
    pub kdf_params: KdfParams,
    pub key_fingerprint: KeyFingerprint,
    pub actor: Actor,
}

/// Input to [`crate::KeyMetadataStore::rotate`].
#[derive(Clone, Debug)]
pub struct RotationRequest {
    pub workspace_id: String,
    pub new_salt: Salt,
    pub new_params: KdfParams,
    pub new_fingerprint: KeyFingerprint,
    pub actor: Actor,
    /// Fingerprint the caller believes is current; the write is rejected if
    /// the stored one differs.
    pub expected_fingerprint: KeyFingerprint,
}

/// Observable state of a [`crate::WorkspaceKeySession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// No key metadata exists for the workspace.
    Uninitialized,
    /// Metadata exists but no verified key is held.
    Locked,
    /// A verified key is held in memory.
    Ready,
}
