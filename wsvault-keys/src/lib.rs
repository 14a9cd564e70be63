//! Workspace key management for client-side encrypted file storage.
//!
//! Provides zero-knowledge workspace keys with:
//! - Passphrase-based sessions (initialize / unlock / lock / rotate)
//! - Optimistic-concurrency key rotation with stale-session invalidation
//! - Generation-gated decryption of stored objects
//! - Pluggable metadata and object stores (in-memory and JSON-file provided)
//!
//! The metadata store only ever sees salts, KDF parameters and one-way
//! fingerprints. Keys exist only inside [`WorkspaceKeySession`] objects.

pub mod config;
mod derivation;
pub mod error;
pub mod file_store;
pub mod generation_registry;
pub mod metadata_store;
pub mod objects;
pub mod resolver;
pub mod rotation;
pub mod session;
pub mod types;
pub mod workspace;

pub use config::KeyServiceConfig;
pub use error::{KeyError, KeyResult, StoreError, StoreResult};
pub use file_store::FileKeyMetadataStore;
pub use generation_registry::GenerationRegistry;
pub use metadata_store::{InMemoryKeyMetadataStore, KeyMetadataStore};
pub use objects::{
    DownloadedObject, EncryptedObjects, InMemoryObjectStore, ObjectStore, StoredObject,
    UploadedObject,
};
pub use resolver::{Resolution, VersionResolver};
pub use rotation::RotationCoordinator;
pub use session::{ReadyKey, WorkspaceKeySession};
pub use types::*;
pub use workspace::{ActiveWorkspace, KeyService};
