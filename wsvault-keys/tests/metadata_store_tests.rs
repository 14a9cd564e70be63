//! KeyMetadataStore contract, run against both bundled implementations.

mod support;

use pretty_assertions::assert_eq;
use support::*;
use wsvault_crypto::{KdfParams, KeyFingerprint, Salt, fingerprint, generate_random_key};
use wsvault_keys::{
    Actor, FileKeyMetadataStore, InMemoryKeyMetadataStore, KeyMetadataStore, NewKeyMetadata,
    RotationRequest, StoreError,
};

fn random_fingerprint() -> KeyFingerprint {
    fingerprint(&generate_random_key()).unwrap()
}

fn new_row(workspace_id: &str, actor: Actor) -> NewKeyMetadata {
    NewKeyMetadata {
        workspace_id: workspace_id.into(),
        salt: Salt::random(),
        kdf_params: KdfParams::insecure_fast(),
        key_fingerprint: random_fingerprint(),
        actor,
    }
}

fn rotation(workspace_id: &str, expected: KeyFingerprint, actor: Actor) -> RotationRequest {
    RotationRequest {
        workspace_id: workspace_id.into(),
        new_salt: Salt::random(),
        new_params: KdfParams::insecure_fast(),
        new_fingerprint: random_fingerprint(),
        actor,
        expected_fingerprint: expected,
    }
}

async fn exercise_contract(store: &dyn KeyMetadataStore) {
    assert!(store.get("ws-1").await.unwrap().is_none());

    let created = store.create(new_row("ws-1", owner())).await.unwrap();
    assert_eq!(created.generation, 1);
    assert_eq!(created.created_by, "user-owner");
    assert!(created.rotated_by.is_none());
    assert_eq!(store.get("ws-1").await.unwrap(), Some(created.clone()));

    let dup = store.create(new_row("ws-1", owner())).await.unwrap_err();
    assert!(matches!(dup, StoreError::AlreadyInitialized(_)));
    assert_eq!(store.get("ws-1").await.unwrap(), Some(created.clone()));

    let denied = store
        .rotate(rotation("ws-1", created.key_fingerprint, member()))
        .await
        .unwrap_err();
    assert!(matches!(denied, StoreError::Unauthorized(_)));

    let stale = store
        .rotate(rotation("ws-1", random_fingerprint(), owner()))
        .await
        .unwrap_err();
    assert!(matches!(stale, StoreError::ConcurrentRotationConflict));
    assert_eq!(store.get("ws-1").await.unwrap(), Some(created.clone()));

    let request = rotation("ws-1", created.key_fingerprint, admin());
    let new_fp = request.new_fingerprint;
    let rotated = store.rotate(request).await.unwrap();
    assert_eq!(rotated.generation, 2);
    assert_eq!(rotated.key_fingerprint, new_fp);
    assert_eq!(rotated.rotated_by.as_deref(), Some("user-admin"));
    assert_eq!(store.get("ws-1").await.unwrap(), Some(rotated));

    let missing = store
        .rotate(rotation("ws-unknown", created.key_fingerprint, owner()))
        .await
        .unwrap_err();
    assert!(matches!(missing, StoreError::NotFound(_)));

    let member_create = store.create(new_row("ws-2", member())).await.unwrap_err();
    assert!(matches!(member_create, StoreError::Unauthorized(_)));
    assert!(store.get("ws-2").await.unwrap().is_none());
}

#[tokio::test]
async fn in_memory_store_honours_contract() {
    exercise_contract(&InMemoryKeyMetadataStore::new()).await;
}

#[tokio::test]
async fn file_store_honours_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileKeyMetadataStore::open(dir.path()).await.unwrap();
    exercise_contract(&store).await;
}

#[tokio::test]
async fn in_memory_clones_share_rows() {
    let store = InMemoryKeyMetadataStore::new();
    let clone = store.clone();
    store.create(new_row("ws-1", owner())).await.unwrap();

    assert_eq!(clone.len().await, 1);
    assert!(clone.get("ws-1").await.unwrap().is_some());
}

#[tokio::test]
async fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let created = {
        let store = FileKeyMetadataStore::open(dir.path()).await.unwrap();
        store.create(new_row("ws-1", owner())).await.unwrap()
    };

    let reopened = FileKeyMetadataStore::open(dir.path()).await.unwrap();
    assert_eq!(reopened.get("ws-1").await.unwrap(), Some(created));
}

#[tokio::test]
async fn file_store_keeps_lookalike_ids_apart() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileKeyMetadataStore::open(dir.path()).await.unwrap();

    store.create(new_row("team/alpha", owner())).await.unwrap();
    store.create(new_row("team_2falpha", owner())).await.unwrap();
    store.create(new_row("../escape", owner())).await.unwrap();

    for id in ["team/alpha", "team_2falpha", "../escape"] {
        let row = store.get(id).await.unwrap().unwrap();
        assert_eq!(row.workspace_id, id);
    }
    let files = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(files, 3);
}

#[tokio::test]
async fn file_store_reports_corrupt_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileKeyMetadataStore::open(dir.path()).await.unwrap();
    std::fs::write(dir.path().join("ws-1.json"), b"{ not json").unwrap();

    let err = store.get("ws-1").await.unwrap_err();
    assert!(matches!(err, StoreError::Serialization(_)));
}

#[tokio::test]
async fn stored_row_never_contains_the_key() {
    let dir = tempfile::tempdir().unwrap();
    let key = generate_random_key();
    let store = FileKeyMetadataStore::open(dir.path()).await.unwrap();
    store
        .create(NewKeyMetadata {
            key_fingerprint: fingerprint(&key).unwrap(),
            ..new_row("ws-1", owner())
        })
        .await
        .unwrap();

    let raw = std::fs::read(dir.path().join("ws-1.json")).unwrap();
    let row: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    let mut fields: Vec<&str> = row
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    fields.sort_unstable();
    assert_eq!(
        fields,
        [
            "created_at",
            "created_by",
            "generation",
            "kdf_params",
            "key_fingerprint",
            "rotated_by",
            "salt",
            "updated_at",
            "workspace_id",
        ]
    );
}
