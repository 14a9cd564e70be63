//! Adversarial tests for GenerationRegistry.
//!
//! Validates watermark monotonicity, per-workspace isolation, clone sharing
//! and concurrent observe/read correctness under contention.

use std::sync::Arc;
use wsvault_keys::GenerationRegistry;

#[tokio::test]
async fn unknown_workspace_has_no_watermark() {
    let registry = GenerationRegistry::new();
    assert_eq!(registry.latest("ws-missing").await, None);
    assert!(!registry.is_superseded("ws-missing", 1).await);
}

#[tokio::test]
async fn watermark_never_moves_backwards() {
    let registry = GenerationRegistry::new();

    assert_eq!(registry.observe("ws", 3).await, 3);
    assert_eq!(registry.observe("ws", 1).await, 3);
    assert_eq!(registry.observe("ws", 4).await, 4);
    assert_eq!(registry.latest("ws").await, Some(4));
}

#[tokio::test]
async fn superseded_only_by_strictly_newer() {
    let registry = GenerationRegistry::new();
    registry.observe("ws", 2).await;

    assert!(registry.is_superseded("ws", 1).await);
    assert!(!registry.is_superseded("ws", 2).await);
    assert!(!registry.is_superseded("ws", 3).await);
}

#[tokio::test]
async fn workspaces_are_independent() {
    let registry = GenerationRegistry::new();
    registry.observe("ws-a", 5).await;
    registry.observe("ws-b", 1).await;

    assert!(registry.is_superseded("ws-a", 4).await);
    assert!(!registry.is_superseded("ws-b", 1).await);
    assert_eq!(registry.len().await, 2);
}

#[tokio::test]
async fn forget_removes_watermark() {
    let registry = GenerationRegistry::new();
    registry.observe("ws", 2).await;

    assert_eq!(registry.forget("ws").await, Some(2));
    assert_eq!(registry.forget("ws").await, None);
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn clone_shares_same_underlying_data() {
    let registry = GenerationRegistry::new();
    let clone = registry.clone();

    registry.observe("ws", 7).await;

    assert_eq!(clone.latest("ws").await, Some(7));
    assert_eq!(clone.len().await, 1);
}

#[tokio::test]
async fn concurrent_observes_keep_maximum() {
    let registry = Arc::new(GenerationRegistry::new());
    let mut handles = Vec::new();

    for generation in 1..=100u32 {
        let reg = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            reg.observe("contested", generation).await;
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.latest("contested").await, Some(100));
}

#[tokio::test]
async fn concurrent_reads_while_writing() {
    let registry = Arc::new(GenerationRegistry::new());
    registry.observe("ws", 1).await;

    let mut handles = Vec::new();
    for i in 0..50u32 {
        let reg = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            assert!(reg.latest("ws").await.is_some(), "reader saw empty watermark");
        }));

        let reg = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            reg.observe("ws", i + 2).await;
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(registry.latest("ws").await, Some(51));
}

#[tokio::test]
async fn default_equals_new() {
    let a = GenerationRegistry::new();
    let b = GenerationRegistry::default();

    assert!(a.is_empty().await);
    assert!(b.is_empty().await);
}
