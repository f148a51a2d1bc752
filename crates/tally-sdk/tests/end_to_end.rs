//! End-to-end engine behavior over the in-memory store.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tally_sdk::{
    Dataset, DisclosureConfigBuilder, Engine, EngineConfig, EngineConfigBuilder, EngineError,
    MemberKind, MemoryStore, RemoteStore, StorePath, UnitTag,
};

fn fast_config() -> EngineConfig {
    EngineConfigBuilder::new()
        .disclosure(
            DisclosureConfigBuilder::new()
                .initial_limit(30)
                .increment(20)
                .auto_expand_delay(Duration::from_millis(100))
                .settle_delay(Duration::from_millis(5))
                .build(),
        )
        .build()
}

async fn seed_products(store: &MemoryStore, range: std::ops::Range<usize>) {
    for i in range {
        store
            .set(
                &StorePath::products().child(&format!("p-{i}")),
                json!({
                    "name": format!("Product {i}"),
                    "unit": "kg",
                    "stock": 10.0,
                    "updated_at": i as i64,
                }),
            )
            .await
            .unwrap();
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within two seconds");
}

#[tokio::test]
async fn test_snapshot_discloses_window_and_filters_groups() {
    let store = Arc::new(MemoryStore::new());
    seed_products(&store, 0..45).await;
    store
        .set(
            &StorePath::groups().child("g-1"),
            json!({
                "name": "Foundation",
                "members": [
                    {"product_id": "p-1", "kind": "catalog"},
                    {"product_id": "p-2", "kind": "manual"},
                ],
            }),
        )
        .await
        .unwrap();
    store
        .set(
            &StorePath::groups().child("g-2"),
            json!({
                "name": "Manual only",
                "members": [{"product_id": "p-3", "kind": "manual"}],
            }),
        )
        .await
        .unwrap();

    let engine = Engine::start(store.clone(), fast_config()).await.unwrap();
    wait_until(|| engine.snapshot().total_products == 45).await;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.products.len(), 30);
    assert!(snapshot.has_more);
    assert!(snapshot.syncing);
    // Catalog domain: the manual-only group is dropped and the mixed
    // group is pruned to its catalog member.
    assert_eq!(snapshot.groups.len(), 1);
    assert_eq!(snapshot.groups[0].members.len(), 1);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_manual_domain_sees_manual_members() {
    let store = Arc::new(MemoryStore::new());
    store
        .set(
            &StorePath::groups().child("g-1"),
            json!({
                "name": "Mixed",
                "members": [
                    {"product_id": "p-1", "kind": "catalog"},
                    {"product_id": "p-2", "kind": "manual"},
                ],
            }),
        )
        .await
        .unwrap();

    let config = EngineConfigBuilder::new()
        .dataset(Dataset::ManualProducts)
        .group_domain(MemberKind::Manual)
        .build();
    let engine = Engine::start(store.clone(), config).await.unwrap();
    wait_until(|| !engine.snapshot().groups.is_empty()).await;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.groups[0].members[0].product_id, "p-2");

    engine.shutdown().await;
}

#[tokio::test]
async fn test_auto_expand_then_reset_on_fresh_push() {
    let store = Arc::new(MemoryStore::new());
    seed_products(&store, 0..45).await;

    let engine = Engine::start(store.clone(), fast_config()).await.unwrap();
    wait_until(|| engine.snapshot().total_products == 45).await;
    assert_eq!(engine.snapshot().products.len(), 30);

    // The one-shot timer expands the window to the whole dataset.
    wait_until(|| engine.snapshot().products.len() == 45).await;
    assert!(!engine.snapshot().has_more);

    // A fresh push restarts disclosure at the initial chunk.
    seed_products(&store, 45..50).await;
    wait_until(|| {
        let s = engine.snapshot();
        s.total_products == 50 && s.products.len() == 30
    })
    .await;

    engine.shutdown().await;
}

#[tokio::test]
async fn test_request_more_expands_immediately() {
    let store = Arc::new(MemoryStore::new());
    seed_products(&store, 0..45).await;

    // Long auto-expand delay: only the explicit request should fire.
    let config = EngineConfigBuilder::new()
        .disclosure(
            DisclosureConfigBuilder::new()
                .initial_limit(30)
                .increment(20)
                .auto_expand_delay(Duration::from_secs(60))
                .settle_delay(Duration::from_millis(5))
                .build(),
        )
        .build();
    let engine = Engine::start(store.clone(), config).await.unwrap();
    wait_until(|| engine.snapshot().total_products == 45).await;

    engine.request_more().await;
    assert_eq!(engine.snapshot().products.len(), 45);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_adjustment_is_optimistically_visible() {
    let store = Arc::new(MemoryStore::new());
    seed_products(&store, 0..1).await;

    let engine = Engine::start(store.clone(), fast_config()).await.unwrap();
    wait_until(|| engine.snapshot().total_products == 1).await;

    let tx = engine
        .adjust_stock("p-0", 5.0, Some(UnitTag::Kg), "", "alice")
        .await
        .unwrap();
    assert_eq!(tx.note, "Added stock (By: alice)");

    // Patched in the cache synchronously with the commit, ahead of the
    // authoritative push.
    let product = &engine.snapshot().products[0];
    assert_eq!(product.id, "p-0");
    assert_eq!(product.stock, 15.0);

    let history = engine.history("p-0").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].delta, 5.0);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_rejected_adjustment_corrupts_nothing() {
    let store = Arc::new(MemoryStore::new());
    seed_products(&store, 0..1).await;

    let engine = Engine::start(store.clone(), fast_config()).await.unwrap();
    wait_until(|| engine.snapshot().total_products == 1).await;

    let err = engine
        .adjust_stock("p-0", -99.0, None, "", "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NegativeStockRejected { .. }));

    assert_eq!(engine.snapshot().products[0].stock, 10.0);
    assert!(engine.history("p-0").await.unwrap().is_empty());

    engine.shutdown().await;
}

#[tokio::test]
async fn test_failed_subscribe_fails_startup() {
    let store = Arc::new(MemoryStore::new());
    store.fail_subscriptions(true);

    let err = Engine::start(store.clone(), fast_config())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SyncFailure(_)));
}

#[tokio::test]
async fn test_failed_group_subscribe_releases_product_watcher() {
    let store = Arc::new(MemoryStore::new());
    seed_products(&store, 0..2).await;
    // Only the second subscription of startup fails.
    store.fail_subscriptions_under(Some(StorePath::groups()));

    let err = Engine::start(store.clone(), fast_config())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SyncFailure(_)));

    // The product watcher registered before the failure is torn down
    // with the rest of the half-started engine.
    wait_until(|| store.watcher_count() == 0).await;
}

#[tokio::test]
async fn test_engine_handles_format_for_diagnostics() {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::start(store.clone(), fast_config()).await.unwrap();
    let view = engine.view().await.unwrap();

    assert!(format!("{engine:?}").contains("Engine"));
    assert!(format!("{view:?}").contains("ConsumerView"));

    engine.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_releases_store_and_stops_updates() {
    let store = Arc::new(MemoryStore::new());
    seed_products(&store, 0..2).await;

    let engine = Engine::start(store.clone(), fast_config()).await.unwrap();
    wait_until(|| engine.snapshot().total_products == 2).await;

    engine.shutdown().await;
    wait_until(|| store.watcher_count() == 0).await;
    assert!(!engine.snapshot().syncing);

    // Late writes no longer reach the cache, but the last snapshot
    // survives for late readers.
    seed_products(&store, 2..4).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(engine.snapshot().total_products, 2);

    // A pull refresh still works without a subscription.
    engine.refresh().await.unwrap();
    assert_eq!(engine.snapshot().total_products, 4);
}
