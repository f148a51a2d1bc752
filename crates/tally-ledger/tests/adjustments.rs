//! Adjustment scenarios: the non-negative invariant, default notes,
//! append-only history, partial writes, and reconciliation.

use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tally_core::{EngineError, Product, TxSource, UnitTag};
use tally_ledger::{HistoryReader, StockLedger};
use tally_store::{MemoryStore, RemoteStore, StorePath};
use tally_sync::SharedCache;

struct Fixture {
    store: Arc<MemoryStore>,
    cache: SharedCache,
    ledger: StockLedger,
    history: HistoryReader,
}

async fn fixture_with_product(id: &str, stock: f64, unit: &str) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    store
        .set(
            &StorePath::products().child(id),
            json!({"name": "Rebar", "unit": unit, "stock": stock, "updated_at": 1_000}),
        )
        .await
        .unwrap();

    let cache = SharedCache::new(30);
    let ledger = StockLedger::new(store.clone(), cache.clone(), StorePath::products());
    let history = HistoryReader::new(store.clone());
    Fixture {
        store,
        cache,
        ledger,
        history,
    }
}

async fn stored_stock(store: &MemoryStore, id: &str) -> f64 {
    let raw = store
        .get(&StorePath::products().child(id))
        .await
        .unwrap()
        .unwrap();
    Product::from_value(id, &raw).unwrap().stock
}

#[tokio::test]
async fn test_scenario_increase() {
    let fx = fixture_with_product("p-1", 10.0, "kg").await;

    let tx = fx
        .ledger
        .adjust("p-1", 5.0, Some(UnitTag::Kg), "", "alice")
        .await
        .unwrap();

    assert_eq!(stored_stock(&fx.store, "p-1").await, 15.0);
    assert_eq!(tx.note, "Added stock (By: alice)");
    assert_eq!(tx.source, TxSource::Manual);
    assert_eq!(tx.product_name, "Rebar");
    assert_eq!(tx.actor.as_deref(), Some("alice"));

    let history = fx.history.history_for("p-1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].delta, 5.0);
    assert_eq!(history[0].id, tx.id);
}

#[tokio::test]
async fn test_scenario_decrease_to_zero_boundary() {
    let fx = fixture_with_product("p-1", 3.0, "kg").await;

    let tx = fx
        .ledger
        .adjust("p-1", -3.0, Some(UnitTag::Kg), "", "bob")
        .await
        .unwrap();

    assert_eq!(stored_stock(&fx.store, "p-1").await, 0.0);
    assert_eq!(tx.note, "Removed stock (By: bob)");
}

#[tokio::test]
async fn test_scenario_negative_stock_rejected() {
    let fx = fixture_with_product("p-1", 3.0, "kg").await;

    let err = fx
        .ledger
        .adjust("p-1", -5.0, Some(UnitTag::Kg), "", "bob")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::NegativeStockRejected {
            current,
            requested,
        } if current == 3.0 && requested == -5.0
    ));

    // No writes occurred: stock and history are untouched.
    assert_eq!(stored_stock(&fx.store, "p-1").await, 3.0);
    assert!(fx.history.history_for("p-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_deltas_rejected_before_any_write() {
    let fx = fixture_with_product("p-1", 3.0, "kg").await;

    for delta in [0.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let err = fx
            .ledger
            .adjust("p-1", delta, None, "", "bob")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAdjustment(_)));
    }
    assert!(fx.history.history_for("p-1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_product_rejected() {
    let fx = fixture_with_product("p-1", 3.0, "kg").await;
    let err = fx
        .ledger
        .adjust("ghost", 1.0, None, "", "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ProductNotFound(id) if id == "ghost"));
}

#[tokio::test]
async fn test_explicit_note_and_unit_fallback() {
    let fx = fixture_with_product("p-1", 10.0, "kg").await;

    let tx = fx
        .ledger
        .adjust("p-1", 2.0, None, "damaged batch returned", "carol")
        .await
        .unwrap();

    assert_eq!(tx.note, "damaged batch returned");
    // No unit supplied: denormalized from the product record.
    assert_eq!(tx.unit, UnitTag::Kg);
}

#[tokio::test]
async fn test_history_is_append_only_and_newest_first() {
    let fx = fixture_with_product("p-1", 100.0, "kg").await;

    let mut seen: HashSet<String> = HashSet::new();
    for delta in [5.0, -2.0, 7.0] {
        fx.ledger
            .adjust("p-1", delta, None, "", "alice")
            .await
            .unwrap();
        // Distinct wall-clock timestamps keep the expected order
        // unambiguous.
        tokio::time::sleep(Duration::from_millis(3)).await;

        let history = fx.history.history_for("p-1").await.unwrap();
        let ids: HashSet<String> = history.iter().map(|tx| tx.id.clone()).collect();
        // Every previously observed transaction is still present.
        assert!(seen.is_subset(&ids));
        seen = ids;
    }

    let history = fx.history.history_for("p-1").await.unwrap();
    let deltas: Vec<f64> = history.iter().map(|tx| tx.delta).collect();
    assert_eq!(deltas, [7.0, -2.0, 5.0]);
}

#[tokio::test]
async fn test_optimistic_cache_patch() {
    let fx = fixture_with_product("p-1", 10.0, "kg").await;
    let raw = fx
        .store
        .get(&StorePath::products().child("p-1"))
        .await
        .unwrap()
        .unwrap();
    fx.cache
        .set_products(vec![Product::from_value("p-1", &raw).unwrap()]);

    fx.ledger.adjust("p-1", 5.0, None, "", "alice").await.unwrap();

    // Visible in the cache before any authoritative push arrives.
    assert_eq!(fx.cache.snapshot().products[0].stock, 15.0);
}

#[tokio::test]
async fn test_partial_write_surfaces_and_is_reconcilable() {
    let fx = fixture_with_product("p-1", 10.0, "kg").await;

    fx.store.fail_merges(true);
    let err = fx
        .ledger
        .adjust("p-1", 5.0, None, "", "alice")
        .await
        .unwrap_err();
    let EngineError::PartialWriteFailure {
        product_id,
        transaction_id,
        ..
    } = err
    else {
        panic!("expected PartialWriteFailure, got {err:?}");
    };
    assert_eq!(product_id, "p-1");

    // The history entry stands; the aggregate was left behind.
    let history = fx.history.history_for("p-1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, transaction_id);
    assert_eq!(stored_stock(&fx.store, "p-1").await, 10.0);

    // Reconciliation recomputes the aggregate from history. The seeded
    // opening stock of 10 has no ledger entry, so the recomputed value
    // is the sum of deltas alone.
    fx.store.fail_merges(false);
    let report = fx.ledger.reconcile("p-1").await.unwrap();
    assert!(report.corrected);
    assert_eq!(report.recorded, 10.0);
    assert_eq!(report.recomputed, 5.0);
    assert_eq!(stored_stock(&fx.store, "p-1").await, 5.0);

    let report = fx.ledger.reconcile("p-1").await.unwrap();
    assert!(!report.corrected);
}

#[tokio::test]
async fn test_recompute_on_empty_history_is_zero() {
    let fx = fixture_with_product("p-1", 3.0, "kg").await;
    assert_eq!(fx.ledger.recompute_stock("p-1").await.unwrap(), 0.0);
}

#[tokio::test]
async fn test_history_for_all_merges_products() {
    let fx = fixture_with_product("p-1", 10.0, "kg").await;
    fx.store
        .set(
            &StorePath::products().child("p-2"),
            json!({"name": "Mesh", "unit": "sqft", "stock": 8.0, "updated_at": 1_000}),
        )
        .await
        .unwrap();

    fx.ledger.adjust("p-1", 1.0, None, "", "a").await.unwrap();
    tokio::time::sleep(Duration::from_millis(3)).await;
    fx.ledger.adjust("p-2", 2.0, None, "", "a").await.unwrap();
    tokio::time::sleep(Duration::from_millis(3)).await;
    fx.ledger.adjust("p-1", 3.0, None, "", "a").await.unwrap();

    let all = fx.history.history_for_all().await.unwrap();
    let order: Vec<(&str, f64)> = all
        .iter()
        .map(|tx| (tx.product_id.as_str(), tx.delta))
        .collect();
    assert_eq!(order, [("p-1", 3.0), ("p-2", 2.0), ("p-1", 1.0)]);
}

#[tokio::test]
async fn test_manual_collection_shares_contract() {
    let store = Arc::new(MemoryStore::new());
    store
        .set(
            &StorePath::manual_products().child("m-1"),
            json!({"name": "Loose cement", "unit": "kgs", "stock": 4.0}),
        )
        .await
        .unwrap();

    let cache = SharedCache::new(30);
    let ledger = StockLedger::new(store.clone(), cache, StorePath::manual_products());

    ledger.adjust("m-1", -4.0, None, "", "dave").await.unwrap();

    let raw = store
        .get(&StorePath::manual_products().child("m-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(Product::from_value("m-1", &raw).unwrap().stock, 0.0);
}
