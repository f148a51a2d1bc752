use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tally_sdk::prelude::*;
use tally_sdk::{DisclosureConfigBuilder, EngineConfigBuilder, MemoryStore};

fn main() {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");
    rt.block_on(async_main());
}

async fn async_main() {
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║            TALLY INVENTORY ENGINE DEMO                     ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let store = Arc::new(MemoryStore::new());
    seed(&store).await;

    let config = EngineConfigBuilder::new()
        .disclosure(
            DisclosureConfigBuilder::new()
                .initial_limit(30)
                .increment(20)
                .auto_expand_delay(Duration::from_millis(2000))
                .settle_delay(Duration::from_millis(300))
                .build(),
        )
        .build();
    let engine = Engine::start(store.clone(), config)
        .await
        .expect("engine start");

    // Let the initial push land.
    tokio::time::sleep(Duration::from_millis(50)).await;
    print_window(&engine, "Initial window (progressive disclosure)");

    println!("\nWaiting for the one-shot auto-expansion timer...");
    tokio::time::sleep(Duration::from_millis(2500)).await;
    print_window(&engine, "After auto-expansion");

    println!("\n── Stock adjustments ──────────────────────────────────────");
    let tx = engine
        .adjust_stock("p-0", 25.0, Some(UnitTag::Kg), "", "alice")
        .await
        .expect("adjust");
    println!("  +25.0 on p-0 -> note: {:?}", tx.note);

    let tx = engine
        .adjust_stock("p-0", -10.0, None, "damaged on delivery", "bob")
        .await
        .expect("adjust");
    println!("  -10.0 on p-0 -> note: {:?}", tx.note);

    match engine.adjust_stock("p-0", -1000.0, None, "", "bob").await {
        Err(EngineError::NegativeStockRejected { current, requested }) => {
            println!("  -1000.0 on p-0 -> rejected (stock {current}, delta {requested})");
        }
        other => println!("  unexpected outcome: {other:?}"),
    }

    println!("\n── Transaction history for p-0 (newest first) ─────────────");
    for tx in engine.history("p-0").await.expect("history") {
        println!(
            "  {:>8.1} {:<6} {:<30} by {}",
            tx.delta,
            tx.unit.as_str(),
            tx.note,
            tx.actor.as_deref().unwrap_or("-")
        );
    }

    println!("\n── Simulated partial write + reconciliation ───────────────");
    store.fail_merges(true);
    match engine.adjust_stock("p-1", 5.0, None, "", "alice").await {
        Err(EngineError::PartialWriteFailure { transaction_id, .. }) => {
            println!("  history entry {transaction_id} committed, aggregate update failed");
        }
        other => println!("  unexpected outcome: {other:?}"),
    }
    store.fail_merges(false);
    let report = engine.reconcile("p-1").await.expect("reconcile");
    println!(
        "  reconcile p-1: recorded {}, recomputed {}, corrected: {}",
        report.recorded, report.recomputed, report.corrected
    );

    engine.shutdown().await;
    println!("\n✓ Demo completed, engine shut down.");
}

async fn seed(store: &MemoryStore) {
    for i in 0..40 {
        store
            .set(
                &StorePath::products().child(&format!("p-{i}")),
                json!({
                    "name": format!("Product {i}"),
                    "unit": if i % 2 == 0 { "kg" } else { "piece" },
                    "stock": 10.0 + i as f64,
                    "rate": 4.5 * (i + 1) as f64,
                    "updated_at": 1_700_000_000_000_i64 + i,
                }),
            )
            .await
            .expect("seed product");
    }
    store
        .set(
            &StorePath::groups().child("g-1"),
            json!({
                "name": "Foundation works",
                "members": [
                    {"product_id": "p-0", "product_name": "Product 0", "kind": "catalog"},
                    {"product_id": "p-1", "product_name": "Product 1", "kind": "manual"},
                ],
            }),
        )
        .await
        .expect("seed group");
}

fn print_window(engine: &Engine, label: &str) {
    let snapshot = engine.snapshot();
    println!(
        "\n{label}: {} of {} products shown, has_more = {}, groups = {}",
        snapshot.products.len(),
        snapshot.total_products,
        snapshot.has_more,
        snapshot.groups.len()
    );
    for product in snapshot.products.iter().take(5) {
        println!(
            "  {:<6} {:<12} stock {:>7.2} {}",
            product.id,
            product.name,
            product.stock,
            product.unit.as_str()
        );
    }
    if snapshot.products.len() > 5 {
        println!("  ... and {} more", snapshot.products.len() - 5);
    }
}
