//! Stock adjustments: the two-step, consistency-checked write.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tally_core::{wire, EngineError, Product, Result, StockTransaction, TxSource, UnitTag};
use tally_store::{RemoteStore, StorePath};
use tally_sync::SharedCache;
use tracing::{debug, warn};

/// Tolerance for comparing recorded against recomputed stock.
const STOCK_TOLERANCE: f64 = 1e-9;

/// Outcome of a reconciliation pass over one product.
#[derive(Clone, Debug)]
pub struct ReconcileReport {
    pub product_id: String,
    /// Aggregate stock as stored on the product record.
    pub recorded: f64,
    /// Sum of all historical deltas.
    pub recomputed: f64,
    /// Whether the aggregate was rewritten to the recomputed value.
    pub corrected: bool,
}

/// The transactional write path.
///
/// Constructed against a product collection path, so the catalog and
/// manual-product collections get the identical contract.
pub struct StockLedger {
    store: Arc<dyn RemoteStore>,
    cache: SharedCache,
    collection: StorePath,
}

impl StockLedger {
    pub fn new(store: Arc<dyn RemoteStore>, cache: SharedCache, collection: StorePath) -> Self {
        Self {
            store,
            cache,
            collection,
        }
    }

    /// Record a signed stock adjustment.
    ///
    /// The delta is taken exactly as given: positive increases stock,
    /// negative decreases it. The product is read authoritatively from
    /// the store (not the cache) for the non-negative check. On success
    /// the committed transaction is returned and the cached copy of the
    /// product is optimistically patched until the next push supersedes
    /// it.
    ///
    /// The history append and the aggregate update are two independent
    /// writes with no cross-path atomicity. A failure between them
    /// surfaces as [`EngineError::PartialWriteFailure`]; the committed
    /// history entry is never rolled back. Two concurrent adjusts on one
    /// product can both pass the check against the same pre-adjustment
    /// stock; the second aggregate write wins while both transactions
    /// remain recorded (see [`Self::reconcile`]).
    pub async fn adjust(
        &self,
        product_id: &str,
        delta: f64,
        unit: Option<UnitTag>,
        note: &str,
        actor: &str,
    ) -> Result<StockTransaction> {
        if !delta.is_finite() {
            return Err(EngineError::InvalidAdjustment(format!(
                "delta must be finite, got {delta}"
            )));
        }
        if delta == 0.0 {
            return Err(EngineError::InvalidAdjustment(
                "delta must be non-zero".to_string(),
            ));
        }

        let product = self.read_product(product_id).await?;
        let new_stock = product.stock + delta;
        if new_stock < 0.0 {
            return Err(EngineError::NegativeStockRejected {
                current: product.stock,
                requested: delta,
            });
        }

        let now = Utc::now();
        let note = if note.trim().is_empty() {
            default_note(delta, actor)
        } else {
            note.to_string()
        };
        let transaction = StockTransaction {
            // Keyed by the store on append.
            id: String::new(),
            product_id: product_id.to_string(),
            // Captured pre-adjustment, never re-derived.
            product_name: product.name.clone(),
            unit: unit.unwrap_or(product.unit),
            delta,
            source: TxSource::Manual,
            note,
            actor: (!actor.is_empty()).then(|| actor.to_string()),
            reference: None,
            created_at: now,
        };

        let key = self
            .store
            .push(&StorePath::history(product_id), transaction.to_value())
            .await?;
        let transaction = StockTransaction {
            id: key.clone(),
            ..transaction
        };

        if let Err(err) = self
            .store
            .merge(
                &self.collection.child(product_id),
                json!({"stock": new_stock, "updated_at": wire::to_millis(now)}),
            )
            .await
        {
            warn!(
                product = product_id,
                transaction = %key,
                %err,
                "history entry committed but aggregate update failed"
            );
            return Err(EngineError::PartialWriteFailure {
                product_id: product_id.to_string(),
                transaction_id: key,
                source: err,
            });
        }

        self.cache.patch_product(product_id, new_stock, now);
        debug!(
            product = product_id,
            delta, new_stock, "stock adjustment committed"
        );
        Ok(transaction)
    }

    /// Sum of all historical deltas for a product. Absent history sums
    /// to zero.
    pub async fn recompute_stock(&self, product_id: &str) -> Result<f64> {
        let raw = self
            .store
            .get(&StorePath::history(product_id))
            .await?
            .unwrap_or(serde_json::Value::Null);
        let total = tally_core::transaction::decode_history(&raw)
            .iter()
            .map(|tx| tx.delta)
            .sum();
        Ok(total)
    }

    /// Repair the aggregate after a partial write (or any drift) by
    /// recomputing stock from history. Never runs automatically.
    pub async fn reconcile(&self, product_id: &str) -> Result<ReconcileReport> {
        let product = self.read_product(product_id).await?;
        let recomputed = self.recompute_stock(product_id).await?;

        let corrected = (product.stock - recomputed).abs() > STOCK_TOLERANCE;
        if corrected {
            warn!(
                product = product_id,
                recorded = product.stock,
                recomputed,
                "aggregate stock disagrees with history, correcting"
            );
            let now = Utc::now();
            self.store
                .merge(
                    &self.collection.child(product_id),
                    json!({"stock": recomputed, "updated_at": wire::to_millis(now)}),
                )
                .await?;
            self.cache.patch_product(product_id, recomputed, now);
        }

        Ok(ReconcileReport {
            product_id: product_id.to_string(),
            recorded: product.stock,
            recomputed,
            corrected,
        })
    }

    async fn read_product(&self, product_id: &str) -> Result<Product> {
        let raw = self.store.get(&self.collection.child(product_id)).await?;
        raw.as_ref()
            .and_then(|value| Product::from_value(product_id, value))
            .ok_or_else(|| EngineError::ProductNotFound(product_id.to_string()))
    }
}

fn default_note(delta: f64, actor: &str) -> String {
    let verb = if delta > 0.0 { "Added" } else { "Removed" };
    format!("{verb} stock (By: {actor})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_note_wording() {
        assert_eq!(default_note(5.0, "alice"), "Added stock (By: alice)");
        assert_eq!(default_note(-3.0, "bob"), "Removed stock (By: bob)");
    }
}
