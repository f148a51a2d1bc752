//! Ordered transaction history reads.

use serde_json::Value;
use std::sync::Arc;
use tally_core::{transaction, Result, StockTransaction};
use tally_store::{RemoteStore, StorePath};

/// Read-only access to the transaction history.
pub struct HistoryReader {
    store: Arc<dyn RemoteStore>,
}

impl HistoryReader {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// All ledger entries for one product, newest first. A product with
    /// no history yields an empty sequence, never an error.
    pub async fn history_for(&self, product_id: &str) -> Result<Vec<StockTransaction>> {
        let raw = self
            .store
            .get(&StorePath::history(product_id))
            .await?
            .unwrap_or(Value::Null);
        let mut transactions = transaction::decode_history(&raw);
        transaction::sort_newest_first(&mut transactions);
        Ok(transactions)
    }

    /// Every product's ledger entries merged into one newest-first
    /// sequence. Walks the whole history root: O(total transaction
    /// count), a batch/analytics path rather than a per-row one.
    pub async fn history_for_all(&self) -> Result<Vec<StockTransaction>> {
        let raw = self
            .store
            .get(&StorePath::history_root())
            .await?
            .unwrap_or(Value::Null);

        let mut all = Vec::new();
        if let Some(products) = raw.as_object() {
            for (product_id, subtree) in products {
                let mut transactions = transaction::decode_history(subtree);
                for tx in &mut transactions {
                    if tx.product_id.is_empty() {
                        tx.product_id = product_id.clone();
                    }
                }
                all.append(&mut transactions);
            }
        }
        transaction::sort_newest_first(&mut all);
        Ok(all)
    }
}
