//! Error taxonomy for engine operations.

use tally_store::StoreError;
use thiserror::Error;

/// Error type for engine operations.
///
/// Every operation is fallible and reports failure to its immediate
/// caller; nothing is swallowed silently. `PartialWriteFailure` is the one
/// case where local state has already moved: the history append committed
/// but the aggregate update did not, and the append-only history cannot be
/// rolled back. The inconsistency is reconcilable by recomputing the
/// aggregate as the sum of historical deltas.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A remote subscription could not be established or reported a
    /// transport failure. The last good cache snapshot is retained.
    #[error("sync failed: {0}")]
    SyncFailure(String),

    /// The targeted product is absent from the store.
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// The supplied quantity delta is unusable (zero or non-finite).
    /// Rejected before any remote call.
    #[error("invalid adjustment: {0}")]
    InvalidAdjustment(String),

    /// Applying the delta would drive stock below zero. No write occurs.
    #[error("adjustment rejected: stock {current} + delta {requested} would go negative")]
    NegativeStockRejected { current: f64, requested: f64 },

    /// The history append committed but the aggregate update failed.
    #[error("partial write for product {product_id}: transaction {transaction_id} recorded, aggregate update failed")]
    PartialWriteFailure {
        product_id: String,
        transaction_id: String,
        #[source]
        source: StoreError,
    },

    /// Store-level failure outside the cases above.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
