//! Tally SDK - the consumer-facing surface of the inventory engine.
//!
//! The engine keeps a locally cached, always-fresh view of products and
//! groups pushed from a remote store, progressively discloses large
//! result sets, and performs stock adjustments as a two-step,
//! consistency-checked write against an append-only transaction ledger.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tally_sdk::{Engine, EngineConfig, MemoryStore};
//!
//! # async fn run() -> tally_sdk::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let engine = Engine::start(store, EngineConfig::default()).await?;
//!
//! // Read the disclosed window.
//! let snapshot = engine.snapshot();
//! println!("{} products ({} more)", snapshot.products.len(),
//!          snapshot.total_products - snapshot.products.len());
//!
//! // Record a stock adjustment.
//! engine.adjust_stock("p-1", 5.0, None, "", "alice").await?;
//!
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod engine;

pub use engine::{Engine, EngineConfig, EngineConfigBuilder, EngineSnapshot};

// Re-exports for convenience
pub use tally_core::{
    filter_groups, EngineError, GroupMember, InventoryGroup, MemberKind, Product, Result,
    StockTransaction, TxSource, UnitTag,
};
pub use tally_ledger::{HistoryReader, ReconcileReport, StockLedger};
pub use tally_store::{MemoryStore, RemoteStore, StoreError, StoreEvent, StorePath, Subscription};
pub use tally_sync::{
    CacheSnapshot, ConsumerView, Dataset, DisclosureConfig, DisclosureConfigBuilder,
    DisclosureController, SharedCache, SubscriptionManager, SyncEvent,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::engine::{Engine, EngineConfig, EngineSnapshot};
    pub use tally_core::{EngineError, MemberKind, Product, Result, StockTransaction, UnitTag};
    pub use tally_store::{RemoteStore, StorePath};
    pub use tally_sync::{Dataset, DisclosureConfig, SyncEvent};
}
