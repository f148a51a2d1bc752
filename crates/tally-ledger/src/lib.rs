//! The transactional write path of the tally inventory engine.
//!
//! Stock never mutates directly: every change is recorded as an immutable
//! signed delta under the product's history, then the product's aggregate
//! stock is updated as a second, dependent write. The two writes are not
//! atomic; the failure mode is explicit ([`EngineError::PartialWriteFailure`])
//! and repairable by [`StockLedger::reconcile`], which recomputes the
//! aggregate as the sum of historical deltas.
//!
//! [`EngineError::PartialWriteFailure`]: tally_core::EngineError::PartialWriteFailure

pub mod history;
pub mod ledger;

pub use history::HistoryReader;
pub use ledger::{ReconcileReport, StockLedger};
