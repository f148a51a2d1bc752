//! Core data model for the tally inventory engine.
//!
//! The backing store is schemaless, so every record shape that crosses the
//! store boundary has an explicit typed counterpart here plus a
//! normalization step that default-fills missing optional fields and
//! rejects malformed records before they reach business logic:
//!
//! - [`Product`] - catalog record carrying the denormalized stock aggregate
//! - [`StockTransaction`] - immutable, append-only signed quantity delta
//! - [`InventoryGroup`] - read-mostly grouping of product references
//!
//! The crate also owns the engine-wide error taxonomy ([`EngineError`]).

pub mod error;
pub mod group;
pub mod product;
pub mod transaction;
pub mod unit;
pub mod wire;

pub use error::{EngineError, Result};
pub use group::{filter_groups, GroupMember, InventoryGroup, MemberKind};
pub use product::Product;
pub use transaction::{StockTransaction, TxSource};
pub use unit::UnitTag;
