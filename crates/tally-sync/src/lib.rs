//! Realtime synchronization layer for the tally inventory engine.
//!
//! Three pieces cooperate here:
//!
//! - [`SharedCache`] - the process-wide last-known view of products and
//!   groups, shared by every consumer. Only the subscription pump and the
//!   ledger's optimistic patch may write it.
//! - [`SubscriptionManager`] - at most one live store subscription per
//!   dataset, fanned out to any number of consumer views.
//! - [`DisclosureController`] - bounds how much of the cached collection
//!   is exposed at once, growing the window on a timer and on request.

pub mod cache;
pub mod disclosure;
pub mod manager;

pub use cache::{CacheSnapshot, SharedCache};
pub use disclosure::{DisclosureConfig, DisclosureConfigBuilder, DisclosureController};
pub use manager::{ConsumerView, Dataset, SubscriptionManager, SyncEvent};
