//! Remote store adapter for the tally inventory engine.
//!
//! The engine treats the backing store as a hierarchical key-value
//! event source: point reads, set/merge writes, append-under-generated-key,
//! and subscribe-for-changes. The wire protocol behind those primitives is
//! deliberately out of scope; this crate defines the seam ([`RemoteStore`])
//! and ships an in-memory implementation ([`MemoryStore`]) used by the demo
//! binary and the test suites.
//!
//! Subscriptions deliver the **full current value** at the watched path on
//! every change, not a diff, in the order the store applies writes.

pub mod adapter;
pub mod memory;
pub mod path;

pub use adapter::{RemoteStore, StoreError, StoreEvent, Subscription, SubscriptionGuard};
pub use memory::MemoryStore;
pub use path::StorePath;
