//! The [`RemoteStore`] trait: the engine's seam to the backing store.

use crate::path::StorePath;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors surfaced by a store implementation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A subscription could not be established.
    #[error("subscribe failed for {path}: {reason}")]
    SubscribeFailed { path: String, reason: String },
    /// A point read failed.
    #[error("read failed for {path}: {reason}")]
    ReadFailed { path: String, reason: String },
    /// A set/merge/push write failed.
    #[error("write failed for {path}: {reason}")]
    WriteFailed { path: String, reason: String },
    /// The store has been shut down.
    #[error("store closed")]
    Closed,
}

/// Events delivered on a live subscription.
#[derive(Clone, Debug)]
pub enum StoreEvent {
    /// The full current value at the subscribed path. `Value::Null` when
    /// the path is absent. Delivered once on subscribe and once after
    /// every change affecting the subtree, in apply order.
    Snapshot(Value),
    /// A transport-level failure on the subscription. The subscription
    /// may keep delivering snapshots afterwards.
    Error(String),
}

/// Releases a watcher registration when dropped.
pub struct SubscriptionGuard(Option<Box<dyn FnOnce() + Send>>);

impl SubscriptionGuard {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(release)))
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(release) = self.0.take() {
            release();
        }
    }
}

impl fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SubscriptionGuard")
    }
}

/// A live change subscription: an ordered stream of [`StoreEvent`]s plus
/// a guard that unregisters the watcher when the subscription is dropped.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::UnboundedReceiver<StoreEvent>,
    _guard: SubscriptionGuard,
}

impl Subscription {
    pub fn new(events: mpsc::UnboundedReceiver<StoreEvent>, guard: SubscriptionGuard) -> Self {
        Self {
            events,
            _guard: guard,
        }
    }

    /// Wait for the next event. `None` once the store side is gone.
    pub async fn next(&mut self) -> Option<StoreEvent> {
        self.events.recv().await
    }
}

/// Hierarchical key-value store with push notifications.
///
/// Implementations must serialize writes and fan out change notifications
/// to subscribers in the order the writes are applied. Cross-path
/// atomicity is *not* assumed anywhere in the engine.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Point read. `Ok(None)` when the path is absent.
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError>;

    /// Replace the value at a path, creating parents as needed.
    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError>;

    /// Merge object fields into the value at a path. A non-object target
    /// (or non-object `value`) degenerates to a replace.
    async fn merge(&self, path: &StorePath, value: Value) -> Result<(), StoreError>;

    /// Append `value` under a store-generated unique key, returning the
    /// key. Never overwrites an existing key.
    async fn push(&self, path: &StorePath, value: Value) -> Result<String, StoreError>;

    /// Subscribe to changes at a path.
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError>;
}
