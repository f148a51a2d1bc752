//! In-memory [`RemoteStore`] for the demo binary and tests.
//!
//! A single JSON tree behind one lock; the lock serializes writes, so
//! per-path notification order matches apply order. Failure-injection
//! hooks let tests exercise the engine's degraded paths.

use crate::adapter::{RemoteStore, StoreError, StoreEvent, Subscription, SubscriptionGuard};
use crate::path::StorePath;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use ulid::Ulid;

/// Type alias for the watcher table shared with unsubscribe guards.
type SharedWatchers = Arc<RwLock<Vec<Watcher>>>;

struct Watcher {
    id: u64,
    path: StorePath,
    tx: mpsc::UnboundedSender<StoreEvent>,
}

/// In-memory store implementation.
pub struct MemoryStore {
    tree: RwLock<Value>,
    watchers: SharedWatchers,
    next_watcher_id: AtomicU64,
    fail_subscribes: AtomicBool,
    fail_subscribes_under: RwLock<Option<StorePath>>,
    fail_merges: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(Value::Object(Map::new())),
            watchers: Arc::new(RwLock::new(Vec::new())),
            next_watcher_id: AtomicU64::new(0),
            fail_subscribes: AtomicBool::new(false),
            fail_subscribes_under: RwLock::new(None),
            fail_merges: AtomicBool::new(false),
        }
    }

    /// Make subsequent `subscribe` calls fail (test hook).
    pub fn fail_subscriptions(&self, fail: bool) {
        self.fail_subscribes.store(fail, Ordering::SeqCst);
    }

    /// Make `subscribe` calls at or under `path` fail, leaving other
    /// paths subscribable (test hook).
    pub fn fail_subscriptions_under(&self, path: Option<StorePath>) {
        *self.fail_subscribes_under.write() = path;
    }

    /// Make subsequent `merge` calls fail (test hook).
    pub fn fail_merges(&self, fail: bool) {
        self.fail_merges.store(fail, Ordering::SeqCst);
    }

    /// Inject a transport error on every live subscription watching `path`.
    pub fn emit_error(&self, path: &StorePath, reason: &str) {
        let watchers = self.watchers.read();
        for watcher in watchers.iter() {
            if watcher.path.is_affected_by(path) {
                let _ = watcher.tx.send(StoreEvent::Error(reason.to_string()));
            }
        }
    }

    /// Number of registered watchers.
    pub fn watcher_count(&self) -> usize {
        self.watchers.read().len()
    }

    fn notify(&self, changed: &StorePath) {
        let tree = self.tree.read();
        let watchers = self.watchers.read();
        for watcher in watchers.iter() {
            if watcher.path.is_affected_by(changed) {
                let snapshot = value_at(&tree, &watcher.path)
                    .cloned()
                    .unwrap_or(Value::Null);
                let _ = watcher.tx.send(StoreEvent::Snapshot(snapshot));
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk down to the value at `path`, if present.
fn value_at<'a>(root: &'a Value, path: &StorePath) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.segments() {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Walk down to the slot at `path`, creating intermediate objects.
fn slot_mut<'a>(root: &'a mut Value, path: &StorePath) -> &'a mut Value {
    let mut current = root;
    for segment in path.segments() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            unreachable!()
        };
        current = map.entry(segment).or_insert(Value::Null);
    }
    current
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        let tree = self.tree.read();
        Ok(value_at(&tree, path).filter(|v| !v.is_null()).cloned())
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        {
            let mut tree = self.tree.write();
            *slot_mut(&mut tree, path) = value;
        }
        self.notify(path);
        Ok(())
    }

    async fn merge(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        if self.fail_merges.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed {
                path: path.to_string(),
                reason: "injected merge failure".to_string(),
            });
        }

        {
            let mut tree = self.tree.write();
            let slot = slot_mut(&mut tree, path);
            match value {
                Value::Object(fields) if slot.is_object() => {
                    let Value::Object(target) = slot else {
                        unreachable!()
                    };
                    for (key, field) in fields {
                        target.insert(key, field);
                    }
                }
                other => *slot = other,
            }
        }
        self.notify(path);
        Ok(())
    }

    async fn push(&self, path: &StorePath, value: Value) -> Result<String, StoreError> {
        let key = Ulid::new().to_string();
        {
            let mut tree = self.tree.write();
            let slot = slot_mut(&mut tree, path);
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Value::Object(map) = slot else {
                unreachable!()
            };
            map.insert(key.clone(), value);
        }
        debug!(path = %path, key = %key, "appended entry");
        self.notify(&path.child(&key));
        Ok(key)
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError> {
        let targeted = self
            .fail_subscribes_under
            .read()
            .as_ref()
            .is_some_and(|failing| path.is_affected_by(failing));
        if self.fail_subscribes.load(Ordering::SeqCst) || targeted {
            return Err(StoreError::SubscribeFailed {
                path: path.to_string(),
                reason: "injected subscribe failure".to_string(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_watcher_id.fetch_add(1, Ordering::Relaxed);

        // Initial snapshot carries the current value, before any change.
        let initial = {
            let tree = self.tree.read();
            value_at(&tree, path).cloned().unwrap_or(Value::Null)
        };
        let _ = tx.send(StoreEvent::Snapshot(initial));

        self.watchers.write().push(Watcher {
            id,
            path: path.clone(),
            tx,
        });
        debug!(path = %path, id, "watcher registered");

        let watchers = Arc::clone(&self.watchers);
        let guard = SubscriptionGuard::new(move || {
            watchers.write().retain(|w| w.id != id);
        });
        Ok(Subscription::new(rx, guard))
    }
}
