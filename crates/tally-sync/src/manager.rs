//! Subscription management.
//!
//! A dataset is subscribed at the store **at most once** per manager, no
//! matter how many consumers ask for it; later callers are handed the
//! current cache contents and the shared event stream. Consumer `stop` is
//! deliberately decoupled from releasing the store subscription: views
//! come and go while the subscription stays warm, and only an explicit
//! [`SubscriptionManager::cleanup`] tears the store side down.

use crate::cache::{CacheSnapshot, SharedCache};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tally_core::{group, product, EngineError, Result};
use tally_store::{RemoteStore, StoreEvent, StorePath, Subscription};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A logical dataset monitored by the engine. Catalog and manual products
/// share one record shape and one flow; groups are decoded separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dataset {
    Products,
    ManualProducts,
    Groups,
}

impl Dataset {
    pub fn path(&self) -> StorePath {
        match self {
            Dataset::Products => StorePath::products(),
            Dataset::ManualProducts => StorePath::manual_products(),
            Dataset::Groups => StorePath::groups(),
        }
    }
}

/// Events fanned out to consumer views on every applied push.
#[derive(Clone, Debug)]
pub enum SyncEvent {
    /// A fresh full product push was applied (display limit was reset).
    ProductsUpdated { count: usize },
    /// A fresh full group push was applied.
    GroupsUpdated { count: usize },
    /// A subscription failed or reported a transport error. The previous
    /// cache snapshot is retained (stale-but-available).
    SyncFailed { dataset: Dataset, reason: String },
}

/// Ensures at most one live store subscription per dataset and fans pushes
/// out to the shared cache and all consumer views.
pub struct SubscriptionManager {
    store: Arc<dyn RemoteStore>,
    cache: SharedCache,
    active: Mutex<HashMap<Dataset, JoinHandle<()>>>,
    events: broadcast::Sender<SyncEvent>,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn RemoteStore>, cache: SharedCache) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            store,
            cache,
            active: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Subscribe to the shared event stream without registering a view.
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Start (or join) the live subscription for a dataset.
    ///
    /// Idempotent: the first call subscribes the store and spawns the pump
    /// task; every later call reuses them. A failed subscribe surfaces
    /// [`EngineError::SyncFailure`] and leaves the cache contents intact.
    pub async fn start(&self, dataset: Dataset) -> Result<ConsumerView> {
        let mut active = self.active.lock().await;
        if !active.contains_key(&dataset) {
            let subscription = self
                .store
                .subscribe(&dataset.path())
                .await
                .map_err(|err| {
                    warn!(?dataset, %err, "subscription could not be established");
                    EngineError::SyncFailure(err.to_string())
                })?;
            self.cache.set_listening(true);
            let task = tokio::spawn(pump(
                dataset,
                subscription,
                self.cache.clone(),
                self.events.clone(),
            ));
            active.insert(dataset, task);
            debug!(?dataset, "store subscription started");
        }
        Ok(ConsumerView::new(
            self.cache.clone(),
            self.events.subscribe(),
        ))
    }

    /// Pull-read a dataset once and apply it through the same normalize
    /// and sort path as a push.
    pub async fn refresh(&self, dataset: Dataset) -> Result<()> {
        let value = self.store.get(&dataset.path()).await?;
        apply_snapshot(dataset, &value.unwrap_or(Value::Null), &self.cache, &self.events);
        Ok(())
    }

    /// Release every store subscription and clear the listening flag.
    ///
    /// This is the coarse lifecycle event: individual consumers stopping
    /// never reach the store, because other consumers may remount.
    pub async fn cleanup(&self) {
        let mut active = self.active.lock().await;
        for (dataset, task) in active.drain() {
            // Aborting the pump drops its Subscription, which unregisters
            // the store watcher.
            task.abort();
            debug!(?dataset, "store subscription released");
        }
        self.cache.set_listening(false);
    }
}

async fn pump(
    dataset: Dataset,
    mut subscription: Subscription,
    cache: SharedCache,
    events: broadcast::Sender<SyncEvent>,
) {
    while let Some(event) = subscription.next().await {
        match event {
            StoreEvent::Snapshot(value) => apply_snapshot(dataset, &value, &cache, &events),
            StoreEvent::Error(reason) => {
                warn!(?dataset, %reason, "subscription error, retaining last snapshot");
                let _ = events.send(SyncEvent::SyncFailed { dataset, reason });
            }
        }
    }
}

fn apply_snapshot(
    dataset: Dataset,
    value: &Value,
    cache: &SharedCache,
    events: &broadcast::Sender<SyncEvent>,
) {
    match dataset {
        Dataset::Products | Dataset::ManualProducts => {
            let products = product::decode_product_map(value);
            let count = products.len();
            cache.set_products(products);
            let _ = events.send(SyncEvent::ProductsUpdated { count });
        }
        Dataset::Groups => {
            let groups = group::decode_group_map(value);
            let count = groups.len();
            cache.set_groups(groups);
            let _ = events.send(SyncEvent::GroupsUpdated { count });
        }
    }
}

/// One consumer's handle onto the shared cache and event stream.
///
/// Carries a liveness flag checked before events are handed out, so a
/// stopped consumer never applies late-arriving updates to torn-down
/// state. Stopping a view does not release the store subscription.
#[derive(Debug)]
pub struct ConsumerView {
    cache: SharedCache,
    events: broadcast::Receiver<SyncEvent>,
    alive: Arc<AtomicBool>,
}

impl ConsumerView {
    fn new(cache: SharedCache, events: broadcast::Receiver<SyncEvent>) -> Self {
        Self {
            cache,
            events,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        self.cache.snapshot()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Wait for the next push event. Returns `None` once the view is
    /// stopped or the manager is gone. The liveness flag is re-checked
    /// after every suspension so a stop racing a push wins.
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        loop {
            if !self.is_alive() {
                return None;
            }
            match self.events.recv().await {
                Ok(event) => {
                    if !self.is_alive() {
                        return None;
                    }
                    return Some(event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "consumer view lagged behind the push stream");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Unregister this consumer's interest. Idempotent.
    pub fn stop(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}
