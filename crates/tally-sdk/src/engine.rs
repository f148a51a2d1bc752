//! The consumer-facing engine facade.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tally_core::{
    filter_groups, InventoryGroup, MemberKind, Product, Result, StockTransaction, UnitTag,
};
use tally_ledger::{HistoryReader, ReconcileReport, StockLedger};
use tally_store::RemoteStore;
use tally_sync::{
    ConsumerView, Dataset, DisclosureConfig, DisclosureController, SharedCache,
    SubscriptionManager, SyncEvent,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// Configuration for an [`Engine`].
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Which product collection this engine serves.
    pub dataset: Dataset,
    /// Which membership kind group reads are filtered to.
    pub group_domain: MemberKind,
    /// Progressive-disclosure tuning.
    pub disclosure: DisclosureConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dataset: Dataset::Products,
            group_domain: MemberKind::Catalog,
            disclosure: DisclosureConfig::default(),
        }
    }
}

/// Builder for engine configuration.
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn dataset(mut self, dataset: Dataset) -> Self {
        self.config.dataset = dataset;
        self
    }

    pub fn group_domain(mut self, domain: MemberKind) -> Self {
        self.config.group_domain = domain;
        self
    }

    pub fn disclosure(mut self, disclosure: DisclosureConfig) -> Self {
        self.config.disclosure = disclosure;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// What a rendering consumer sees: the disclosed window of products plus
/// the domain-filtered groups.
#[derive(Clone, Debug)]
pub struct EngineSnapshot {
    /// The first `display_limit` cached products, newest-updated first.
    pub products: Vec<Product>,
    /// Size of the full cached product list.
    pub total_products: usize,
    /// Whether records remain beyond the disclosed window.
    pub has_more: bool,
    /// Groups filtered to the configured membership domain.
    pub groups: Vec<InventoryGroup>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Whether live subscriptions are currently held.
    pub syncing: bool,
}

/// The realtime inventory engine.
///
/// Wires the shared cache, the subscription manager, the disclosure
/// controller, and the stock ledger into one surface. All consumers of
/// one engine share a single cache and a single store subscription per
/// dataset.
pub struct Engine {
    cache: SharedCache,
    manager: Arc<SubscriptionManager>,
    disclosure: Arc<DisclosureController>,
    ledger: StockLedger,
    history: HistoryReader,
    dataset: Dataset,
    group_domain: MemberKind,
    glue: JoinHandle<()>,
}

// Hand-written: the manager's store handle is a trait object.
impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("dataset", &self.dataset)
            .field("group_domain", &self.group_domain)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Start the engine: subscribe the configured product dataset and the
    /// group collection, and arm auto-expansion on fresh product pushes.
    pub async fn start(store: Arc<dyn RemoteStore>, config: EngineConfig) -> Result<Engine> {
        let cache = SharedCache::new(config.disclosure.initial_limit);
        let manager = Arc::new(SubscriptionManager::new(store.clone(), cache.clone()));
        let disclosure = Arc::new(DisclosureController::new(
            cache.clone(),
            config.disclosure.clone(),
        ));
        let ledger = StockLedger::new(store.clone(), cache.clone(), config.dataset.path());
        let history = HistoryReader::new(store);

        // Every fresh product push restarts the one-shot expansion timer.
        let glue = {
            let mut events = manager.events();
            let disclosure = Arc::clone(&disclosure);
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(SyncEvent::ProductsUpdated { count }) => {
                            disclosure.schedule_auto_expand(count);
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            })
        };

        let started = match manager.start(config.dataset).await {
            Ok(_) => manager.start(Dataset::Groups).await.map(|_| ()),
            Err(err) => Err(err),
        };
        if let Err(err) = started {
            // A half-started engine must not keep store watchers or
            // expansion timers alive.
            glue.abort();
            manager.cleanup().await;
            return Err(err);
        }

        Ok(Engine {
            cache,
            manager,
            disclosure,
            ledger,
            history,
            dataset: config.dataset,
            group_domain: config.group_domain,
            glue,
        })
    }

    /// The current consumer-visible view.
    pub fn snapshot(&self) -> EngineSnapshot {
        let snapshot = self.cache.snapshot();
        let disclosed = snapshot.display_limit.min(snapshot.products.len());
        EngineSnapshot {
            total_products: snapshot.products.len(),
            has_more: snapshot.products.len() > snapshot.display_limit,
            products: snapshot.products[..disclosed].to_vec(),
            groups: filter_groups(&snapshot.groups, self.group_domain),
            last_updated: snapshot.last_updated,
            syncing: snapshot.listening,
        }
    }

    /// Subscribe to push events.
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.manager.events()
    }

    /// Register an additional consumer view on the shared subscription.
    pub async fn view(&self) -> Result<ConsumerView> {
        self.manager.start(self.dataset).await
    }

    /// Record a signed stock adjustment. See [`StockLedger::adjust`].
    pub async fn adjust_stock(
        &self,
        product_id: &str,
        delta: f64,
        unit: Option<UnitTag>,
        note: &str,
        actor: &str,
    ) -> Result<StockTransaction> {
        self.ledger
            .adjust(product_id, delta, unit, note, actor)
            .await
    }

    /// One product's ledger entries, newest first.
    pub async fn history(&self, product_id: &str) -> Result<Vec<StockTransaction>> {
        self.history.history_for(product_id).await
    }

    /// Every product's ledger entries, newest first. Batch path.
    pub async fn history_all(&self) -> Result<Vec<StockTransaction>> {
        self.history.history_for_all().await
    }

    /// Repair a product's aggregate stock from its history.
    pub async fn reconcile(&self, product_id: &str) -> Result<ReconcileReport> {
        self.ledger.reconcile(product_id).await
    }

    /// Explicitly expand the disclosed window ("load more").
    pub async fn request_more(&self) {
        let total = self.cache.product_count();
        self.disclosure.request_more(total).await;
    }

    /// Pull-read the product dataset once, outside the push stream.
    pub async fn refresh(&self) -> Result<()> {
        self.manager.refresh(self.dataset).await
    }

    /// Invalidate the cached contents without touching the
    /// subscriptions; live pushes repopulate the cache.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Tear the engine down: cancel timers, release subscriptions, clear
    /// the listening flag. The cached contents survive for late readers.
    pub async fn shutdown(&self) {
        self.glue.abort();
        self.disclosure.shutdown();
        self.manager.cleanup().await;
        debug!("engine shut down");
    }
}
