//! The process-wide shared cache.
//!
//! Explicitly constructed and injected by reference into every consumer,
//! which keeps the "at most one subscription" invariant testable against
//! fresh instances. The lifecycle is explicit: construct, mutate via
//! pushes and optimistic patches, `clear` to invalidate,
//! `set_listening(false)` on teardown.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tally_core::{product, InventoryGroup, Product};

#[derive(Debug, Default)]
struct CacheState {
    products: Vec<Product>,
    groups: Vec<InventoryGroup>,
    last_updated: Option<DateTime<Utc>>,
    display_limit: usize,
    listening: bool,
}

/// A point-in-time copy of the cache contents. Consumers read snapshots
/// and must never mutate shared state directly.
#[derive(Clone, Debug)]
pub struct CacheSnapshot {
    pub products: Vec<Product>,
    pub groups: Vec<InventoryGroup>,
    pub last_updated: Option<DateTime<Utc>>,
    pub display_limit: usize,
    pub listening: bool,
}

/// Cloneable handle to the shared cache.
#[derive(Clone, Debug)]
pub struct SharedCache {
    inner: Arc<RwLock<CacheState>>,
    initial_limit: usize,
}

impl SharedCache {
    pub fn new(initial_limit: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheState {
                display_limit: initial_limit,
                ..CacheState::default()
            })),
            initial_limit,
        }
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let state = self.inner.read();
        CacheSnapshot {
            products: state.products.clone(),
            groups: state.groups.clone(),
            last_updated: state.last_updated,
            display_limit: state.display_limit,
            listening: state.listening,
        }
    }

    /// Apply a fresh full product push: sort newest-first, replace the
    /// cached list, and reset the display limit to the initial chunk so
    /// progressive disclosure restarts on new data.
    pub fn set_products(&self, mut products: Vec<Product>) {
        product::sort_newest_first(&mut products);
        let mut state = self.inner.write();
        state.products = products;
        state.display_limit = self.initial_limit;
        state.last_updated = Some(Utc::now());
    }

    /// Apply a fresh full group push. Does not touch the display limit.
    pub fn set_groups(&self, groups: Vec<InventoryGroup>) {
        let mut state = self.inner.write();
        state.groups = groups;
        state.last_updated = Some(Utc::now());
    }

    /// Optimistic patch after a committed adjustment, superseded by the
    /// next authoritative push. Returns false when the product is not
    /// cached.
    pub fn patch_product(&self, id: &str, stock: f64, updated_at: DateTime<Utc>) -> bool {
        let mut state = self.inner.write();
        match state.products.iter_mut().find(|p| p.id == id) {
            Some(product) => {
                product.stock = stock;
                product.updated_at = updated_at;
                true
            }
            None => false,
        }
    }

    /// Invalidate the cached contents. The listening flag is untouched;
    /// live subscriptions will repopulate on the next push.
    pub fn clear(&self) {
        let mut state = self.inner.write();
        state.products.clear();
        state.groups.clear();
        state.last_updated = None;
        state.display_limit = self.initial_limit;
    }

    pub fn set_listening(&self, listening: bool) {
        self.inner.write().listening = listening;
    }

    pub fn listening(&self) -> bool {
        self.inner.read().listening
    }

    pub fn limit(&self) -> usize {
        self.inner.read().display_limit
    }

    pub fn product_count(&self) -> usize {
        self.inner.read().products.len()
    }

    /// Grow the display limit by `increment`, capped at `dataset_len`.
    /// Never shrinks: a fresh product push is the only reset path.
    /// Returns the limit after the call.
    pub fn expand_limit(&self, increment: usize, dataset_len: usize) -> usize {
        let mut state = self.inner.write();
        let target = (state.display_limit + increment).min(dataset_len);
        if target > state.display_limit {
            state.display_limit = target;
        }
        state.display_limit
    }
}
