//! Progressive disclosure of cached collections.
//!
//! The display limit bounds how much of the cached dataset a consumer
//! renders at once, independent of how much has been fetched. The limit
//! grows once on a timer after each fresh dataset arrival, and on explicit
//! "load more" requests; concurrent expansions are serialized. Each
//! expansion becomes visible only after a short settling delay so list
//! growth is not visually abrupt.

use crate::cache::SharedCache;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Configuration for progressive disclosure.
#[derive(Clone, Debug)]
pub struct DisclosureConfig {
    /// Records exposed immediately after a fresh push.
    pub initial_limit: usize,
    /// Growth per expansion step.
    pub increment: usize,
    /// Delay before the one-shot automatic expansion fires.
    pub auto_expand_delay: Duration,
    /// Settling delay before an expansion becomes visible.
    pub settle_delay: Duration,
}

impl Default for DisclosureConfig {
    fn default() -> Self {
        Self {
            initial_limit: 30,
            increment: 20,
            auto_expand_delay: Duration::from_millis(2000),
            settle_delay: Duration::from_millis(300),
        }
    }
}

/// Builder for disclosure configuration.
pub struct DisclosureConfigBuilder {
    config: DisclosureConfig,
}

impl DisclosureConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: DisclosureConfig::default(),
        }
    }

    pub fn initial_limit(mut self, limit: usize) -> Self {
        self.config.initial_limit = limit;
        self
    }

    pub fn increment(mut self, increment: usize) -> Self {
        self.config.increment = increment;
        self
    }

    pub fn auto_expand_delay(mut self, delay: Duration) -> Self {
        self.config.auto_expand_delay = delay;
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    pub fn build(self) -> DisclosureConfig {
        self.config
    }
}

impl Default for DisclosureConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Governs the display limit stored in the shared cache.
pub struct DisclosureController {
    cache: SharedCache,
    config: DisclosureConfig,
    expanding: Arc<AtomicBool>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl DisclosureController {
    pub fn new(cache: SharedCache, config: DisclosureConfig) -> Self {
        Self {
            cache,
            config,
            expanding: Arc::new(AtomicBool::new(false)),
            pending: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DisclosureConfig {
        &self.config
    }

    /// The exposed window: `dataset[0..min(limit, len)]`.
    pub fn displayed<'a, T>(&self, dataset: &'a [T]) -> &'a [T] {
        let limit = self.cache.limit().min(dataset.len());
        &dataset[..limit]
    }

    /// Whether records remain beyond the current window.
    pub fn has_more(&self, dataset_len: usize) -> bool {
        dataset_len > self.cache.limit()
    }

    /// Arm the one-shot expansion timer for a freshly arrived dataset,
    /// cancelling any previously pending timer. Does nothing when the
    /// dataset already fits the window.
    pub fn schedule_auto_expand(&self, dataset_len: usize) {
        let mut pending = self.pending.lock();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        if dataset_len <= self.cache.limit() {
            return;
        }

        let cache = self.cache.clone();
        let expanding = Arc::clone(&self.expanding);
        let delay = self.config.auto_expand_delay;
        let settle = self.config.settle_delay;
        let increment = self.config.increment;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            expand_once(cache, expanding, settle, increment, dataset_len).await;
        }));
    }

    /// Explicit "load more". A second request while an expansion is in
    /// flight is a no-op.
    pub async fn request_more(&self, dataset_len: usize) {
        expand_once(
            self.cache.clone(),
            Arc::clone(&self.expanding),
            self.config.settle_delay,
            self.config.increment,
            dataset_len,
        )
        .await;
    }

    /// Cancel any pending expansion timer. Must be called on teardown so
    /// no timer mutates the limit afterwards.
    pub fn shutdown(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for DisclosureController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Clears the in-flight flag even when the expansion future is dropped
/// mid-settle (timer cancellation).
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn expand_once(
    cache: SharedCache,
    expanding: Arc<AtomicBool>,
    settle: Duration,
    increment: usize,
    dataset_len: usize,
) {
    if cache.limit() >= dataset_len {
        return;
    }
    if expanding
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        // An expansion is already in flight.
        return;
    }
    let _guard = InFlight(expanding);

    tokio::time::sleep(settle).await;
    let limit = cache.expand_limit(increment, dataset_len);
    debug!(limit, dataset_len, "display limit expanded");
}
