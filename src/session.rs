//! Consumer-facing collection session.
//!
//! [`CatalogSession`] is the seam a presentation layer binds to: an
//! observable [`CollectionState`] behind a watch channel, plus the
//! operations the surface exposes — refetch, fetch-more, cache stats,
//! cache clearing. [`Hamstr::builder()`] wires a session together from a
//! catalog URL, a durable store, and the cache/collector configs.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::cache::{CacheConfig, CacheStats, DurableStore, FsStore, MemoryStore, RecordCache};
use crate::client::CatalogClient;
use crate::collector::{Collector, CollectorConfig};
use crate::types::{CollectionOutcome, CollectionState, Progress, RunStatus};
use crate::{HamstrError, Result};

/// Main entry point for creating collection sessions.
pub struct Hamstr;

impl Hamstr {
    /// Create a new builder for configuring a session.
    pub fn builder() -> HamstrBuilder {
        HamstrBuilder::new()
    }
}

/// Builder for configuring [`CatalogSession`] instances.
pub struct HamstrBuilder {
    catalog_url: Option<String>,
    cache_dir: Option<PathBuf>,
    memory_only: bool,
    cache_config: CacheConfig,
    collector_config: CollectorConfig,
    target_count: usize,
}

impl HamstrBuilder {
    pub fn new() -> Self {
        Self {
            catalog_url: None,
            cache_dir: None,
            memory_only: false,
            cache_config: CacheConfig::default(),
            collector_config: CollectorConfig::default(),
            target_count: 12,
        }
    }

    /// Set the upstream catalog base URL (required).
    pub fn catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = Some(url.into());
        self
    }

    /// Override the durable tier's directory.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Use an in-process durable tier instead of the filesystem.
    pub fn memory_only_cache(mut self) -> Self {
        self.memory_only = true;
        self
    }

    /// Set the cache configuration.
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Set the collector configuration.
    pub fn collector_config(mut self, config: CollectorConfig) -> Self {
        self.collector_config = config;
        self
    }

    /// Set how many records [`CatalogSession::refetch`] collects.
    /// Default: 12.
    pub fn target_count(mut self, n: usize) -> Self {
        self.target_count = n;
        self
    }

    /// Build the session.
    ///
    /// Fails with [`HamstrError::NoUpstream`] when no catalog URL was
    /// configured. No collection starts until
    /// [`refetch()`](CatalogSession::refetch) is called.
    pub fn build(self) -> Result<Arc<CatalogSession>> {
        let url = self.catalog_url.ok_or(HamstrError::NoUpstream)?;
        let durable: Arc<dyn DurableStore> = if self.memory_only {
            Arc::new(MemoryStore::new())
        } else {
            match self.cache_dir {
                Some(dir) => Arc::new(FsStore::with_dir(dir)),
                None => Arc::new(FsStore::new()),
            }
        };
        let cache = Arc::new(RecordCache::new(&self.cache_config, durable));
        let client = CatalogClient::new(url)?;
        let collector = Collector::new(cache.clone(), client, self.collector_config);

        let (state, _) = watch::channel(CollectionState::default());
        Ok(Arc::new(CatalogSession {
            cache,
            collector,
            target_count: self.target_count,
            state,
            current_run: Mutex::new(CancellationToken::new()),
        }))
    }
}

impl Default for HamstrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A long-lived collection session over one catalog.
///
/// Owns the cache and collector; publishes [`CollectionState`] through a
/// watch channel. At most one run is in flight at a time — starting a new
/// one cancels its predecessor, and a superseded run never touches the
/// state again.
pub struct CatalogSession {
    cache: Arc<RecordCache>,
    collector: Collector,
    target_count: usize,
    state: watch::Sender<CollectionState>,
    current_run: Mutex<CancellationToken>,
}

impl CatalogSession {
    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<CollectionState> {
        self.state.subscribe()
    }

    /// The current state, cloned.
    pub fn state(&self) -> CollectionState {
        self.state.borrow().clone()
    }

    /// Discard current records and collect a fresh set of
    /// `target_count` unique records.
    ///
    /// Cancels any in-flight run first. Resolves when the run settles;
    /// observers see `loading` flip and `progress` advance along the way.
    pub async fn refetch(&self) -> Result<()> {
        let cancel = self.begin_run().await;
        let target = self.target_count;
        self.state.send_modify(|s| {
            s.records.clear();
            s.loading = true;
            s.error = None;
            s.progress = Progress::new(0, target);
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let collect = async {
            let result = self.collector.collect(target, &cancel, Some(&tx)).await;
            drop(tx);
            result
        };
        let (result, ()) = tokio::join!(collect, self.forward_progress(rx));

        self.finish_run(result, target, &cancel, |state, outcome| {
            state.records = outcome.records;
        })
    }

    /// Collect up to `additional` records not already held, appending
    /// them to the current set.
    pub async fn fetch_more(&self, additional: usize) -> Result<()> {
        let cancel = self.begin_run().await;
        let existing: HashSet<u32> = self.state.borrow().records.iter().map(|r| r.id).collect();
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
            s.progress = Progress::new(0, additional);
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let collect = async {
            let result = self
                .collector
                .fetch_more(additional, &existing, &cancel, Some(&tx))
                .await;
            drop(tx);
            result
        };
        let (result, ()) = tokio::join!(collect, self.forward_progress(rx));

        self.finish_run(result, additional, &cancel, |state, outcome| {
            state.records.extend(outcome.records);
        })
    }

    /// Cancel the in-flight run, if any.
    pub async fn cancel(&self) {
        self.current_run.lock().await.cancel();
        self.state.send_modify(|s| s.loading = false);
    }

    /// Advisory cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Empty both cache tiers.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Sweep expired entries from both cache tiers.
    pub fn clean_expired_cache(&self) {
        self.cache.clean_expired();
    }

    /// Replace the active run token, cancelling the previous run.
    async fn begin_run(&self) -> CancellationToken {
        let mut guard = self.current_run.lock().await;
        guard.cancel();
        *guard = CancellationToken::new();
        guard.clone()
    }

    /// Mirror run progress into the observable state until the sender
    /// side drops.
    async fn forward_progress(&self, mut rx: mpsc::UnboundedReceiver<Progress>) {
        while let Some(progress) = rx.recv().await {
            self.state.send_modify(|s| s.progress = progress);
        }
    }

    /// Fold a settled run into the state.
    ///
    /// A cancelled run leaves the state to its successor; systemic
    /// failure lands in `error`.
    fn finish_run(
        &self,
        result: Result<CollectionOutcome>,
        target: usize,
        cancel: &CancellationToken,
        apply: impl FnOnce(&mut CollectionState, CollectionOutcome),
    ) -> Result<()> {
        match result {
            Ok(outcome) => {
                if outcome.status == RunStatus::Cancelled {
                    return Ok(());
                }
                let achieved = outcome.records.len();
                self.state.send_modify(|s| {
                    apply(s, outcome);
                    s.loading = false;
                    s.progress = Progress::new(achieved, target);
                });
                Ok(())
            }
            Err(e) => {
                if !cancel.is_cancelled() {
                    error!(error = %e, "collection run failed");
                    self.state.send_modify(|s| {
                        s.loading = false;
                        s.error = Some(e.to_string());
                    });
                }
                Err(e)
            }
        }
    }
}
