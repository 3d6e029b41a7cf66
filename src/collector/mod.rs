//! Unique-random record collection.
//!
//! [`Collector`] gathers a target number of unique records by sampling
//! candidate IDs uniformly from the catalog's ID space, consulting the
//! [`RecordCache`] before any network access, and abandoning a candidate
//! on any retrieval failure rather than retrying it (a fresh sample is
//! cheaper than distinguishing transient from permanent failure per ID).
//!
//! A run has two phases: a fixed-size concurrent batch that fills most of
//! the target in one burst, then a one-at-a-time sequential fill that
//! closes any shortfall without hammering the upstream. Every loop is
//! bounded by an explicit attempt ceiling, so a run always settles:
//! complete, partial, or cancelled.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use rand::Rng;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::RecordCache;
use crate::client::CatalogClient;
use crate::telemetry;
use crate::types::{CollectionOutcome, Progress, Record, RunStatus};
use crate::Result;

/// Sender half for run progress events.
pub type ProgressSender = mpsc::UnboundedSender<Progress>;

/// Configuration for the collector's budgets.
///
/// Every bound that keeps a run finite lives here:
///
/// ```rust
/// # use hamstr::CollectorConfig;
/// let config = CollectorConfig::new()
///     .space_size(1025)
///     .batch_size(15)
///     .max_sequential_attempts(20);
/// ```
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Size of the catalog ID space; candidates are drawn from
    /// `[1, space_size]`. Default: 1,025.
    pub space_size: u32,
    /// Concurrent retrievals in the batch phase. Default: 15.
    pub batch_size: usize,
    /// Attempt ceiling inside one single-record retrieval (duplicate
    /// resamples included). Default: 10.
    pub max_single_attempts: u32,
    /// Attempt ceiling for the sequential fill phase. Default: 20.
    pub max_sequential_attempts: u32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            space_size: 1_025,
            batch_size: 15,
            max_single_attempts: 10,
            max_sequential_attempts: 20,
        }
    }
}

impl CollectorConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the catalog ID space size.
    pub fn space_size(mut self, n: u32) -> Self {
        self.space_size = n;
        self
    }

    /// Set the batch-phase concurrency.
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    /// Set the per-retrieval attempt ceiling.
    pub fn max_single_attempts(mut self, n: u32) -> Self {
        self.max_single_attempts = n;
        self
    }

    /// Set the sequential-phase attempt ceiling.
    pub fn max_sequential_attempts(mut self, n: u32) -> Self {
        self.max_sequential_attempts = n;
        self
    }
}

/// Source of candidate IDs.
///
/// The default draws uniformly; tests inject scripted samplers to make
/// runs deterministic.
pub trait IdSampler: Send + Sync {
    /// Draw a candidate ID in `[1, space_size]`.
    fn sample(&self, space_size: u32) -> u32;
}

/// Uniform sampler over the full ID space.
pub struct UniformSampler;

impl IdSampler for UniformSampler {
    fn sample(&self, space_size: u32) -> u32 {
        rand::rng().random_range(1..=space_size.max(1))
    }
}

/// State owned by one collection run: the unique set and its insertion
/// order. Never outlives the invocation that created it.
struct CollectionRun {
    ids: HashSet<u32>,
    records: Vec<Record>,
}

impl CollectionRun {
    fn new() -> Self {
        Self {
            ids: HashSet::new(),
            records: Vec::new(),
        }
    }

    /// Fold a record in; returns true when it was net-new.
    fn insert(&mut self, record: Record) -> bool {
        if self.ids.insert(record.id) {
            self.records.push(record);
            true
        } else {
            false
        }
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// Collects unique random records from the catalog.
pub struct Collector {
    cache: Arc<RecordCache>,
    client: CatalogClient,
    config: CollectorConfig,
    sampler: Arc<dyn IdSampler>,
}

impl Collector {
    /// Create a collector with uniform sampling.
    pub fn new(cache: Arc<RecordCache>, client: CatalogClient, config: CollectorConfig) -> Self {
        Self::with_sampler(cache, client, config, Arc::new(UniformSampler))
    }

    /// Create a collector with a custom ID sampler.
    pub fn with_sampler(
        cache: Arc<RecordCache>,
        client: CatalogClient,
        config: CollectorConfig,
        sampler: Arc<dyn IdSampler>,
    ) -> Self {
        Self {
            cache,
            client,
            config,
            sampler,
        }
    }

    /// Collect up to `target` unique records.
    ///
    /// Batch phase first, then sequential fill until the target, the
    /// sequential budget, or the cancellation token ends the run. A
    /// shortfall settles as [`RunStatus::Partial`], not an error; the
    /// records gathered before cancellation are returned with
    /// [`RunStatus::Cancelled`].
    pub async fn collect(
        &self,
        target: usize,
        cancel: &CancellationToken,
        progress: Option<&ProgressSender>,
    ) -> Result<CollectionOutcome> {
        let mut run = CollectionRun::new();
        if target == 0 || cancel.is_cancelled() {
            return Ok(settle(run, target, 0, cancel));
        }
        emit(progress, Progress::new(0, target));

        // Batch phase: all outcomes observed, no short-circuit. Every
        // retrieval starts from the same (empty) exclusion snapshot;
        // duplicates fall out when results are folded in below.
        let exclude = run.ids.clone();
        let batch = (0..self.config.batch_size).map(|_| self.fetch_single(&exclude, cancel));
        let results = join_all(batch).await;

        for result in results {
            if let Some(record) = result? {
                if run.insert(record) {
                    metrics::counter!(telemetry::RECORDS_COLLECTED_TOTAL, "phase" => "batch")
                        .increment(1);
                    emit(progress, Progress::new(run.len(), target));
                }
            }
        }
        debug!(collected = run.len(), target, "batch phase settled");

        // Sequential fill phase.
        let mut attempts = 0;
        while run.len() < target
            && attempts < self.config.max_sequential_attempts
            && !cancel.is_cancelled()
        {
            if let Some(record) = self.fetch_single(&run.ids, cancel).await? {
                if run.insert(record) {
                    metrics::counter!(telemetry::RECORDS_COLLECTED_TOTAL, "phase" => "sequential")
                        .increment(1);
                    emit(progress, Progress::new(run.len(), target));
                }
            }
            attempts += 1;
        }

        let outcome = settle(run, target, attempts, cancel);
        info!(
            collected = outcome.records.len(),
            target,
            status = ?outcome.status,
            "collection run settled"
        );
        Ok(outcome)
    }

    /// Collect up to `additional` records not already in `existing_ids`.
    ///
    /// Sequential only — no batch phase. The attempt ceiling is
    /// `additional * 2`.
    pub async fn fetch_more(
        &self,
        additional: usize,
        existing_ids: &HashSet<u32>,
        cancel: &CancellationToken,
        progress: Option<&ProgressSender>,
    ) -> Result<CollectionOutcome> {
        let mut run = CollectionRun::new();
        run.ids = existing_ids.clone();
        let max_attempts = (additional as u32).saturating_mul(2);

        let mut attempts = 0;
        while run.len() < additional && attempts < max_attempts && !cancel.is_cancelled() {
            if let Some(record) = self.fetch_single(&run.ids, cancel).await? {
                if run.insert(record) {
                    metrics::counter!(telemetry::RECORDS_COLLECTED_TOTAL, "phase" => "sequential")
                        .increment(1);
                    emit(progress, Progress::new(run.len(), additional));
                }
            }
            attempts += 1;
        }

        Ok(settle(run, additional, attempts, cancel))
    }

    /// Retrieve one record not in `exclude`: sample, try the cache, then
    /// the upstream.
    ///
    /// Any retrieval failure abandons the sampled ID for the rest of this
    /// call — the next iteration draws a fresh candidate. Returns
    /// `Ok(None)` when the attempt ceiling is spent or `cancel` fires;
    /// only systemic failures become `Err`.
    async fn fetch_single(
        &self,
        exclude: &HashSet<u32>,
        cancel: &CancellationToken,
    ) -> Result<Option<Record>> {
        let mut attempts = 0;
        while attempts < self.config.max_single_attempts {
            if cancel.is_cancelled() {
                return Ok(None);
            }

            let id = self.sampler.sample(self.config.space_size);
            if exclude.contains(&id) {
                metrics::counter!(telemetry::RESAMPLES_TOTAL, "reason" => "duplicate")
                    .increment(1);
                attempts += 1;
                continue;
            }

            if let Some(record) = self.cache.get(id) {
                return Ok(Some(record));
            }

            match self.client.fetch_item(id, cancel).await {
                Ok(Some(record)) => {
                    // No cache writes observable after cancellation.
                    if cancel.is_cancelled() {
                        return Ok(None);
                    }
                    self.cache.set(id, record.clone());
                    return Ok(Some(record));
                }
                Ok(None) => return Ok(None),
                Err(e) if e.is_transient() => {
                    warn!(id, error = %e, "abandoning candidate after failed retrieval");
                    metrics::counter!(telemetry::RESAMPLES_TOTAL, "reason" => resample_reason(&e))
                        .increment(1);
                    attempts += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }
}

fn resample_reason(e: &crate::HamstrError) -> &'static str {
    match e {
        crate::HamstrError::Api { .. } => "status",
        crate::HamstrError::Json(_) => "decode",
        _ => "http",
    }
}

fn emit(progress: Option<&ProgressSender>, event: Progress) {
    if let Some(tx) = progress {
        // A dropped receiver just means nobody is watching.
        let _ = tx.send(event);
    }
}

/// Truncate to the target and classify the terminal state.
fn settle(
    mut run: CollectionRun,
    target: usize,
    attempts_used: u32,
    cancel: &CancellationToken,
) -> CollectionOutcome {
    run.records.truncate(target);
    let status = if cancel.is_cancelled() {
        RunStatus::Cancelled
    } else if run.records.len() >= target {
        RunStatus::Complete
    } else {
        RunStatus::Partial
    };
    CollectionOutcome {
        records: run.records,
        status,
        attempts_used,
    }
}
