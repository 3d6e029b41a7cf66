//! Two-tier record cache.
//!
//! [`RecordCache`] fronts a durable key-value tier with a bounded
//! in-memory tier. Lookups check memory first, then the durable tier;
//! fresh durable entries are promoted into memory with their original
//! timestamp, so promotion never extends an entry's lifetime. Writes go
//! to both tiers; a durable write failure downgrades that entry to
//! memory-only and is never surfaced.
//!
//! Entries are replaced whole and never mutated in place, which is the
//! entire locking discipline: concurrent runs may race on the same ID,
//! and the loser's entry simply supersedes the winner's.

pub mod durable;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::telemetry;
use crate::types::Record;

pub use durable::{DurableStore, FsStore, MemoryStore};

use durable::durable_key;

/// Configuration for the record cache.
///
/// ```rust
/// # use hamstr::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .ttl(Duration::from_secs(600))
///     .max_memory_entries(500);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live for cached entries, both tiers. Default: 1 hour.
    pub ttl: Duration,
    /// Maximum number of entries in the memory tier (LRU beyond this).
    /// Default: 1,000.
    pub max_memory_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_memory_entries: 1_000,
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry time-to-live.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the memory-tier capacity.
    pub fn max_memory_entries(mut self, n: u64) -> Self {
        self.max_memory_entries = n;
        self
    }
}

/// A cached record with its store timestamp.
///
/// Immutable once stored: re-fetching after expiry supersedes the whole
/// entry, nothing merges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: Record,
    /// Unix epoch milliseconds at store time.
    pub stored_at_ms: u64,
}

/// Advisory cache statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub memory_entries: u64,
    pub durable_entries: usize,
    /// Hit percentage over the cache's lifetime, in [0, 100].
    pub approximate_hit_rate: f64,
}

/// Process-wide two-tier record cache.
///
/// Construct once and share (by [`Arc`]) between the collector and any
/// other consumers; see module docs for tier semantics.
pub struct RecordCache {
    memory: moka::sync::Cache<u32, CacheEntry>,
    durable: Arc<dyn DurableStore>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RecordCache {
    /// Create a cache over the given durable store.
    pub fn new(config: &CacheConfig, durable: Arc<dyn DurableStore>) -> Self {
        Self {
            memory: moka::sync::Cache::new(config.max_memory_entries),
            durable,
            ttl: config.ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a record by ID.
    ///
    /// Memory tier first; on a miss or an expired memory entry, the
    /// durable tier is consulted and a fresh entry is promoted into
    /// memory. Stale or unparseable durable entries are purged and
    /// treated as absent. A true miss has no side effects.
    pub fn get(&self, id: u32) -> Option<Record> {
        if let Some(entry) = self.memory.get(&id) {
            if self.is_valid(&entry) {
                self.record_hit("memory");
                return Some(entry.payload);
            }
            // The durable copy may be fresher (another cache instance over
            // the same store), so fall through and let load_durable decide.
            self.memory.invalidate(&id);
        }

        match self.load_durable(id) {
            Some(entry) => {
                self.memory.insert(id, entry.clone());
                self.record_hit("durable");
                Some(entry.payload)
            }
            None => {
                self.record_miss();
                None
            }
        }
    }

    /// Store a record in both tiers with a fresh timestamp.
    ///
    /// A durable-tier failure is logged and the entry stays memory-only.
    pub fn set(&self, id: u32, payload: Record) {
        let entry = CacheEntry {
            payload,
            stored_at_ms: now_ms(),
        };
        self.memory.insert(id, entry.clone());

        let serialized = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!(id, error = %e, "failed to serialize cache entry; memory-only");
                return;
            }
        };
        if let Err(e) = self.durable.set_item(&durable_key(id), &serialized) {
            warn!(id, error = %e, "durable cache write failed; memory-only");
        }
    }

    /// Whether an entry is still fresh: `now - stored_at < ttl`.
    pub fn is_valid(&self, entry: &CacheEntry) -> bool {
        now_ms().saturating_sub(entry.stored_at_ms) < self.ttl.as_millis() as u64
    }

    /// Advisory statistics: tier sizes and lifetime hit rate.
    pub fn stats(&self) -> CacheStats {
        self.memory.run_pending_tasks();
        let durable_entries = match self.durable.keys() {
            Ok(keys) => keys.len(),
            Err(e) => {
                warn!(error = %e, "failed to count durable entries");
                0
            }
        };

        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        let rate = if hits + misses > 0.0 {
            (hits / (hits + misses) * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        CacheStats {
            memory_entries: self.memory.entry_count(),
            durable_entries,
            approximate_hit_rate: rate,
        }
    }

    /// Sweep both tiers, removing every expired entry.
    ///
    /// Idempotent. May benignly race with a concurrent promotion; a
    /// re-fetch after a lost race is idempotent too.
    pub fn clean_expired(&self) {
        let stale: Vec<u32> = self
            .memory
            .iter()
            .filter(|(_, entry)| !self.is_valid(entry))
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            self.memory.invalidate(&id);
        }

        let keys = match self.durable.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "failed to list durable entries for sweep");
                return;
            }
        };
        for key in keys {
            let remove = match self.durable.get_item(&key) {
                Ok(Some(json)) => match serde_json::from_str::<CacheEntry>(&json) {
                    Ok(entry) => !self.is_valid(&entry),
                    // Corrupt entries go out with the sweep.
                    Err(_) => true,
                },
                Ok(None) => false,
                Err(_) => false,
            };
            if remove {
                if let Err(e) = self.durable.remove_item(&key) {
                    warn!(key, error = %e, "failed to remove expired durable entry");
                }
            }
        }
        debug!("expired cache entries swept");
    }

    /// Empty both tiers unconditionally.
    pub fn clear(&self) {
        self.memory.invalidate_all();
        match self.durable.keys() {
            Ok(keys) => {
                for key in keys {
                    if let Err(e) = self.durable.remove_item(&key) {
                        warn!(key, error = %e, "failed to remove durable entry");
                    }
                }
            }
            Err(e) => warn!(error = %e, "failed to list durable entries for clear"),
        }
    }

    /// Read and validate a durable entry, purging it when stale or
    /// corrupt. Returns a fresh entry ready for promotion.
    fn load_durable(&self, id: u32) -> Option<CacheEntry> {
        let key = durable_key(id);
        let json = match self.durable.get_item(&key) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                warn!(id, error = %e, "durable cache read failed");
                return None;
            }
        };
        match serde_json::from_str::<CacheEntry>(&json) {
            Ok(entry) if self.is_valid(&entry) => Some(entry),
            Ok(_) => {
                self.purge_durable(id);
                None
            }
            Err(e) => {
                warn!(id, error = %e, "corrupt durable cache entry; purging");
                self.purge_durable(id);
                None
            }
        }
    }

    fn purge_durable(&self, id: u32) {
        if let Err(e) = self.durable.remove_item(&durable_key(id)) {
            warn!(id, error = %e, "failed to purge durable entry");
        }
    }

    fn record_hit(&self, tier: &'static str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(telemetry::CACHE_HITS_TOTAL, "tier" => tier).increment(1);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
    }
}

/// Current time as unix epoch milliseconds.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
