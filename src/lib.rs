//! Hamstr - unique-random record collection for remote catalogs
//!
//! This crate collects a target number of unique, randomly-selected
//! records from a remote catalog service. A two-tier cache (bounded
//! in-memory tier over a durable key-value tier) absorbs repeat lookups,
//! and a concurrent-then-sequential retrieval strategy keeps runs short
//! against an unreliable, rate-limited upstream. Runs always settle —
//! complete, partial, or cancelled — and a shortfall is a result, not an
//! error.
//!
//! # Session Example
//!
//! ```rust,no_run
//! use hamstr::Hamstr;
//!
//! #[tokio::main]
//! async fn main() -> hamstr::Result<()> {
//!     let session = Hamstr::builder()
//!         .catalog_url("https://catalog.example.com")
//!         .target_count(12)
//!         .build()?;
//!
//!     session.refetch().await?;
//!
//!     let state = session.state();
//!     println!("collected {} records", state.records.len());
//!     for record in &state.records {
//!         println!("#{} {}", record.id, record.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Collector Example
//!
//! For callers that want the algorithm without the session surface:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hamstr::{
//!     CacheConfig, CatalogClient, Collector, CollectorConfig, MemoryStore, RecordCache,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> hamstr::Result<()> {
//!     let cache = Arc::new(RecordCache::new(
//!         &CacheConfig::default(),
//!         Arc::new(MemoryStore::new()),
//!     ));
//!     let client = CatalogClient::new("https://catalog.example.com")?;
//!     let collector = Collector::new(cache, client, CollectorConfig::default());
//!
//!     let outcome = collector
//!         .collect(12, &CancellationToken::new(), None)
//!         .await?;
//!     println!("{} unique records", outcome.records.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod collector;
pub mod error;
pub mod session;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use error::{HamstrError, Result};
pub use session::{CatalogSession, Hamstr, HamstrBuilder};

pub use cache::{
    CacheConfig, CacheEntry, CacheStats, DurableStore, FsStore, MemoryStore, RecordCache,
};
pub use client::CatalogClient;
pub use collector::{Collector, CollectorConfig, IdSampler, ProgressSender, UniformSampler};

// Re-export all types
pub use types::{CollectionOutcome, CollectionState, Progress, Record, RunStatus};
