//! Progress events and run outcomes.

use serde::{Deserialize, Serialize};

use super::Record;

/// Progress of an in-flight collection run.
///
/// Emitted each time the run's unique set grows. `current` never exceeds
/// `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(current: usize, total: usize) -> Self {
        Self {
            current: current.min(total),
            total,
        }
    }
}

/// Terminal state of a collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The target count was reached.
    Complete,
    /// The retry budget ran out first; the achieved count is still valid.
    Partial,
    /// The run's cancellation token fired before it settled.
    Cancelled,
}

/// Settled result of `collect` or `fetch_more`.
///
/// A shortfall is not an error: `records.len()` may be less than the
/// requested count, with `status` saying why.
#[derive(Debug, Clone)]
pub struct CollectionOutcome {
    /// Unique records in the order they became unique.
    pub records: Vec<Record>,
    pub status: RunStatus,
    /// Sequential-phase attempts consumed (batch-phase draws not counted).
    pub attempts_used: u32,
}

/// Observable state of a [`CatalogSession`](crate::CatalogSession).
///
/// This is the seam a presentation layer binds to: the current record
/// set, a loading flag, the last systemic error (transient retrieval
/// failures never appear here), and run progress.
#[derive(Debug, Clone, Default)]
pub struct CollectionState {
    pub records: Vec<Record>,
    pub loading: bool,
    pub error: Option<String>,
    pub progress: Progress,
}
