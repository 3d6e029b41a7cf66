//! Telemetry metric name constants.
//!
//! Centralised metric names for hamstr operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `hamstr_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `phase` — collection phase: "batch" or "sequential"
//! - `status` — outcome: "ok" or "error"
//! - `reason` — why a candidate was abandoned: "duplicate", "http",
//!   "status", "decode"

/// Total upstream catalog fetches attempted.
///
/// Labels: `status` ("ok" | "error").
pub const FETCHES_TOTAL: &str = "hamstr_fetches_total";

/// Upstream fetch duration in seconds.
pub const FETCH_DURATION_SECONDS: &str = "hamstr_fetch_duration_seconds";

/// Total candidate IDs abandoned and resampled.
///
/// Labels: `reason` ("duplicate" | "http" | "status" | "decode").
pub const RESAMPLES_TOTAL: &str = "hamstr_resamples_total";

/// Total net-new unique records folded into a run.
///
/// Labels: `phase` ("batch" | "sequential").
pub const RECORDS_COLLECTED_TOTAL: &str = "hamstr_records_collected_total";

/// Total record cache hits.
///
/// Labels: `tier` ("memory" | "durable").
pub const CACHE_HITS_TOTAL: &str = "hamstr_cache_hits_total";

/// Total record cache misses.
pub const CACHE_MISSES_TOTAL: &str = "hamstr_cache_misses_total";
