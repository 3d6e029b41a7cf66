//! HTTP client for the upstream catalog service.
//!
//! One endpoint matters: `GET {base_url}/catalog/item/{id}`. The client
//! distinguishes transport failures, non-2xx statuses, and undecodable
//! bodies so the collector can count them as transient and resample, and
//! it races every request against a cancellation token so a cancelled run
//! settles without waiting for in-flight responses.

use std::time::{Duration, Instant};

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::telemetry;
use crate::types::{RawItem, Record};
use crate::{HamstrError, Result};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the upstream catalog service.
#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    base_url: String,
}

impl CatalogClient {
    /// Create a client for the given base URL (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| HamstrError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Fetch and normalize a single catalog item.
    ///
    /// Returns `Ok(None)` if `cancel` fires before the response is
    /// decoded; the request itself is dropped with the future. Non-2xx
    /// statuses, transport failures, and undecodable bodies are all
    /// [transient](HamstrError::is_transient) errors.
    pub async fn fetch_item(&self, id: u32, cancel: &CancellationToken) -> Result<Option<Record>> {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let url = format!("{}/catalog/item/{id}", self.base_url);
        let started = Instant::now();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(None),
            response = self.http.get(&url).send() => {
                response.map_err(|e| {
                    metrics::counter!(telemetry::FETCHES_TOTAL, "status" => "error").increment(1);
                    HamstrError::Http(e.to_string())
                })?
            }
        };

        let status = response.status();
        if !status.is_success() {
            metrics::counter!(telemetry::FETCHES_TOTAL, "status" => "error").increment(1);
            return Err(HamstrError::Api {
                status: status.as_u16(),
                message: format!("catalog item {id} fetch failed"),
            });
        }

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(None),
            body = response.text() => {
                body.map_err(|e| {
                    metrics::counter!(telemetry::FETCHES_TOTAL, "status" => "error").increment(1);
                    HamstrError::Http(format!("failed reading catalog item {id} body: {e}"))
                })?
            }
        };

        let raw: RawItem = serde_json::from_str(&body).map_err(|e| {
            metrics::counter!(telemetry::FETCHES_TOTAL, "status" => "error").increment(1);
            HamstrError::Json(e)
        })?;

        metrics::counter!(telemetry::FETCHES_TOTAL, "status" => "ok").increment(1);
        metrics::histogram!(telemetry::FETCH_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        debug!(id, elapsed_ms = started.elapsed().as_millis() as u64, "fetched catalog item");

        Ok(Some(raw.into_record()))
    }
}
