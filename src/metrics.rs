//! Production observability metrics for the ingestion pipeline
//!
//! Counters and histograms for request outcomes, retry behavior, batch
//! flushes, and per-run totals.
//!
//! ## Architecture
//!
//! - Uses the `metrics` crate for low-overhead collection; emission is a
//!   no-op until a recorder is installed
//! - Optional Prometheus scrape endpoint via [`init_metrics`]
//! - Emitters never fail: an absent or broken sink degrades gracefully

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Initialize the metrics system with a Prometheus exporter.
///
/// Call once at application startup when an exporter is wanted; the
/// function is idempotent. Without it, metric emission is a no-op.
///
/// # Arguments
/// * `addr` - Socket address for the Prometheus scrape endpoint
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "ingest_requests_total",
        Unit::Count,
        "Total number of source API requests attempted"
    );

    describe_counter!(
        "ingest_retries_total",
        Unit::Count,
        "Total number of retry attempts"
    );

    describe_histogram!(
        "ingest_retry_backoff_seconds",
        Unit::Seconds,
        "Duration of retry backoff delays"
    );

    describe_counter!(
        "ingest_batches_flushed_total",
        Unit::Count,
        "Total number of trade batches persisted"
    );

    describe_counter!(
        "ingest_trades_new_total",
        Unit::Count,
        "Total number of newly ingested trades"
    );

    describe_counter!(
        "ingest_trades_duplicate_total",
        Unit::Count,
        "Total number of duplicate trades skipped"
    );

    describe_counter!(
        "ingest_intervals_truncated_total",
        Unit::Count,
        "Intervals flagged possibly-truncated by the pagination depth cap"
    );

    describe_counter!(
        "ingest_runs_completed_total",
        Unit::Count,
        "Total number of ingestion runs finished successfully"
    );

    describe_counter!(
        "ingest_runs_failed_total",
        Unit::Count,
        "Total number of ingestion runs aborted by a fatal error"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Check if the metrics exporter has been installed.
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}

/// Record one source API request and its outcome.
pub fn record_request(endpoint: &'static str, success: bool) {
    counter!(
        "ingest_requests_total",
        "endpoint" => endpoint,
        "outcome" => if success { "ok" } else { "error" },
    )
    .increment(1);
}

/// Record a retry and the backoff applied before it.
pub fn record_retry_backoff(backoff: Duration, attempt: u32) {
    counter!(
        "ingest_retries_total",
        "attempt" => attempt.to_string(),
    )
    .increment(1);

    histogram!("ingest_retry_backoff_seconds").record(backoff.as_secs_f64());
}

/// Record a persisted batch.
pub fn record_batch_flush(batch_len: usize) {
    counter!("ingest_batches_flushed_total").increment(1);
    counter!("ingest_trades_new_total").increment(batch_len as u64);
}

/// Record an interval flagged possibly-truncated.
pub fn record_truncated_interval() {
    counter!("ingest_intervals_truncated_total").increment(1);
}

/// Ingestion run metrics
pub struct RunMetrics {
    market_id: String,
    start_time: Instant,
}

impl RunMetrics {
    /// Start tracking an ingestion run
    pub fn start(market_id: impl Into<String>) -> Self {
        let market_id = market_id.into();

        info!(market_id = %market_id, "Ingestion run started");

        Self {
            market_id,
            start_time: Instant::now(),
        }
    }

    /// Record run completion (including partial, cancelled runs)
    pub fn record_success(&self, new_count: u64, duplicate_count: u64) {
        let duration = self.start_time.elapsed();

        counter!(
            "ingest_runs_completed_total",
            "market_id" => self.market_id.clone(),
        )
        .increment(1);

        counter!("ingest_trades_duplicate_total").increment(duplicate_count);

        info!(
            market_id = %self.market_id,
            new_count,
            duplicate_count,
            duration_secs = duration.as_secs(),
            "Ingestion run finished"
        );
    }

    /// Record a run aborted by a fatal error
    pub fn record_failure(&self, error: &str) {
        let duration = self.start_time.elapsed();

        counter!(
            "ingest_runs_failed_total",
            "market_id" => self.market_id.clone(),
        )
        .increment(1);

        error!(
            market_id = %self.market_id,
            error = %error,
            duration_secs = duration.as_secs(),
            "Ingestion run failed"
        );
    }
}
