//! Ingestion orchestrator
//!
//! Drives the end-to-end pipeline for one market: resolve the start
//! boundary, seed the dedup set, tile the history into daily intervals,
//! fetch each interval through the rate-limited transport, deduplicate,
//! batch, persist, and report progress.
//!
//! A single bad day never aborts a run: a fetch that stays unavailable
//! after retries is recorded and the loop moves on. The only fatal error is
//! the durable store itself failing.

use crate::fetcher::{IntervalFetcher, RetryingTransport, TradeSource};
use crate::ingest::boundary::StartBoundaryResolver;
use crate::ingest::config::IngestConfig;
use crate::ingest::intervals::{generate_intervals, DayInterval};
use crate::ingest::rate_limit::RateLimiter;
use crate::ingest::signature::SignatureStore;
use crate::ingest::IngestError;
use crate::metrics::{self, RunMetrics};
use crate::shutdown::{self, SharedShutdown};
use crate::store::TradeStore;
use crate::Trade;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// Progress snapshot handed to the progress callback after each interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Zero-based index of the interval just finished
    pub interval_index: usize,
    /// Total number of intervals in this run
    pub total_intervals: usize,
    /// New trades accepted so far
    pub new_count: u64,
    /// Duplicate trades skipped so far
    pub duplicate_count: u64,
}

/// Synchronous progress notification hook.
///
/// Invoked on the pipeline's own task after each interval; it must return
/// quickly and must not perform network calls.
pub type ProgressCallback = dyn Fn(&ProgressUpdate) + Send + Sync;

/// Final outcome of one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    /// Trades newly persisted by this run
    pub new_count: u64,
    /// Trades skipped as duplicates (per fetched occurrence)
    pub duplicate_count: u64,
    /// Total intervals the run planned to cover
    pub total_intervals: usize,
    /// Intervals whose pagination depth cap was hit; their data may be
    /// incomplete
    pub truncated_intervals: Vec<DayInterval>,
    /// Intervals where a page stayed unavailable after retries; "no data
    /// fetched" is not "no data exists" for these
    pub failed_intervals: Vec<DayInterval>,
    /// Intervals not processed because the run was cancelled
    pub remaining_intervals: Vec<DayInterval>,
    /// Whether every interval was processed
    pub completed: bool,
}

/// End-to-end ingestion pipeline for one market.
pub struct IngestionOrchestrator {
    transport: Arc<RetryingTransport>,
    fetcher: IntervalFetcher,
    store: Arc<dyn TradeStore>,
    config: IngestConfig,
    shutdown: Option<SharedShutdown>,
    progress: Option<Box<ProgressCallback>>,
}

impl IngestionOrchestrator {
    /// Create an orchestrator over a trade source and a durable store.
    ///
    /// The rate limiter, retrying transport, and interval fetcher are built
    /// here from `config` so all request paths share one admission budget.
    pub fn new(
        source: Arc<dyn TradeSource>,
        store: Arc<dyn TradeStore>,
        config: IngestConfig,
    ) -> Self {
        let rate_limiter = RateLimiter::per_second(config.requests_per_second);
        let transport = Arc::new(RetryingTransport::new(
            source,
            rate_limiter,
            config.max_attempts,
            config.retry_base_delay,
        ));
        let fetcher = IntervalFetcher::new(
            transport.clone(),
            config.page_limit,
            config.max_pages_per_interval,
        );

        Self {
            transport,
            fetcher,
            store,
            config,
            shutdown: shutdown::get_global_shutdown(),
            progress: None,
        }
    }

    /// Attach a shared shutdown handle for cooperative cancellation between
    /// intervals.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Attach a progress callback invoked after each interval.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }

    /// Flush the batch buffer to the store. A store failure here is fatal
    /// for the run; prior flushes remain durable.
    fn flush(&self, batch: &mut Vec<Trade>) -> Result<(), IngestError> {
        if batch.is_empty() {
            return Ok(());
        }

        let inserted = self.store.insert_batch(batch)?;
        metrics::record_batch_flush(batch.len());
        info!(
            batch = batch.len(),
            inserted, "Flushed trade batch to store"
        );
        batch.clear();
        Ok(())
    }

    /// Run the full pipeline for `market_id`, ingesting `[boundary, now)`.
    ///
    /// Returns `Ok` with a [`RunResult`] for both complete and cancelled
    /// (partial) runs; `Err` only when configuration is invalid or the
    /// durable store fails.
    pub async fn run(&self, market_id: &str) -> Result<RunResult, IngestError> {
        self.config
            .validate()
            .map_err(IngestError::InvalidConfig)?;

        let run_metrics = RunMetrics::start(market_id);
        match self.run_inner(market_id).await {
            Ok(result) => {
                run_metrics.record_success(result.new_count, result.duplicate_count);
                Ok(result)
            }
            Err(e) => {
                run_metrics.record_failure(&e.to_string());
                Err(e)
            }
        }
    }

    async fn run_inner(&self, market_id: &str) -> Result<RunResult, IngestError> {
        // ── Resolving boundary ──────────────────────────────────────────
        let resolver = StartBoundaryResolver::new(
            &self.transport,
            self.store.as_ref(),
            self.config.fallback_start,
        );
        let start = resolver.resolve(market_id).await;

        let existing = self.store.existing_signatures(market_id)?;
        let seeded = existing.len();
        let mut signatures = SignatureStore::new();
        signatures.seed(existing);

        // ── Generating intervals ────────────────────────────────────────
        let end = Utc::now().timestamp();
        let intervals = generate_intervals(start, end);

        info!(
            market_id,
            start,
            end,
            intervals = intervals.len(),
            seeded_signatures = seeded,
            "Ingestion plan ready"
        );

        let mut result = RunResult {
            total_intervals: intervals.len(),
            completed: true,
            ..RunResult::default()
        };

        if intervals.is_empty() {
            info!(market_id, "Nothing to ingest");
            return Ok(result);
        }

        // ── Fetching ────────────────────────────────────────────────────
        let mut batch: Vec<Trade> = Vec::with_capacity(self.config.batch_size);

        for (index, interval) in intervals.iter().enumerate() {
            if self.shutdown_requested() {
                // Between-interval cancellation: everything accepted so far
                // belongs to completed intervals, so flush it before
                // reporting the unprocessed tail.
                self.flush(&mut batch)?;
                result.remaining_intervals = intervals[index..].to_vec();
                result.completed = false;
                warn!(
                    market_id,
                    processed = index,
                    remaining = result.remaining_intervals.len(),
                    "Run cancelled; partial progress is durable and resumable"
                );
                return Ok(result);
            }

            let records = self.fetcher.fetch(market_id, interval).await;

            if records.failed {
                // Zero rows from a failed interval is not evidence of an
                // empty day; record it so the caller can re-run.
                warn!(
                    market_id,
                    interval = %interval,
                    "Interval fetch failed after retries; continuing with next interval"
                );
                result.failed_intervals.push(*interval);
            }

            if records.truncated {
                metrics::record_truncated_interval();
                result.truncated_intervals.push(*interval);
            }

            for trade in records.trades {
                if signatures.insert(trade.signature()) {
                    batch.push(trade);
                    result.new_count += 1;
                    if batch.len() >= self.config.batch_size {
                        self.flush(&mut batch)?;
                    }
                } else {
                    result.duplicate_count += 1;
                }
            }

            if let Some(progress) = &self.progress {
                progress(&ProgressUpdate {
                    interval_index: index,
                    total_intervals: intervals.len(),
                    new_count: result.new_count,
                    duplicate_count: result.duplicate_count,
                });
            }
        }

        // ── Done ────────────────────────────────────────────────────────
        self.flush(&mut batch)?;

        info!(
            market_id,
            new_count = result.new_count,
            duplicate_count = result.duplicate_count,
            truncated = result.truncated_intervals.len(),
            failed = result.failed_intervals.len(),
            "Ingestion complete"
        );

        Ok(result)
    }
}
