//! Ingestion configuration and backoff calculation

use std::time::Duration;

/// Default sustained request rate (requests per second).
/// Conservative enough for the public data API; the limiter spaces requests
/// evenly rather than bursting at window boundaries.
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 10.0;

/// Default maximum attempts per request (1 initial + 2 retries).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default initial backoff delay.
/// 1 second is long enough for rate limit windows to reset but short enough
/// to not overly delay recovery from transient errors.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Maximum backoff delay. Caps exponential growth so a deep retry chain
/// never stalls the pipeline for minutes.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Default number of trades accumulated before a batch is flushed to the
/// store. Bounds peak memory independent of total history size.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Default number of rows requested per page.
pub const DEFAULT_PAGE_LIMIT: usize = 500;

/// Default maximum pages fetched per daily interval.
///
/// The upstream offset pagination returns stale pages beyond a cumulative
/// offset of roughly 1000-1500 rows (observed, not documented), so the
/// default depth cap of 3 pages x 500 rows stays at that boundary. Busier
/// days are flagged truncated rather than silently undercounted.
pub const DEFAULT_MAX_PAGES_PER_INTERVAL: usize = 3;

/// Default fallback start timestamp: 2020-01-01T00:00:00Z, before the
/// earliest market on the platform. Used only when neither source metadata
/// nor the store yields a boundary.
pub const DEFAULT_FALLBACK_START: i64 = 1_577_836_800;

/// Configuration for one ingestion run.
///
/// Passed explicitly into each component at construction; there is no
/// ambient global configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Maximum sustained request rate across all callers (requests/second)
    pub requests_per_second: f64,
    /// Maximum attempts per request, including the first (>= 1)
    pub max_attempts: u32,
    /// Initial backoff delay, doubled on each retry
    pub retry_base_delay: Duration,
    /// Trades accumulated before a batch flush
    pub batch_size: usize,
    /// Rows requested per page
    pub page_limit: usize,
    /// Pagination depth cap per daily interval
    pub max_pages_per_interval: usize,
    /// Start timestamp used when no other boundary source succeeds (seconds)
    pub fallback_start: i64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            batch_size: DEFAULT_BATCH_SIZE,
            page_limit: DEFAULT_PAGE_LIMIT,
            max_pages_per_interval: DEFAULT_MAX_PAGES_PER_INTERVAL,
            fallback_start: DEFAULT_FALLBACK_START,
        }
    }
}

impl IngestConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            return Err(format!(
                "requests_per_second must be positive, got {}",
                self.requests_per_second
            ));
        }

        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }

        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".to_string());
        }

        if self.page_limit == 0 {
            return Err("page_limit must be at least 1".to_string());
        }

        if self.max_pages_per_interval == 0 {
            return Err("max_pages_per_interval must be at least 1".to_string());
        }

        Ok(())
    }
}

/// Calculate exponential backoff delay for a retry.
///
/// `retry_count` is zero-based: the delay before the first retry is `base`,
/// doubling each retry after that, capped at [`MAX_BACKOFF`].
pub fn calculate_backoff(base: Duration, retry_count: u32) -> Duration {
    let factor = 2u32.checked_pow(retry_count).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(MAX_BACKOFF).min(MAX_BACKOFF)
}
