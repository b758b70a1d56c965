//! Retrying transport around a trade source
//!
//! Wraps every source call with rate limiting and bounded
//! exponential-backoff retries. Exhausted retries degrade to an explicit
//! [`PageData::Unavailable`] value instead of an error: a failed page is a
//! fact the orchestrator must record, not an exception that aborts a run.
//! Callers must not treat `Unavailable` as "no data exists".

use crate::fetcher::{FetchError, PageQuery, TradeSource};
use crate::ingest::config::calculate_backoff;
use crate::ingest::rate_limit::RateLimiter;
use crate::metrics;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Outcome of fetching one page through the transport.
#[derive(Debug)]
pub enum PageData {
    /// Rows retrieved successfully (the page may legitimately be empty)
    Records(Vec<Value>),
    /// All attempts exhausted; whether data exists is unknown
    Unavailable,
}

/// One page fetch with its retry accounting.
#[derive(Debug)]
pub struct PageFetch {
    /// What came back
    pub data: PageData,
    /// Retries performed beyond the initial attempt
    pub retries: u32,
}

/// Rate-limited, retrying wrapper over a [`TradeSource`].
pub struct RetryingTransport {
    source: Arc<dyn TradeSource>,
    rate_limiter: RateLimiter,
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryingTransport {
    /// Create a transport over `source`.
    ///
    /// `max_attempts` includes the initial attempt and is clamped to at
    /// least 1. Every attempt passes through `rate_limiter` first, so
    /// retries consume request budget like any other call.
    pub fn new(
        source: Arc<dyn TradeSource>,
        rate_limiter: RateLimiter,
        max_attempts: u32,
        base_delay: Duration,
    ) -> Self {
        Self {
            source,
            rate_limiter,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Fetch one page of trades, retrying transient failures.
    pub async fn fetch_page(&self, market_id: &str, query: &PageQuery) -> PageFetch {
        for attempt in 0..self.max_attempts {
            self.rate_limiter.acquire().await;

            match self.source.fetch_trades(market_id, query).await {
                Ok(rows) => {
                    metrics::record_request("trades", true);
                    debug!(
                        market_id,
                        offset = query.offset,
                        rows = rows.len(),
                        attempt = attempt + 1,
                        "Page fetched"
                    );
                    return PageFetch {
                        data: PageData::Records(rows),
                        retries: attempt,
                    };
                }
                Err(e) => {
                    metrics::record_request("trades", false);
                    if !self.backoff_or_give_up(market_id, attempt, &e).await {
                        return PageFetch {
                            data: PageData::Unavailable,
                            retries: attempt,
                        };
                    }
                }
            }
        }

        PageFetch {
            data: PageData::Unavailable,
            retries: self.max_attempts.saturating_sub(1),
        }
    }

    /// Fetch the market metadata document with the same retry envelope.
    ///
    /// Metadata being unavailable is non-fatal for ingestion (the boundary
    /// resolver falls through to its next strategy), hence `Option`.
    pub async fn market_metadata(&self, market_id: &str) -> Option<Value> {
        for attempt in 0..self.max_attempts {
            self.rate_limiter.acquire().await;

            match self.source.market_metadata(market_id).await {
                Ok(doc) => {
                    metrics::record_request("metadata", true);
                    return Some(doc);
                }
                Err(e) => {
                    metrics::record_request("metadata", false);
                    if !self.backoff_or_give_up(market_id, attempt, &e).await {
                        return None;
                    }
                }
            }
        }

        None
    }

    /// Handle one failed attempt. Returns `true` after sleeping the backoff
    /// if another attempt should be made, `false` to give up now.
    async fn backoff_or_give_up(&self, market_id: &str, attempt: u32, error: &FetchError) -> bool {
        if !error.is_retryable() {
            warn!(market_id, error = %error, "Request failed with non-retryable error");
            return false;
        }

        if attempt + 1 >= self.max_attempts {
            warn!(
                market_id,
                attempts = self.max_attempts,
                error = %error,
                "Retries exhausted; treating result as unavailable"
            );
            return false;
        }

        let backoff = calculate_backoff(self.base_delay, attempt);
        warn!(
            market_id,
            attempt = attempt + 1,
            max_attempts = self.max_attempts,
            backoff_ms = backoff.as_millis(),
            error = %error,
            "Retrying after backoff delay"
        );
        metrics::record_retry_backoff(backoff, attempt + 1);
        sleep(backoff).await;
        true
    }
}
