//! Trade fetching implementations

use async_trait::async_trait;
use serde_json::Value;

pub mod http;
pub mod interval;
pub mod parse;
pub mod transport;

pub use http::HttpTradeSource;
pub use interval::{IntervalFetcher, IntervalRecords};
pub use transport::{PageData, PageFetch, RetryingTransport};

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request error (5xx and other status failures)
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// API error response (non-retryable 4xx or in-body error)
    #[error("API error: {0}")]
    ApiError(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Source reported partial availability (e.g. degraded indexers inside
    /// an otherwise-200 response body)
    #[error("service degraded: {0}")]
    ServiceDegraded(String),

    /// Network error (timeout, connection refused)
    #[error("network error: {0}")]
    NetworkError(String),

    /// Invalid response shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl FetchError {
    /// Whether a request failing with this error should be retried.
    ///
    /// Transient conditions (network faults, 429, server errors, degraded
    /// indexers) are retryable; malformed responses and client errors are
    /// not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::NetworkError(_)
                | FetchError::RateLimitExceeded
                | FetchError::ServiceDegraded(_)
                | FetchError::HttpError(_)
        )
    }
}

/// Result type for fetcher operations
pub type FetchResult<T> = Result<T, FetchError>;

/// One page request against the trade endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    /// Window start, inclusive (Unix timestamp in seconds)
    pub start: i64,
    /// Window end, exclusive (Unix timestamp in seconds)
    pub end: i64,
    /// Maximum rows per page
    pub limit: usize,
    /// Rows to skip (offset pagination)
    pub offset: usize,
}

/// A paginated trade source.
///
/// Implementations return raw JSON rows; parsing and window filtering happen
/// in the caller so every source benefits from the same tolerance and the
/// mandatory client-side timestamp filter.
#[async_trait]
pub trait TradeSource: Send + Sync {
    /// Fetch one page of trades for a market.
    ///
    /// The window in `query` is passed to the source where supported; the
    /// source may ignore it, so callers must still filter client-side.
    async fn fetch_trades(&self, market_id: &str, query: &PageQuery) -> FetchResult<Vec<Value>>;

    /// Fetch the market description document, which may carry a creation or
    /// start date field.
    async fn market_metadata(&self, market_id: &str) -> FetchResult<Value>;

    /// Base URL this source queries, for logging.
    fn base_url(&self) -> &str;
}
