//! HTTP trade source for the Polymarket data and gamma APIs
//!
//! Thin status- and body-mapping client. Retry, backoff, and rate limiting
//! live in [`crate::fetcher::transport`]; this type only classifies what the
//! wire returned so the transport can decide what is retryable.

use crate::fetcher::{FetchError, FetchResult, PageQuery, TradeSource};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Default base URL for the trade endpoint.
pub const DEFAULT_DATA_API_URL: &str = "https://data-api.polymarket.com";

/// Default base URL for the market metadata endpoint.
pub const DEFAULT_GAMMA_API_URL: &str = "https://gamma-api.polymarket.com";

/// Request timeout for both endpoints.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// In-body error markers that indicate a degraded (retryable) backend
/// rather than a caller mistake.
const DEGRADED_MARKERS: [&str; 3] = ["bad indexers", "unavailable", "too far behind"];

/// HTTP client over the trade and metadata endpoints.
pub struct HttpTradeSource {
    client: Client,
    data_url: String,
    gamma_url: String,
}

impl HttpTradeSource {
    /// Create a source against the default public endpoints.
    pub fn new() -> Self {
        Self::with_urls(DEFAULT_DATA_API_URL, DEFAULT_GAMMA_API_URL)
    }

    /// Create a source against custom endpoints (mirrors, test servers).
    pub fn with_urls(data_url: impl Into<String>, gamma_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            data_url: data_url.into(),
            gamma_url: gamma_url.into(),
        }
    }

    /// Map a response body into trade rows.
    ///
    /// The endpoint has returned both a bare JSON array and a
    /// `{"data": [...]}` envelope; an `{"errors": [...]}` body on a 200
    /// signals a degraded backend.
    fn extract_rows(body: Value) -> FetchResult<Vec<Value>> {
        if let Value::Array(rows) = body {
            return Ok(rows);
        }

        if let Some(errors) = body.get("errors") {
            let message = errors.to_string();
            let lowered = message.to_lowercase();
            if DEGRADED_MARKERS.iter().any(|m| lowered.contains(m)) {
                return Err(FetchError::ServiceDegraded(message));
            }
            return Err(FetchError::ApiError(message));
        }

        match body.get("data") {
            Some(Value::Array(rows)) => Ok(rows.clone()),
            Some(Value::Null) | None => Err(FetchError::InvalidResponse(format!(
                "unexpected trade response shape: {}",
                truncate(&body.to_string(), 200)
            ))),
            Some(other) => Err(FetchError::InvalidResponse(format!(
                "unexpected data field type: {}",
                truncate(&other.to_string(), 200)
            ))),
        }
    }

    /// Classify a non-success HTTP status.
    async fn status_error(response: reqwest::Response) -> FetchError {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return FetchError::RateLimitExceeded;
        }

        if status.is_server_error() {
            return FetchError::HttpError(format!("server error: {status}"));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        FetchError::ApiError(format!("client error {status}: {}", truncate(&body, 200)))
    }
}

impl Default for HttpTradeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TradeSource for HttpTradeSource {
    async fn fetch_trades(&self, market_id: &str, query: &PageQuery) -> FetchResult<Vec<Value>> {
        let url = format!("{}/trades", self.data_url);
        // startTs/endTs narrow the window server-side where the deployment
        // supports them; ignored otherwise, which the caller's client-side
        // filter covers.
        let params = [
            ("market", market_id.to_string()),
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
            ("startTs", query.start.to_string()),
            ("endTs", query.end.to_string()),
        ];

        debug!(market_id, offset = query.offset, limit = query.limit, "GET {url}");

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::ParseError(format!("failed to deserialize trades: {e}")))?;

        Self::extract_rows(body)
    }

    async fn market_metadata(&self, market_id: &str) -> FetchResult<Value> {
        let url = format!("{}/markets/{}", self.gamma_url, market_id);

        debug!(market_id, "GET {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::ParseError(format!("failed to deserialize metadata: {e}")))
    }

    fn base_url(&self) -> &str {
        &self.data_url
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
