//! Ingestion start boundary resolution
//!
//! Determines the earliest timestamp to ingest from. Strategies are tried in
//! order, each returning an `Option` instead of raising, and the first
//! usable answer wins: authoritative source metadata, then locally persisted
//! history, then a configured fallback. Resolution never fails.

use crate::fetcher::RetryingTransport;
use crate::ingest::intervals::SECONDS_PER_DAY;
use crate::store::TradeStore;
use chrono::DateTime;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Creation/start date fields probed on the market metadata document, in
/// precedence order. The metadata API has reshaped these over time, so all
/// known spellings are tried.
pub const CREATION_DATE_FIELDS: [&str; 5] = [
    "createdAt",
    "created_at",
    "startDate",
    "start_date",
    "created",
];

/// Epoch values at or above this magnitude are interpreted as milliseconds.
const MILLIS_EPOCH_THRESHOLD: i64 = 1_000_000_000_000;

/// Resolves the earliest timestamp to begin ingestion from.
pub struct StartBoundaryResolver<'a> {
    transport: &'a RetryingTransport,
    store: &'a dyn TradeStore,
    fallback_start: i64,
}

impl<'a> StartBoundaryResolver<'a> {
    /// Create a resolver over the given transport and store.
    pub fn new(
        transport: &'a RetryingTransport,
        store: &'a dyn TradeStore,
        fallback_start: i64,
    ) -> Self {
        Self {
            transport,
            store,
            fallback_start,
        }
    }

    /// Resolve the start boundary for `market_id`. Always returns a usable
    /// timestamp (seconds).
    pub async fn resolve(&self, market_id: &str) -> i64 {
        if let Some(ts) = self.from_metadata(market_id).await {
            info!(market_id, start = ts, "Start boundary from market metadata");
            return ts;
        }

        if let Some(ts) = self.from_store(market_id) {
            info!(
                market_id,
                start = ts,
                "Start boundary from oldest persisted trade (one-day safety margin)"
            );
            return ts;
        }

        info!(
            market_id,
            start = self.fallback_start,
            "Start boundary from configured fallback"
        );
        self.fallback_start
    }

    /// Strategy 1: creation/start date from source metadata.
    async fn from_metadata(&self, market_id: &str) -> Option<i64> {
        let doc = self.transport.market_metadata(market_id).await?;
        let ts = creation_timestamp(&doc);
        if ts.is_none() {
            debug!(market_id, "Market metadata carries no recognized creation date field");
        }
        ts
    }

    /// Strategy 2: oldest persisted trade minus one day, to catch records
    /// just before the earliest already-seen trade. Store read failures are
    /// non-fatal here and treated as absence.
    fn from_store(&self, market_id: &str) -> Option<i64> {
        match self.store.oldest_timestamp(market_id) {
            Ok(Some(oldest)) => Some(oldest - SECONDS_PER_DAY),
            Ok(None) => None,
            Err(e) => {
                warn!(market_id, error = %e, "Failed to read oldest persisted timestamp");
                None
            }
        }
    }
}

/// Extract a creation timestamp (seconds) from a market metadata document.
///
/// Probes [`CREATION_DATE_FIELDS`] in order and returns the first field
/// whose value parses as a numeric epoch or an ISO-8601 datetime.
pub fn creation_timestamp(doc: &Value) -> Option<i64> {
    CREATION_DATE_FIELDS
        .iter()
        .filter_map(|field| doc.get(field))
        .find_map(parse_timestamp_value)
}

/// Parse one metadata value as a Unix timestamp in seconds.
fn parse_timestamp_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            let ts = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            if ts <= 0 {
                None
            } else if ts >= MILLIS_EPOCH_THRESHOLD {
                Some(ts / 1000)
            } else {
                Some(ts)
            }
        }
        Value::String(s) => parse_datetime_str(s),
        _ => None,
    }
}

/// Parse an ISO-8601 string, tolerating a missing timezone designator
/// (assumed UTC) and numeric epoch strings.
fn parse_datetime_str(input: &str) -> Option<i64> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.timestamp());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{input}Z")) {
        return Some(dt.timestamp());
    }

    input
        .parse::<i64>()
        .ok()
        .and_then(|n| parse_timestamp_value(&Value::from(n)))
}
