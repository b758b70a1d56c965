//! Shared test doubles: a simulated trade source with the upstream's known
//! quirks (offset defect, ignored window parameters) and store decorators
//! for observing batch behavior.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use trade_history_ingestor::fetcher::{FetchError, FetchResult, PageQuery, TradeSource};
use trade_history_ingestor::ingest::intervals::SECONDS_PER_DAY;
use trade_history_ingestor::store::{StoreError, StoreResult, TradeStore};
use trade_history_ingestor::Trade;

/// Build one raw trade row in the upstream's flat JSON shape.
pub fn trade_row(ts: i64, trader: &str) -> Value {
    json!({
        "proxyWallet": trader,
        "side": "buy",
        "conditionId": "0xmarket",
        "size": 1.0,
        "price": 0.5,
        "timestamp": ts,
    })
}

/// Spread `total` rows evenly across `days` days ending at `end_ts`
/// (exclusive), sorted newest-first like the upstream feed. Each row gets a
/// distinct trader so all signatures are unique.
pub fn spread_rows(total: usize, end_ts: i64, days: usize) -> Vec<Value> {
    let span = days as i64 * SECONDS_PER_DAY;
    let start = end_ts - span;
    let mut rows: Vec<Value> = (0..total)
        .map(|i| {
            // +1 keeps the first row strictly inside [start, end_ts)
            let ts = start + 1 + (i as i64 * (span - 2)) / total.max(1) as i64;
            trade_row(ts, &format!("0x{i:06x}"))
        })
        .collect();
    rows.sort_by_key(|r| std::cmp::Reverse(r["timestamp"].as_i64().unwrap()));
    rows
}

/// Simulated paginated trade source.
///
/// Serves a fixed dataset (sorted newest-first) with offset pagination and
/// reproduces two upstream behaviors on demand: ignoring the time-window
/// parameters, and the offset defect where pages beyond a cumulative offset
/// threshold repeat stale data instead of advancing.
pub struct SimulatedSource {
    rows: Vec<Value>,
    metadata: Option<Value>,
    honors_window: bool,
    offset_defect_threshold: Option<usize>,
    fail_window: Option<(i64, i64)>,
    requests: AtomicU64,
}

impl SimulatedSource {
    /// Source over `rows`, honoring window parameters, no defect.
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows,
            metadata: None,
            honors_window: true,
            offset_defect_threshold: None,
            fail_window: None,
            requests: AtomicU64::new(0),
        }
    }

    /// Attach a market metadata document.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Metadata with a creation timestamp `days` days before `end_ts`.
    pub fn with_created_days_before(self, end_ts: i64, days: i64) -> Self {
        self.with_metadata(json!({ "createdAt": end_ts - days * SECONDS_PER_DAY }))
    }

    /// Ignore the query window: every page is served from the full dataset.
    pub fn ignoring_window(mut self) -> Self {
        self.honors_window = false;
        self
    }

    /// Reproduce the offset defect: offsets beyond `threshold` serve the
    /// page at `threshold` again (stale repeats, as observed upstream).
    pub fn with_offset_defect(mut self, threshold: usize) -> Self {
        self.offset_defect_threshold = Some(threshold);
        self
    }

    /// Fail every trade request whose query start falls in `[start, end)`.
    pub fn failing_window(mut self, start: i64, end: i64) -> Self {
        self.fail_window = Some((start, end));
        self
    }

    /// Number of trade-page requests served so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TradeSource for SimulatedSource {
    async fn fetch_trades(&self, _market_id: &str, query: &PageQuery) -> FetchResult<Vec<Value>> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if let Some((start, end)) = self.fail_window {
            if query.start >= start && query.start < end {
                return Err(FetchError::NetworkError("simulated outage".to_string()));
            }
        }

        let candidates: Vec<&Value> = self
            .rows
            .iter()
            .filter(|r| {
                if !self.honors_window {
                    return true;
                }
                let ts = r["timestamp"].as_i64().unwrap_or(0);
                ts >= query.start && ts < query.end
            })
            .collect();

        let offset = match self.offset_defect_threshold {
            Some(threshold) if query.offset > threshold => threshold,
            _ => query.offset,
        };

        Ok(candidates
            .into_iter()
            .skip(offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn market_metadata(&self, market_id: &str) -> FetchResult<Value> {
        match &self.metadata {
            Some(doc) => Ok(doc.clone()),
            None => Err(FetchError::ApiError(format!(
                "client error 404: market {market_id} not found"
            ))),
        }
    }

    fn base_url(&self) -> &str {
        "mock://simulated"
    }
}

/// Store decorator recording batch sizes handed to `insert_batch`.
pub struct CountingStore<S> {
    inner: S,
    max_batch: AtomicUsize,
    batches: AtomicUsize,
}

impl<S: TradeStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            max_batch: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
        }
    }

    pub fn max_batch_len(&self) -> usize {
        self.max_batch.load(Ordering::SeqCst)
    }

    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

impl<S: TradeStore> TradeStore for CountingStore<S> {
    fn insert_batch(&self, trades: &[Trade]) -> StoreResult<usize> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.max_batch.fetch_max(trades.len(), Ordering::SeqCst);
        self.inner.insert_batch(trades)
    }

    fn existing_signatures(&self, market_id: &str) -> StoreResult<HashSet<String>> {
        self.inner.existing_signatures(market_id)
    }

    fn oldest_timestamp(&self, market_id: &str) -> StoreResult<Option<i64>> {
        self.inner.oldest_timestamp(market_id)
    }
}

/// Store decorator that starts failing inserts after `allowed` batches.
pub struct FailingStore<S> {
    inner: S,
    allowed: usize,
    batches: AtomicUsize,
}

impl<S: TradeStore> FailingStore<S> {
    pub fn after(inner: S, allowed: usize) -> Self {
        Self {
            inner,
            allowed,
            batches: AtomicUsize::new(0),
        }
    }
}

impl<S: TradeStore> TradeStore for FailingStore<S> {
    fn insert_batch(&self, trades: &[Trade]) -> StoreResult<usize> {
        let seen = self.batches.fetch_add(1, Ordering::SeqCst);
        if seen >= self.allowed {
            return Err(StoreError::Database("simulated disk full".to_string()));
        }
        self.inner.insert_batch(trades)
    }

    fn existing_signatures(&self, market_id: &str) -> StoreResult<HashSet<String>> {
        self.inner.existing_signatures(market_id)
    }

    fn oldest_timestamp(&self, market_id: &str) -> StoreResult<Option<i64>> {
        self.inner.oldest_timestamp(market_id)
    }
}
