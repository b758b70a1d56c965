//! Retry behavior through the transport and fetcher layers

use crate::support::{spread_rows, SimulatedSource};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use trade_history_ingestor::fetcher::{
    FetchError, FetchResult, PageData, PageQuery, RetryingTransport, TradeSource,
};
use trade_history_ingestor::ingest::{IngestConfig, IngestionOrchestrator, RateLimiter};
use trade_history_ingestor::store::MemoryTradeStore;

/// Source that fails a configured number of times before succeeding.
struct FlakySource {
    failures: u32,
    calls: AtomicU32,
}

impl FlakySource {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl TradeSource for FlakySource {
    async fn fetch_trades(&self, _market_id: &str, _query: &PageQuery) -> FetchResult<Vec<Value>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
            Err(FetchError::ServiceDegraded(
                "indexers too far behind".to_string(),
            ))
        } else {
            Ok(vec![json!({
                "proxyWallet": "0xtrader",
                "size": 1.0,
                "price": 0.5,
                "timestamp": 1_700_000_000,
            })])
        }
    }

    async fn market_metadata(&self, _market_id: &str) -> FetchResult<Value> {
        Err(FetchError::ApiError("no metadata".to_string()))
    }

    fn base_url(&self) -> &str {
        "mock://flaky"
    }
}

fn transport(source: Arc<dyn TradeSource>, max_attempts: u32) -> RetryingTransport {
    RetryingTransport::new(
        source,
        RateLimiter::per_second(100_000.0),
        max_attempts,
        Duration::from_millis(1),
    )
}

fn page() -> PageQuery {
    PageQuery {
        start: 1_699_999_000,
        end: 1_700_001_000,
        limit: 500,
        offset: 0,
    }
}

#[tokio::test]
async fn test_two_failures_then_success_records_two_retries() {
    let source = Arc::new(FlakySource::new(2));
    let fetch = transport(source.clone(), 3).fetch_page("0xmarket", &page()).await;

    match fetch.data {
        PageData::Records(rows) => assert_eq!(rows.len(), 1),
        PageData::Unavailable => panic!("expected records after two retries"),
    }
    assert_eq!(fetch.retries, 2);
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_exhausted_retries_are_an_explicit_unavailable_value() {
    let source = Arc::new(FlakySource::new(u32::MAX));
    let fetch = transport(source.clone(), 3).fetch_page("0xmarket", &page()).await;

    assert!(matches!(fetch.data, PageData::Unavailable));
    // The attempt cap bounds the damage: 3 attempts, no more
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_attempt_cap_of_one_never_retries() {
    let source = Arc::new(FlakySource::new(1));
    let fetch = transport(source.clone(), 1).fetch_page("0xmarket", &page()).await;

    assert!(matches!(fetch.data, PageData::Unavailable));
    assert_eq!(fetch.retries, 0);
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
}

/// A run against a source whose every trade request fails still completes,
/// reporting every interval as failed rather than aborting.
#[tokio::test]
async fn test_run_against_dead_source_completes_with_failed_intervals() {
    let end_ts = Utc::now().timestamp() - 5;
    let source = SimulatedSource::new(spread_rows(100, end_ts, 2))
        .with_created_days_before(end_ts, 2)
        .failing_window(i64::MIN, i64::MAX);

    let config = IngestConfig {
        requests_per_second: 100_000.0,
        retry_base_delay: Duration::from_millis(1),
        max_attempts: 2,
        ..IngestConfig::default()
    };
    let orchestrator = IngestionOrchestrator::new(
        Arc::new(source),
        Arc::new(MemoryTradeStore::new()),
        config,
    );

    let result = orchestrator.run("0xmarket").await.unwrap();

    assert!(result.completed);
    assert_eq!(result.new_count, 0);
    assert_eq!(result.failed_intervals.len(), result.total_intervals);
}
