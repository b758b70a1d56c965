//! Start boundary resolution precedence tests

use crate::support::SimulatedSource;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use trade_history_ingestor::fetcher::RetryingTransport;
use trade_history_ingestor::ingest::boundary::StartBoundaryResolver;
use trade_history_ingestor::ingest::intervals::SECONDS_PER_DAY;
use trade_history_ingestor::ingest::RateLimiter;
use trade_history_ingestor::store::{MemoryTradeStore, TradeStore};
use trade_history_ingestor::{Trade, TradeSide};

const FALLBACK: i64 = 1_577_836_800;

fn transport(source: SimulatedSource) -> RetryingTransport {
    RetryingTransport::new(
        Arc::new(source),
        RateLimiter::per_second(100_000.0),
        2,
        Duration::from_millis(1),
    )
}

fn persisted_trade(ts: i64) -> Trade {
    Trade {
        timestamp: ts,
        price: "0.5".parse().unwrap(),
        size: "1".parse().unwrap(),
        trader_id: "0xtrader".to_string(),
        market_id: "0xmarket".to_string(),
        side: TradeSide::Buy,
        outcome_index: None,
    }
}

#[tokio::test]
async fn test_metadata_takes_precedence_over_store() {
    let source = SimulatedSource::new(Vec::new())
        .with_metadata(json!({ "createdAt": "2024-03-01T00:00:00Z" }));
    let transport = transport(source);

    // Store has older data, but authoritative metadata wins
    let store = MemoryTradeStore::new();
    store.insert_batch(&[persisted_trade(1_000_000)]).unwrap();

    let resolver = StartBoundaryResolver::new(&transport, &store, FALLBACK);
    assert_eq!(resolver.resolve("0xmarket").await, 1_709_251_200);
}

#[tokio::test]
async fn test_store_fallback_applies_one_day_margin() {
    // No metadata document at all
    let transport = transport(SimulatedSource::new(Vec::new()));

    let store = MemoryTradeStore::new();
    store
        .insert_batch(&[persisted_trade(1_700_000_000), persisted_trade(1_700_500_000)])
        .unwrap();

    let resolver = StartBoundaryResolver::new(&transport, &store, FALLBACK);
    assert_eq!(
        resolver.resolve("0xmarket").await,
        1_700_000_000 - SECONDS_PER_DAY
    );
}

#[tokio::test]
async fn test_configured_fallback_when_nothing_else_works() {
    let transport = transport(SimulatedSource::new(Vec::new()));
    let store = MemoryTradeStore::new();

    let resolver = StartBoundaryResolver::new(&transport, &store, FALLBACK);
    assert_eq!(resolver.resolve("0xmarket").await, FALLBACK);
}

#[tokio::test]
async fn test_metadata_without_date_fields_falls_through() {
    let source = SimulatedSource::new(Vec::new())
        .with_metadata(json!({ "question": "Will it resolve?", "liquidity": "12000" }));
    let transport = transport(source);

    let store = MemoryTradeStore::new();
    store.insert_batch(&[persisted_trade(1_700_000_000)]).unwrap();

    let resolver = StartBoundaryResolver::new(&transport, &store, FALLBACK);
    assert_eq!(
        resolver.resolve("0xmarket").await,
        1_700_000_000 - SECONDS_PER_DAY
    );
}

#[tokio::test]
async fn test_millisecond_epochs_are_normalized() {
    let source =
        SimulatedSource::new(Vec::new()).with_metadata(json!({ "created_at": 1_709_251_200_000i64 }));
    let transport = transport(source);
    let store = MemoryTradeStore::new();

    let resolver = StartBoundaryResolver::new(&transport, &store, FALLBACK);
    assert_eq!(resolver.resolve("0xmarket").await, 1_709_251_200);
}
