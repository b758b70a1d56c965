//! # Trade History Ingestor Library
//!
//! An incremental, duplicate-safe pipeline for downloading the complete trade
//! history of a prediction market from a paginated HTTP API and persisting it
//! to a local store.
//!
//! ## Features
//!
//! - **Daily Interval Partitioning**: Splits the history into one-day windows
//!   so per-query pagination depth stays below the upstream offset defect
//!   threshold
//! - **Content-Based Deduplication**: Derives a signature from each trade and
//!   skips records already persisted, making runs idempotent and resumable
//! - **Rate Limiting**: Enforces a sustained requests-per-second budget with
//!   smooth inter-request spacing
//! - **Bounded Retries**: Exponential backoff for transient network, 429, and
//!   degraded-indexer responses, degrading to an explicit "unavailable"
//!   outcome instead of aborting the run
//! - **Streaming Persistence**: Flushes fixed-size batches so peak memory is
//!   independent of total history size
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use trade_history_ingestor::fetcher::HttpTradeSource;
//! use trade_history_ingestor::ingest::{IngestConfig, IngestionOrchestrator};
//! use trade_history_ingestor::store::SqliteTradeStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = IngestConfig::default();
//! let source = Arc::new(HttpTradeSource::new());
//! let store = Arc::new(SqliteTradeStore::open("data/trades.db")?);
//!
//! let orchestrator = IngestionOrchestrator::new(source, store, config);
//! let result = orchestrator.run("0x0576b1943...").await?;
//!
//! println!(
//!     "ingested {} new trades ({} duplicates skipped)",
//!     result.new_count, result.duplicate_count
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several core modules:
//!
//! - [`fetcher`] - Trade source abstraction, HTTP client, retrying transport,
//!   and per-interval pagination
//! - [`ingest`] - Ingestion orchestration: configuration, rate limiting,
//!   interval generation, boundary resolution, deduplication
//! - [`store`] - Durable trade store interface with SQLite and in-memory
//!   implementations
//! - [`metrics`] - Production observability counters and histograms
//! - [`shutdown`] - Graceful shutdown coordination
//! - [`cli`] - CLI command implementations

#![warn(missing_docs)]
#![warn(clippy::all)]

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Trade fetching: source trait, HTTP client, retrying transport, pagination
pub mod fetcher;

/// Ingestion orchestration
pub mod ingest;

/// Production observability metrics
pub mod metrics;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// Durable trade store interface and implementations
pub mod store;

// Re-export commonly used types
pub use ingest::{IngestConfig, IngestionOrchestrator, RunResult};

/// Side of a trade as reported by the source.
///
/// The upstream API reports side as a free-form string; anything other than
/// a recognizable buy/sell marker is preserved as [`TradeSide::Unknown`]
/// rather than rejecting the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    /// Taker bought
    #[serde(rename = "buy")]
    Buy,
    /// Taker sold
    #[serde(rename = "sell")]
    Sell,
    /// Side missing or unrecognized
    #[serde(rename = "unknown")]
    Unknown,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
            TradeSide::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TradeSide {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "buy" => TradeSide::Buy,
            "sell" => TradeSide::Sell,
            _ => TradeSide::Unknown,
        })
    }
}

/// One historical trade, immutable once parsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    /// Trade time (Unix timestamp in seconds)
    pub timestamp: i64,
    /// Execution price
    pub price: Decimal,
    /// Trade size (base units)
    pub size: Decimal,
    /// Opaque trader identifier (proxy wallet address)
    pub trader_id: String,
    /// Market identifier (condition id) this trade belongs to
    pub market_id: String,
    /// Trade side as reported by the source
    pub side: TradeSide,
    /// Outcome index within the market, when the source reports one
    pub outcome_index: Option<u32>,
}

impl Trade {
    /// Derive the deduplication signature for this trade.
    ///
    /// Stable concatenation of `(timestamp, price, size, trader_id)`. Two
    /// trades with equal signatures are treated as the same logical event.
    /// This is a heuristic identity: the source assigns no globally unique
    /// key, and distinct trades colliding on all four fields is accepted as
    /// a rare approximation rather than guarded against.
    pub fn signature(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.timestamp, self.price, self.size, self.trader_id
        )
    }

    /// Validate trade data integrity
    pub fn validate(&self) -> Result<(), String> {
        if self.timestamp <= 0 {
            return Err(format!(
                "Timestamp must be positive, got {}",
                self.timestamp
            ));
        }

        if self.trader_id.is_empty() {
            return Err("Trader id cannot be empty".to_string());
        }

        if self.market_id.is_empty() {
            return Err("Market id cannot be empty".to_string());
        }

        if self.size < Decimal::ZERO {
            return Err(format!("Size must be non-negative, got {}", self.size));
        }

        if self.price < Decimal::ZERO {
            return Err(format!("Price must be non-negative, got {}", self.price));
        }

        Ok(())
    }
}
