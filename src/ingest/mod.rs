//! Ingestion orchestration
//!
//! This module provides the core ingestion pipeline with rate limiting,
//! interval partitioning, boundary resolution, and deduplication.
//!
//! # Overview
//!
//! One ingestion run walks a fixed state machine:
//!
//! 1. **Boundary resolution**: [`boundary::StartBoundaryResolver`] finds the
//!    earliest timestamp worth fetching and the dedup set is seeded from the
//!    durable store
//! 2. **Interval generation**: [`intervals::generate_intervals`] tiles
//!    `[start, now)` into daily windows
//! 3. **Fetch loop**: each interval is fetched through the rate-limited
//!    retrying transport, deduplicated, and batched to the store
//! 4. **Done**: the final partial batch is flushed and a
//!    [`orchestrator::RunResult`] is returned
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use trade_history_ingestor::fetcher::HttpTradeSource;
//! use trade_history_ingestor::ingest::{IngestConfig, IngestionOrchestrator};
//! use trade_history_ingestor::store::MemoryTradeStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = IngestionOrchestrator::new(
//!     Arc::new(HttpTradeSource::new()),
//!     Arc::new(MemoryTradeStore::new()),
//!     IngestConfig::default(),
//! );
//! let result = orchestrator.run("0x0576b1943...").await?;
//! assert!(result.completed);
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`orchestrator`] - End-to-end pipeline driver
//! - [`config`] - Configuration and backoff calculation
//! - [`rate_limit`] - Smooth request-rate enforcement
//! - [`intervals`] - Daily window generation
//! - [`boundary`] - Start boundary resolution
//! - [`signature`] - In-memory dedup key set
//!
//! # Error Handling
//!
//! The only fatal error during a run is a durable-store failure: seeding
//! the dedup set or flushing a batch. Everything network-side degrades to
//! per-interval flags in the result instead of aborting.

pub mod boundary;
pub mod config;
pub mod intervals;
pub mod orchestrator;
pub mod rate_limit;
pub mod signature;

pub use config::IngestConfig;
pub use intervals::{generate_intervals, DayInterval};
pub use orchestrator::{IngestionOrchestrator, ProgressUpdate, RunResult};
pub use rate_limit::RateLimiter;
pub use signature::SignatureStore;

use crate::store::StoreError;

/// Ingestion errors
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Durable persistence failed; the run aborts (already-flushed batches
    /// remain valid)
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration rejected by validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
