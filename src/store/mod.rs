//! Durable trade store
//!
//! The pipeline only ever touches storage through the [`TradeStore`] trait:
//! batched inserts, the existing-signature set, and the oldest persisted
//! timestamp, each scoped by market. Everything else about the store
//! (schema, location, engine) is the implementation's business.

use crate::Trade;
use std::collections::HashSet;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryTradeStore;
pub use sqlite::SqliteTradeStore;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database-level failure
    #[error("database error: {0}")]
    Database(String),

    /// IO failure (opening the database file, creating directories)
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Durable storage for ingested trades.
///
/// A batch insert is atomic: either every row of the batch is durable or
/// none is. Inserting a trade whose identity already exists is a no-op, so
/// replays are harmless.
pub trait TradeStore: Send + Sync {
    /// Persist a batch of trades. Returns the number of rows actually
    /// inserted (duplicates of already-persisted rows are skipped).
    fn insert_batch(&self, trades: &[Trade]) -> StoreResult<usize>;

    /// Signatures of every trade already persisted for `market_id`.
    fn existing_signatures(&self, market_id: &str) -> StoreResult<HashSet<String>>;

    /// Oldest persisted trade timestamp for `market_id`, if any.
    fn oldest_timestamp(&self, market_id: &str) -> StoreResult<Option<i64>>;
}
