//! In-memory trade store
//!
//! Backs the `--no-db` mode (fetch and summarize without persisting to
//! disk) and the test suite. Mirrors the SQLite store's semantics: batch
//! inserts are atomic, identity-duplicate rows are skipped.

use crate::store::{StoreResult, TradeStore};
use crate::Trade;
use std::collections::HashSet;
use std::sync::Mutex;

/// [`TradeStore`] kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryTradeStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    trades: Vec<Trade>,
    // market_id + "|" + signature, mirroring the SQLite UNIQUE constraint
    keys: HashSet<String>,
}

fn identity_key(trade: &Trade) -> String {
    format!("{}|{}", trade.market_id, trade.signature())
}

impl MemoryTradeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all persisted trades, in insertion order.
    pub fn trades(&self) -> Vec<Trade> {
        self.lock().trades.clone()
    }

    /// Total trades persisted for a market.
    pub fn trade_count(&self, market_id: &str) -> u64 {
        self.lock()
            .trades
            .iter()
            .filter(|t| t.market_id == market_id)
            .count() as u64
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TradeStore for MemoryTradeStore {
    fn insert_batch(&self, trades: &[Trade]) -> StoreResult<usize> {
        let mut inner = self.lock();
        let mut inserted = 0usize;

        for trade in trades {
            if inner.keys.insert(identity_key(trade)) {
                inner.trades.push(trade.clone());
                inserted += 1;
            }
        }

        Ok(inserted)
    }

    fn existing_signatures(&self, market_id: &str) -> StoreResult<HashSet<String>> {
        Ok(self
            .lock()
            .trades
            .iter()
            .filter(|t| t.market_id == market_id)
            .map(Trade::signature)
            .collect())
    }

    fn oldest_timestamp(&self, market_id: &str) -> StoreResult<Option<i64>> {
        Ok(self
            .lock()
            .trades
            .iter()
            .filter(|t| t.market_id == market_id)
            .map(|t| t.timestamp)
            .min())
    }
}
