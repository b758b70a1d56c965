//! SQLite trade store
//!
//! Single-file store with the `trades` table created idempotently on open.
//! Prices and sizes are stored as decimal text so values round-trip exactly
//! and recomputed signatures match what was ingested. Batch inserts run in
//! one transaction (`INSERT OR IGNORE`), giving all-or-nothing durability
//! per batch and making replays harmless.

use crate::store::{StoreError, StoreResult, TradeStore};
use crate::Trade;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS trades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL,
    price TEXT NOT NULL,
    size TEXT NOT NULL,
    trader_id TEXT NOT NULL,
    market_id TEXT NOT NULL,
    side TEXT NOT NULL DEFAULT 'unknown',
    outcome_index INTEGER,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(timestamp, price, size, trader_id, market_id)
)";

const INDEXES: [&str; 3] = [
    "CREATE INDEX IF NOT EXISTS idx_trades_market_id ON trades(market_id)",
    "CREATE INDEX IF NOT EXISTS idx_trades_timestamp ON trades(timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_trades_trader_id ON trades(trader_id)",
];

/// SQLite-backed [`TradeStore`].
///
/// The connection is guarded by a mutex; batch flushes are infrequent enough
/// that contention is not a concern for a single-pipeline run.
pub struct SqliteTradeStore {
    conn: Mutex<Connection>,
}

impl SqliteTradeStore {
    /// Open (creating if necessary) the database at `path` and ensure the
    /// schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }

        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;

        info!(path = %path.display(), "SQLite trade store opened");
        Ok(store)
    }

    /// Open an in-memory database, mainly for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> StoreResult<()> {
        let conn = self.lock();
        conn.execute(SCHEMA, [])
            .map_err(|e| StoreError::Database(e.to_string()))?;
        for index in INDEXES {
            conn.execute(index, [])
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned mutex means a panic mid-statement; propagating the
        // panic is the only sound option.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Total trades persisted for a market.
    pub fn trade_count(&self, market_id: &str) -> StoreResult<u64> {
        let conn = self.lock();
        conn.query_row(
            "SELECT COUNT(*) FROM trades WHERE market_id = ?1",
            params![market_id],
            |row| row.get::<_, i64>(0),
        )
        .map(|n| n as u64)
        .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl TradeStore for SqliteTradeStore {
    fn insert_batch(&self, trades: &[Trade]) -> StoreResult<usize> {
        if trades.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock();
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut inserted = 0usize;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT OR IGNORE INTO trades
                     (timestamp, price, size, trader_id, market_id, side, outcome_index)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .map_err(|e| StoreError::Database(e.to_string()))?;

            for trade in trades {
                let changed = stmt
                    .execute(params![
                        trade.timestamp,
                        trade.price.to_string(),
                        trade.size.to_string(),
                        trade.trader_id,
                        trade.market_id,
                        trade.side.to_string(),
                        trade.outcome_index,
                    ])
                    .map_err(|e| StoreError::Database(e.to_string()))?;
                inserted += changed;
            }
        }

        tx.commit().map_err(|e| StoreError::Database(e.to_string()))?;

        debug!(batch = trades.len(), inserted, "Batch persisted");
        Ok(inserted)
    }

    fn existing_signatures(&self, market_id: &str) -> StoreResult<HashSet<String>> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare(
                "SELECT timestamp, price, size, trader_id FROM trades WHERE market_id = ?1",
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![market_id], |row| {
                let timestamp: i64 = row.get(0)?;
                let price: String = row.get(1)?;
                let size: String = row.get(2)?;
                let trader_id: String = row.get(3)?;
                Ok(format!("{timestamp}|{price}|{size}|{trader_id}"))
            })
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut signatures = HashSet::new();
        for row in rows {
            signatures.insert(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }

        Ok(signatures)
    }

    fn oldest_timestamp(&self, market_id: &str) -> StoreResult<Option<i64>> {
        let conn = self.lock();
        conn.query_row(
            "SELECT MIN(timestamp) FROM trades WHERE market_id = ?1",
            params![market_id],
            |row| row.get::<_, Option<i64>>(0),
        )
        .map_err(|e| StoreError::Database(e.to_string()))
    }
}
