//! Trade row parser
//!
//! Stateless conversion of raw JSON rows into [`Trade`] structs. The source
//! has reported trades in two shapes over time: a flat object
//! (`proxyWallet`, `size`) and a nested object (`user.id`, `amount`). Both
//! are accepted here so the rest of the pipeline sees one representation.
//!
//! Parsing is tolerant: a malformed row is dropped (with a debug log) rather
//! than failing the page, matching how the upstream feed occasionally
//! interleaves partial records.

use crate::{Trade, TradeSide};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;

/// Parse a page of raw JSON rows into trades, skipping malformed rows.
pub fn parse_trades(rows: &[Value], market_id: &str) -> Vec<Trade> {
    let mut trades = Vec::with_capacity(rows.len());

    for row in rows {
        match parse_trade(row, market_id) {
            Some(trade) => trades.push(trade),
            None => {
                debug!(market_id, row = %row, "Skipping malformed trade row");
            }
        }
    }

    trades
}

/// Parse a single raw row into a [`Trade`].
///
/// Returns `None` when required fields are missing or invalid (no trader,
/// non-positive timestamp, unparseable price/size).
pub fn parse_trade(row: &Value, market_id: &str) -> Option<Trade> {
    let timestamp = parse_i64(row.get("timestamp")?)?;
    if timestamp <= 0 {
        return None;
    }

    let price = parse_decimal(row.get("price")?)?;

    // Flat rows use "size", nested rows use "amount"
    let size = row
        .get("size")
        .and_then(parse_decimal)
        .or_else(|| row.get("amount").and_then(parse_decimal))?;

    // Flat rows carry the trader as "proxyWallet" or "user"; nested rows as
    // an object under "user" with an "id" field
    let trader_id = match row.get("user") {
        Some(Value::Object(user)) => user.get("id").and_then(Value::as_str).map(str::to_string),
        Some(Value::String(user)) => Some(user.clone()),
        _ => row
            .get("proxyWallet")
            .and_then(Value::as_str)
            .map(str::to_string),
    }?;
    if trader_id.is_empty() {
        return None;
    }

    let side = row
        .get("side")
        .and_then(Value::as_str)
        .map(|s| TradeSide::from_str(s).unwrap_or(TradeSide::Unknown))
        .unwrap_or(TradeSide::Unknown);

    let outcome_index = row
        .get("outcomeIndex")
        .and_then(parse_i64)
        .and_then(|i| u32::try_from(i).ok());

    Some(Trade {
        timestamp,
        price,
        size,
        trader_id,
        market_id: market_id.to_string(),
        side,
        outcome_index,
    })
}

/// Accept integers directly and numeric strings ("1719792000").
fn parse_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Accept JSON numbers and decimal strings.
///
/// Numbers go through their serde_json text form, which is the shortest
/// round-trippable representation, so the resulting [`Decimal`] display is
/// deterministic for a given wire value. Signatures depend on this.
fn parse_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s).ok(),
        _ => None,
    }
}
