//! Daily interval generation
//!
//! The upstream API's offset pagination degrades beyond a cumulative offset
//! of roughly 1000-1500 rows, so the full history is partitioned into
//! one-day windows that each restart pagination from offset zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds in one calendar day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// A half-open time window `[start, end)` in Unix seconds, at most one day
/// wide. Created once by [`generate_intervals`], never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DayInterval {
    /// Inclusive start (Unix timestamp in seconds)
    pub start: i64,
    /// Exclusive end (Unix timestamp in seconds)
    pub end: i64,
}

impl DayInterval {
    /// Whether `timestamp` falls inside this window.
    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp < self.end
    }

    /// Window width in seconds.
    pub fn width(&self) -> i64 {
        self.end - self.start
    }
}

impl std::fmt::Display for DayInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fmt_ts = |ts: i64| {
            DateTime::<Utc>::from_timestamp(ts, 0)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| ts.to_string())
        };
        write!(f, "[{}, {})", fmt_ts(self.start), fmt_ts(self.end))
    }
}

/// Partition `[start, end)` into consecutive [`DayInterval`]s.
///
/// Pure function. The intervals tile the range exactly: each is one day wide
/// except possibly the final partial one, their union equals `[start, end)`,
/// and no two overlap. `start >= end` yields an empty sequence.
pub fn generate_intervals(start: i64, end: i64) -> Vec<DayInterval> {
    if start >= end {
        return Vec::new();
    }

    let mut intervals = Vec::with_capacity(((end - start) / SECONDS_PER_DAY + 1) as usize);
    let mut cursor = start;
    while cursor < end {
        let next = (cursor + SECONDS_PER_DAY).min(end);
        intervals.push(DayInterval {
            start: cursor,
            end: next,
        });
        cursor = next;
    }

    intervals
}
