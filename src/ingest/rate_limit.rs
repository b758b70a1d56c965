//! Request rate limiting with smooth inter-request spacing
//!
//! Enforces a minimum interval between consecutive requests rather than a
//! per-second window, so bursts at window boundaries cannot exceed the
//! configured sustained rate.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Rate limiter shared by all request paths of one run.
///
/// Cloning is cheap; clones share the same admission state, so the
/// configured rate holds across concurrent callers. Admission is serialized
/// through an async mutex held across the wait: no error conditions, callers
/// only ever suspend.
#[derive(Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_admitted: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Create a rate limiter admitting at most `requests_per_second`
    /// requests per second, evenly spaced.
    ///
    /// Non-positive or non-finite rates disable waiting entirely.
    pub fn per_second(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second.is_finite() && requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };

        Self {
            min_interval,
            last_admitted: Arc::new(Mutex::new(None)),
        }
    }

    /// Minimum spacing between consecutive admissions.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Suspend until the caller is permitted to issue one request.
    pub async fn acquire(&self) {
        let mut last = self.last_admitted.lock().await;

        if let Some(prev) = *last {
            let next_allowed = prev + self.min_interval;
            if next_allowed > Instant::now() {
                sleep_until(next_allowed).await;
            }
        }

        *last = Some(Instant::now());
    }
}
