//! Global request pacing for outbound LLM calls
//!
//! The free-tier endpoints the generator relies on throttle aggressively,
//! so all LLM traffic is serialized through a single delay lock: no two
//! paced calls start less than `min_interval` apart, process-wide.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Serializes outbound requests with a fixed minimum interval.
///
/// Shared behind an `Arc` by every provider the manager drives. The lock
/// is held across the sleep so concurrent callers queue up rather than
/// racing past the interval check.
#[derive(Debug)]
pub struct RequestPacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    /// Create a pacer with the given minimum interval between requests.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until the minimum interval since the previous paced call has
    /// elapsed, then stamp the clock.
    ///
    /// Returns the duration actually waited.
    pub async fn pace(&self) -> Duration {
        let mut last = self.last_request.lock().await;

        let wait = match *last {
            Some(prev) => self.min_interval.saturating_sub(prev.elapsed()),
            None => Duration::ZERO,
        };

        if wait > Duration::ZERO {
            debug!(wait_ms = wait.as_millis() as u64, "Pacing outbound LLM request");
            tokio::time::sleep(wait).await;
        }

        *last = Some(Instant::now());
        wait
    }

    /// The configured minimum interval
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Forget the last request time so the next call goes out immediately.
    pub async fn reset(&self) {
        *self.last_request.lock().await = None;
    }
}
