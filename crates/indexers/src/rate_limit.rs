//! Per-indexer request pacing
//!
//! Indexers dislike bursts: each client enforces a minimum interval between
//! its own requests, with a little random jitter so multiple workers do not
//! fall into lockstep.

use rand::Rng;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Default minimum interval between requests to one indexer.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(2);

/// Maximum random jitter added on top of the interval.
const MAX_JITTER_MS: u64 = 250;

/// Enforces a minimum spacing between requests.
#[derive(Debug)]
pub struct RequestPacer {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Sleep until the next request slot, then claim it.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        let now = Instant::now();
        if let Some(previous) = *last {
            let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=MAX_JITTER_MS));
            let next_slot = previous + self.min_interval + jitter;
            if next_slot > now {
                let wait = next_slot - now;
                debug!(?wait, "pacing indexer request");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}
