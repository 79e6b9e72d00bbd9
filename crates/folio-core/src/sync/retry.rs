//! Capped exponential backoff for reads
//!
//! Only reads go through here. Writes are attempted once per call; a caller
//! that wants them retried wraps `write` itself.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::SyncResult;

/// Retry limits; whichever cap is hit first ends the loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Ceiling for a single delay
    pub max_delay: Duration,
    /// No new attempt starts after this much time
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            max_elapsed: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A single attempt
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after the `attempt`-th failure (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or a cap
    /// is reached; the last error is returned
    pub async fn run<T, F, Fut>(&self, mut op: F) -> SyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SyncResult<T>>,
    {
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_retryable() {
                debug!("Not retrying: {}", err);
                return Err(err);
            }
            if attempt >= self.max_attempts.max(1) {
                warn!("Giving up after {} attempt(s): {}", attempt, err);
                return Err(err);
            }

            let delay = self.delay_after(attempt);
            if started.elapsed() + delay > self.max_elapsed {
                warn!(
                    "Giving up after {:?} ({} attempt(s)): {}",
                    started.elapsed(),
                    attempt,
                    err
                );
                return Err(err);
            }

            debug!("Attempt {} failed, retrying in {:?}: {}", attempt, delay, err);
            tokio::time::sleep(delay).await;
        }
    }
}
