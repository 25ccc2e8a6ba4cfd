//! Bounded retry for throttled completion calls.
//!
//! Only an explicit throttling signal is retried; every other error
//! propagates on the first attempt. Backoff prefers the server-supplied
//! hint and otherwise grows exponentially with jitter, capped at 30 s.
//! Exhausting the budget surfaces the failure as `Unavailable`, never a
//! silent swallow.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::{Error, Result};

const BACKOFF_CAP_MS: u64 = 30_000;
const JITTER_MS: u64 = 800;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Run `op`, retrying up to `max_retries` times on throttling.
    ///
    /// The attempt counter advances only on throttling retries, so a
    /// successful call after two throttles counts three attempts total.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(Error::Throttled { retry_after }) => {
                    if attempt >= self.max_retries {
                        return Err(Error::Unavailable(format!(
                            "still throttled after {} retries",
                            self.max_retries
                        )));
                    }
                    let delay = retry_after.unwrap_or_else(|| backoff_delay(attempt));
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        hinted = retry_after.is_some(),
                        "completion call throttled, backing off"
                    );
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(other) => return Err(other),
            }
        }
    }
}

/// `min(30000, 2^attempt * 1000 + jitter(0..800))` milliseconds.
fn backoff_delay(attempt: u32) -> Duration {
    let base = 1000u64.saturating_mul(1u64 << attempt.min(15));
    let jitter = rand::thread_rng().gen_range(0..JITTER_MS);
    Duration::from_millis(base.saturating_add(jitter).min(BACKOFF_CAP_MS))
}
