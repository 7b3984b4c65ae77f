use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Bounded exponential backoff used for profile fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always at least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(200), max_delay: Duration::from_secs(5) }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), base_delay, max_delay }
    }

    /// Delay before attempt `failed + 1`, given `failed` failures so far (1-based).
    pub fn delay_after(&self, failed: u32) -> Duration {
        let shift = failed.saturating_sub(1).min(16);
        let d = self.base_delay.saturating_mul(1u32 << shift);
        d.min(self.max_delay)
    }

    /// Run `op` until it succeeds or attempts run out. Returns the last error
    /// together with the number of attempts made.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, (anyhow::Error, u32)>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut attempt = 1u32;
        loop {
            match op(attempt).await {
                Ok(v) => return Ok(v),
                Err(e) if attempt >= self.max_attempts.max(1) => return Err((e, attempt)),
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(target: "unishorts::gate", "{} attempt {}/{} failed: {:#}; retrying in {:?}", label, attempt, self.max_attempts, e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
