// ── Retry with exponential backoff ──
//
// Used for liveness probes only. Session operations are never retried;
// a PTZ move or a reboot must not be replayed behind the caller's back.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Bounded exponential backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. 0 and 1 both mean "no retry".
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt.min(30)).unwrap_or(30);
        let base = self.initial_delay.as_secs_f64() * 2.0_f64.powi(exp);
        let capped = base.min(self.max_delay.as_secs_f64());

        // Deterministic spread seeded from the attempt number.
        let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
        Duration::from_secs_f64((capped * jitter_factor).max(0.0))
    }

    /// Run `op` until it succeeds, `should_retry` rejects the error, the
    /// attempts run out, or `cancel` fires. The last error is returned.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        should_retry: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            attempt += 1;
            if attempt >= attempts || !should_retry(&err) {
                return Err(err);
            }

            let delay = self.backoff(attempt - 1);
            debug!(attempt, delay_ms = delay.as_millis(), "retrying");
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(err),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}
