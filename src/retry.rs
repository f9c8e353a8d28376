//! Retry with exponential backoff for page renders.
//!
//! [`RetryRenderer`] wraps any [`Renderer`] and retries failed renders a
//! bounded number of times. The last attempt's error propagates unchanged,
//! so callers decide what a failure means: a failed listing fetch aborts
//! the run, a failed article fetch does not.
//!
//! # Backoff
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
//! ```
//!
//! With the defaults (3 attempts, 1 s base, no jitter) the waits are 1 s
//! then 2 s.

use crate::error::FetchError;
use crate::render::{RenderRequest, Renderer};
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Retry bounds as they appear in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first.
    pub attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_jitter_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            max_jitter_ms: 0,
        }
    }
}

/// Decorator adding bounded retries to a [`Renderer`].
pub struct RetryRenderer<R> {
    inner: R,
    attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
    max_jitter: Duration,
}

impl<R> RetryRenderer<R>
where
    R: Renderer,
{
    pub fn new(inner: R, settings: RetrySettings) -> Self {
        Self {
            inner,
            attempts: settings.attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            max_jitter: Duration::from_millis(settings.max_jitter_ms),
        }
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-based).
    fn backoff(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            delay
        } else {
            delay + Duration::from_millis(rng().random_range(0..=jitter_ms))
        }
    }
}

impl<R> fmt::Debug for RetryRenderer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryRenderer")
            .field("attempts", &self.attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("max_jitter", &self.max_jitter)
            .finish()
    }
}

impl<R> Renderer for RetryRenderer<R>
where
    R: Renderer,
{
    #[instrument(level = "info", skip_all, fields(url = %request.url))]
    async fn render(&self, request: &RenderRequest) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.render(request).await {
                Ok(html) => return Ok(html),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt >= self.attempts {
                        error!(
                            attempt,
                            max = self.attempts,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "render exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.attempts,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "render attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Fails a fixed number of times, then succeeds.
    struct Flaky {
        failures: usize,
        calls: Cell<usize>,
    }

    impl Renderer for Flaky {
        async fn render(&self, request: &RenderRequest) -> Result<String, FetchError> {
            let n = self.calls.get() + 1;
            self.calls.set(n);
            if n <= self.failures {
                Err(FetchError::Status {
                    url: request.url.clone(),
                    status: 502,
                })
            } else {
                Ok(format!("<html>attempt {n}</html>"))
            }
        }
    }

    fn fast(attempts: usize) -> RetrySettings {
        RetrySettings {
            attempts,
            base_delay_ms: 1,
            max_delay_ms: 5,
            max_jitter_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let flaky = Flaky { failures: 2, calls: Cell::new(0) };
        let r = RetryRenderer::new(&flaky, fast(3));
        let html = r.render(&RenderRequest::document("https://example.com")).await.unwrap();
        assert_eq!(html, "<html>attempt 3</html>");
        assert_eq!(flaky.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_last_error_propagates() {
        let flaky = Flaky { failures: 10, calls: Cell::new(0) };
        let r = RetryRenderer::new(&flaky, fast(3));
        let err = r
            .render(&RenderRequest::document("https://example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 502, .. }));
        assert_eq!(flaky.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let flaky = Flaky { failures: 0, calls: Cell::new(0) };
        let r = RetryRenderer::new(&flaky, fast(0));
        assert!(r.render(&RenderRequest::document("https://example.com")).await.is_ok());
        assert_eq!(flaky.calls.get(), 1);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let flaky = Flaky { failures: 0, calls: Cell::new(0) };
        let r = RetryRenderer::new(
            &flaky,
            RetrySettings {
                attempts: 5,
                base_delay_ms: 1_000,
                max_delay_ms: 3_000,
                max_jitter_ms: 0,
            },
        );
        assert_eq!(r.backoff(1), Duration::from_secs(1));
        assert_eq!(r.backoff(2), Duration::from_secs(2));
        assert_eq!(r.backoff(3), Duration::from_secs(3));
    }
}
