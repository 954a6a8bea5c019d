//! Retry utilities for resilient operations
//!
//! Two shapes of backoff live here:
//! - [`with_retry`] retries a single upstream call a bounded number of times,
//!   each attempt under its own timeout, sleeping `base * 2^i + jitter`
//!   between attempts.
//! - [`LoopBackoff`] is the delay counter owned by a long-running loop: it
//!   doubles on every failure up to a cap and resets after a success.

use anyhow::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ContentConfig;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, first try included
    pub max_attempts: u32,

    /// Base delay for exponential backoff
    pub base_delay: Duration,

    /// Upper bound of the uniform random jitter added to each delay
    pub max_jitter: Duration,

    /// Timeout applied to each attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_jitter: Duration::from_millis(200),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&ContentConfig> for RetryPolicy {
    fn from(config: &ContentConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_jitter: Duration::from_millis(config.jitter_ms),
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
        }
    }
}

impl RetryPolicy {
    /// Same policy with a different attempt budget
    #[must_use]
    pub fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Deterministic part of the delay after failed attempt `attempt` (0-based)
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor)
    }

    fn delay_with_jitter(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        self.base_backoff(attempt) + jitter
    }
}

/// Execute an operation with per-attempt timeouts and exponential backoff
///
/// Returns the first success, or the last error once `max_attempts` attempts
/// have failed or timed out.
///
/// # Example
///
/// ```no_run
/// use growthloop::utils::retry::{with_retry, RetryPolicy};
///
/// # async fn example() -> anyhow::Result<()> {
/// let policy = RetryPolicy::default();
/// let text = with_retry(&policy, || async { Ok::<_, anyhow::Error>("draft".to_string()) }).await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 0..attempts {
        let outcome = match tokio::time::timeout(policy.attempt_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(anyhow::anyhow!(
                "attempt timed out after {}ms",
                policy.attempt_timeout.as_millis()
            )),
        };

        match outcome {
            Ok(result) => {
                if attempt > 0 {
                    debug!(attempt = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                warn!(
                    attempt = attempt,
                    max_attempts = attempts,
                    error = %e,
                    "Operation failed"
                );
                last_error = Some(e);
            }
        }

        if attempt + 1 < attempts {
            let delay = policy.delay_with_jitter(attempt);
            debug!(
                attempt = attempt,
                delay_ms = delay.as_millis(),
                "Retrying operation after delay"
            );
            tokio::time::sleep(delay).await;
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Operation failed with no error details")))
}

/// Exponential delay counter for a long-running loop
#[derive(Debug, Clone)]
pub struct LoopBackoff {
    floor: Duration,
    cap: Duration,
    current: Duration,
}

impl LoopBackoff {
    pub fn new(floor: Duration, cap: Duration) -> Self {
        let cap = cap.max(floor);
        Self {
            floor,
            cap,
            current: floor,
        }
    }

    /// Delay to sleep after a failure; doubles the next one up to the cap
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.cap);
        delay
    }

    /// Return to the floor after a successful cycle
    pub fn reset(&mut self) {
        self.current = self.floor;
    }
}
