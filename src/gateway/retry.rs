//! Retry schedule for generation calls
//!
//! Attempts are bounded (three by default). Between attempts the caller sleeps
//! `base + U[0,1) * (jitter + attempt * growth)`, which with the defaults is
//! 1.25s plus up to 1.25s, 2.25s, ... of random spread.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::GenerationResult;

/// Retry settings shared by all remote gateways
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Fixed part of every delay (ms)
    pub base_delay_ms: u64,

    /// Random spread added on the first retry (ms)
    pub jitter_ms: u64,

    /// Extra random spread added per further retry (ms)
    pub jitter_growth_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1250,
            jitter_ms: 1250,
            jitter_growth_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Policy with no waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            jitter_ms: 0,
            jitter_growth_ms: 0,
        }
    }

    /// Delay after failed attempt `attempt` (0-based) for a sample `unit` in [0, 1)
    pub fn delay_for(&self, attempt: u32, unit: f64) -> Duration {
        let spread = self.jitter_ms + self.jitter_growth_ms * attempt as u64;
        let millis = self.base_delay_ms as f64 + unit.clamp(0.0, 1.0) * spread as f64;
        Duration::from_millis(millis.round() as u64)
    }
}

/// [`Backoff`] implementation yielding one delay per remaining attempt
#[derive(Debug, Clone)]
pub struct JitterBackoff {
    policy: RetryPolicy,
    failed_attempts: u32,
}

impl JitterBackoff {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failed_attempts: 0,
        }
    }
}

impl Backoff for JitterBackoff {
    fn reset(&mut self) {
        self.failed_attempts = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        let attempt = self.failed_attempts;
        self.failed_attempts += 1;
        if self.failed_attempts >= self.policy.max_attempts {
            return None;
        }
        let unit: f64 = rand::thread_rng().gen();
        Some(self.policy.delay_for(attempt, unit))
    }
}

/// Run `op` until it succeeds, fails permanently, or the schedule runs out.
///
/// `op` receives the 0-based attempt index.
pub async fn retry_generation<B, F, Fut>(mut schedule: B, mut op: F) -> GenerationResult
where
    B: Backoff,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = GenerationResult>,
{
    let mut attempt = 0u32;
    loop {
        match op(attempt).await {
            Ok(text) => return Ok(text),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => match schedule.next_backoff() {
                Some(delay) => {
                    warn!(attempt, ?delay, error = %err, "Generation failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => return Err(err),
            },
        }
    }
}
