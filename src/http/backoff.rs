//! Exponential backoff with jitter
//!
//! A [`BackoffPolicy`] is immutable and shared by every worker. Each
//! request sequence calls [`BackoffPolicy::start`] to get its own
//! [`BackoffController`], which carries the attempt counter and is
//! dropped once the sequence resolves.

use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Retry wait schedule
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub initial_interval: Duration,
    /// Ceiling for the doubled delay
    pub max_interval: Duration,
    /// Multiplicative jitter, `0.1` means +/-10%
    pub jitter_factor: f64,
    /// Total attempts allowed per sequence (None = unlimited)
    pub max_attempts: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(60),
            jitter_factor: 0.1,
            max_attempts: None,
        }
    }
}

impl BackoffPolicy {
    /// Create a policy with the given bounds and jitter
    pub fn exponential(initial: Duration, max: Duration, jitter_factor: f64) -> Self {
        Self {
            initial_interval: initial,
            max_interval: max,
            jitter_factor,
            max_attempts: None,
        }
    }

    /// Cap the number of retries (0 = unlimited)
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_attempts = if retries == 0 {
            None
        } else {
            Some(retries.saturating_add(1))
        };
        self
    }

    /// Un-jittered delay before retry number `retry` (0-based)
    pub fn interval(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        std::cmp::min(
            self.initial_interval.saturating_mul(factor),
            self.max_interval,
        )
    }

    /// Apply uniform multiplicative jitter to a delay
    pub fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter_factor <= 0.0 || delay.is_zero() {
            return delay;
        }
        let j = self.jitter_factor;
        let factor = rand::thread_rng().gen_range((1.0 - j)..=(1.0 + j));
        delay.mul_f64(factor)
    }

    /// Begin a new request sequence
    pub fn start(&self, token: &CancellationToken) -> BackoffController {
        BackoffController {
            policy: self.clone(),
            token: token.clone(),
            attempts: 0,
        }
    }
}

/// Per-sequence retry state
#[derive(Debug)]
pub struct BackoffController {
    policy: BackoffPolicy,
    token: CancellationToken,
    attempts: u32,
}

impl BackoffController {
    /// Decide whether another attempt may run, waiting out the delay first
    ///
    /// The first call returns immediately. Returns false when the attempt
    /// cap is reached or the shared token is cancelled (including while
    /// waiting).
    pub async fn should_continue(&mut self) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        if let Some(max) = self.policy.max_attempts {
            if self.attempts >= max {
                return false;
            }
        }

        if self.attempts > 0 {
            let delay = self
                .policy
                .jittered(self.policy.interval(self.attempts - 1));
            trace!(attempt = self.attempts + 1, ?delay, "backing off");

            tokio::select! {
                biased;
                () = self.token.cancelled() => return false,
                () = tokio::time::sleep(delay) => {}
            }
        }

        self.attempts += 1;
        true
    }

    /// Number of attempts started so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
