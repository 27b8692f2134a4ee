//! Rate limiting implementation
//!
//! Uses the governor crate for token bucket rate limiting. One limiter is
//! shared by every worker of a run; cloning shares the same bucket.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for rate limiting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum number of requests per minute (0 = unlimited)
    pub requests_per_minute: u32,
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
        }
    }

    /// Config with no limit
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Check if this config imposes no limit
    pub fn is_unlimited(&self) -> bool {
        self.requests_per_minute == 0
    }

    /// Minimum spacing between two calls, if limited
    pub fn interval(&self) -> Option<Duration> {
        if self.is_unlimited() {
            None
        } else {
            Some(Duration::from_secs(60) / self.requests_per_minute)
        }
    }
}

/// Token bucket rate limiter
///
/// The bucket holds a single token, so consecutive calls are spaced by
/// at least `60s / requests_per_minute` no matter how many tasks share it.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Option<Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    pub fn new(config: &RateLimiterConfig) -> Self {
        let limiter = NonZeroU32::new(config.requests_per_minute).map(|rpm| {
            let quota = Quota::per_minute(rpm).allow_burst(NonZeroU32::MIN);
            Arc::new(Governor::direct(quota))
        });

        Self { limiter }
    }

    /// Create a limiter that never blocks
    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    /// Wait until the next call slot is available
    pub async fn take(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Try to take a slot, returning immediately
    pub fn try_take(&self) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check().is_ok(),
            None => true,
        }
    }

    /// Check if this limiter lets everything through
    pub fn is_unlimited(&self) -> bool {
        self.limiter.is_none()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("unlimited", &self.is_unlimited())
            .finish()
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_rate_limiter_config() {
        assert!(RateLimiterConfig::default().is_unlimited());
        assert_eq!(RateLimiterConfig::unlimited().interval(), None);

        let config = RateLimiterConfig::per_minute(120);
        assert!(!config.is_unlimited());
        assert_eq!(config.interval(), Some(Duration::from_millis(500)));
    }

    #[tokio::test]
    async fn test_unlimited_never_blocks() {
        let limiter = RateLimiter::new(&RateLimiterConfig::unlimited());
        assert!(limiter.is_unlimited());

        let start = Instant::now();
        for _ in 0..1000 {
            limiter.take().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(limiter.try_take());
    }

    #[tokio::test]
    async fn test_first_take_is_immediate_then_spaced() {
        let limiter = RateLimiter::new(&RateLimiterConfig::per_minute(60));

        assert!(limiter.try_take());
        // Bucket holds one token; the next slot is a second away
        assert!(!limiter.try_take());
    }

    #[tokio::test]
    async fn test_consecutive_takes_are_spaced() {
        // 600/min => 100ms spacing
        let limiter = RateLimiter::new(&RateLimiterConfig::per_minute(600));

        let start = Instant::now();
        for _ in 0..4 {
            limiter.take().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(290));
    }

    #[tokio::test]
    async fn test_spacing_holds_across_concurrent_takers() {
        let limiter = RateLimiter::new(&RateLimiterConfig::per_minute(600));

        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.take().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(390));
    }
}
