//! In-memory rate limiter using governor crate.

use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use keyed::KeyedLimiters;

use atrium_core::ports::{RateLimitError, RateLimitResult, RateLimiter};

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// In-memory rate limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window: Duration::from_secs(60),
        }
    }
}

mod keyed {
    //! Sharded per-key limiter table. Login-attempt limiting keys on
    //! client IP, so the table stays small.

    use super::DirectRateLimiter;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    pub struct KeyedLimiters {
        shards: Vec<Mutex<HashMap<String, Arc<DirectRateLimiter>>>>,
    }

    impl KeyedLimiters {
        pub fn new(shards: usize) -> Self {
            Self {
                shards: (0..shards.max(1)).map(|_| Mutex::new(HashMap::new())).collect(),
            }
        }

        pub fn get_or_insert(
            &self,
            key: &str,
            make: impl FnOnce() -> DirectRateLimiter,
        ) -> Arc<DirectRateLimiter> {
            let mut hash = 0usize;
            for b in key.bytes() {
                hash = hash.wrapping_mul(31).wrapping_add(b as usize);
            }
            let shard = &self.shards[hash % self.shards.len()];
            let mut map = shard.lock().expect("limiter shard poisoned");
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(make()))
                .clone()
        }
    }
}

/// In-memory, per-key rate limiter using the GCRA algorithm.
///
/// Limits are per-process, not distributed across instances.
pub struct InMemoryRateLimiter {
    limiters: KeyedLimiters,
    config: RateLimitConfig,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiters: KeyedLimiters::new(16),
            config,
        }
    }

    pub fn from_env() -> Self {
        let config = RateLimitConfig {
            max_requests: std::env::var("RATE_LIMIT_MAX_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            window: Duration::from_secs(
                std::env::var("RATE_LIMIT_WINDOW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
        };
        Self::new(config)
    }

    fn quota(&self) -> Quota {
        Quota::with_period(self.config.window / self.config.max_requests)
            .expect("Valid quota")
            .allow_burst(NonZeroU32::new(self.config.max_requests).expect("Non-zero"))
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
        let quota = self.quota();
        let limiter = self
            .limiters
            .get_or_insert(key, || GovernorRateLimiter::direct(quota));

        match limiter.check() {
            Ok(_) => Ok(RateLimitResult {
                allowed: true,
                remaining: self.config.max_requests, // Approximate
                reset_after: self.config.window,
            }),
            Err(not_until) => Ok(RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_after: not_until.wait_time_from(DefaultClock::default().now()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_within_quota_then_blocks() {
        let limiter = InMemoryRateLimiter::new(RateLimitConfig {
            max_requests: 2,
            window: Duration::from_secs(60),
        });

        assert!(limiter.check("1.2.3.4").await.unwrap().allowed);
        assert!(limiter.check("1.2.3.4").await.unwrap().allowed);
        let third = limiter.check("1.2.3.4").await.unwrap();
        assert!(!third.allowed);
        assert!(third.retry_after_secs() >= 1);
    }

    #[tokio::test]
    async fn keys_are_limited_independently() {
        let limiter = InMemoryRateLimiter::new(RateLimitConfig {
            max_requests: 1,
            window: Duration::from_secs(60),
        });

        assert!(limiter.check("a").await.unwrap().allowed);
        assert!(!limiter.check("a").await.unwrap().allowed);
        assert!(limiter.check("b").await.unwrap().allowed);
    }
}
