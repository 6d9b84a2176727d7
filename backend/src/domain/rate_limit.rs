//! Fixed-window rate limiter keyed by policy and client IP.
//!
//! Each window counts requests under `rl:<policy>:<ip>`. Exceeding the
//! limit sets `rl:block:<policy>:<ip>` for the block duration, and every
//! request is refused while that key exists. Store failures allow the
//! request.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::ports::KeyValueStore;

/// Named limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub name: &'static str,
    pub max_requests: u64,
    pub window: Duration,
    pub block_duration: Duration,
}

impl RateLimitPolicy {
    /// Default API policy: 300 requests per minute, blocked for a minute.
    pub const fn general() -> Self {
        Self {
            name: "general",
            max_requests: 300,
            window: Duration::from_secs(60),
            block_duration: Duration::from_secs(60),
        }
    }

    /// Credential and public share endpoints: 10 per minute, blocked for
    /// five minutes.
    pub const fn strict() -> Self {
        Self {
            name: "strict",
            max_requests: 10,
            window: Duration::from_secs(60),
            block_duration: Duration::from_secs(300),
        }
    }

    fn counter_key(&self, client: &str) -> String {
        format!("rl:{}:{client}", self.name)
    }

    fn block_key(&self, client: &str) -> String {
        format!("rl:block:{}:{client}", self.name)
    }
}

/// Limiter verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u64 },
    Limited { retry_after: Duration },
}

/// Fixed-window limiter keyed by policy and client.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
}

impl RateLimiter {
    /// Limiter storing its counters in `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Count one request from `client` against `policy`.
    pub async fn check(&self, policy: &RateLimitPolicy, client: &str) -> RateLimitDecision {
        let open = RateLimitDecision::Allowed {
            remaining: policy.max_requests,
        };
        let block_key = policy.block_key(client);
        match self.store.ttl(&block_key).await {
            Ok(Some(remaining)) => {
                return RateLimitDecision::Limited {
                    retry_after: remaining.max(Duration::from_secs(1)),
                };
            }
            Ok(None) => {}
            Err(err) => {
                warn!(policy = policy.name, error = %err, "rate limit store unavailable; allowing");
                return open;
            }
        }

        let count = match self
            .store
            .increment(&policy.counter_key(client), policy.window)
            .await
        {
            Ok(count) => count,
            Err(err) => {
                warn!(policy = policy.name, error = %err, "rate limit store unavailable; allowing");
                return open;
            }
        };
        if count <= policy.max_requests {
            return RateLimitDecision::Allowed {
                remaining: policy.max_requests - count,
            };
        }

        if let Err(err) = self.store.set(&block_key, "1", policy.block_duration).await {
            warn!(policy = policy.name, error = %err, "failed to record rate limit block");
        }
        warn!(policy = policy.name, client, count, "rate limit exceeded");
        RateLimitDecision::Limited {
            retry_after: policy.block_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{KeyValueStoreError, MockKeyValueStore};

    fn tiny() -> RateLimitPolicy {
        RateLimitPolicy {
            name: "tiny",
            max_requests: 2,
            window: Duration::from_secs(60),
            block_duration: Duration::from_secs(30),
        }
    }

    #[tokio::test]
    async fn requests_within_the_window_are_counted_down() {
        let mut store = MockKeyValueStore::new();
        store.expect_ttl().returning(|_| Ok(None));
        store
            .expect_increment()
            .withf(|key, window| key == "rl:tiny:1.2.3.4" && *window == Duration::from_secs(60))
            .returning(|_, _| Ok(1));
        let decision = RateLimiter::new(Arc::new(store)).check(&tiny(), "1.2.3.4").await;
        assert_eq!(decision, RateLimitDecision::Allowed { remaining: 1 });
    }

    #[tokio::test]
    async fn exceeding_the_limit_sets_a_block() {
        let mut store = MockKeyValueStore::new();
        store.expect_ttl().returning(|_| Ok(None));
        store.expect_increment().returning(|_, _| Ok(3));
        store
            .expect_set()
            .withf(|key, _, ttl| key == "rl:block:tiny:ip" && *ttl == Duration::from_secs(30))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let decision = RateLimiter::new(Arc::new(store)).check(&tiny(), "ip").await;
        assert_eq!(
            decision,
            RateLimitDecision::Limited {
                retry_after: Duration::from_secs(30)
            }
        );
    }

    #[tokio::test]
    async fn blocked_clients_are_refused_without_counting() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_ttl()
            .returning(|_| Ok(Some(Duration::from_secs(12))));
        store.expect_increment().never();
        let decision = RateLimiter::new(Arc::new(store)).check(&tiny(), "ip").await;
        assert_eq!(
            decision,
            RateLimitDecision::Limited {
                retry_after: Duration::from_secs(12)
            }
        );
    }

    #[tokio::test]
    async fn store_errors_fail_open() {
        let mut store = MockKeyValueStore::new();
        store.expect_ttl().returning(|_| Ok(None));
        store
            .expect_increment()
            .returning(|_, _| Err(KeyValueStoreError::backend("down")));
        let decision = RateLimiter::new(Arc::new(store)).check(&tiny(), "ip").await;
        assert_eq!(decision, RateLimitDecision::Allowed { remaining: 2 });
    }

    #[test]
    fn built_in_policies() {
        assert_eq!(RateLimitPolicy::general().max_requests, 300);
        assert_eq!(RateLimitPolicy::strict().block_duration, Duration::from_secs(300));
    }
}
