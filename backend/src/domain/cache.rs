//! Cache-aside helper over the key-value store.
//!
//! Reads fall through to the fetcher on any store error or undecodable
//! payload; writes are best effort. Keys are grouped under tag sets
//! (`cache:tag:<tag>`) so writers can invalidate every dependent entry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::Error;
use super::ports::KeyValueStore;

/// Namespace prepended to every key.
pub const CACHE_PREFIX: &str = "portal:v1:";

/// Validated cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

/// Reasons a cache key is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheKeyError {
    #[error("cache key must not be empty")]
    Empty,
    #[error("cache key must not contain surrounding whitespace")]
    ContainsWhitespace,
}

impl CacheKey {
    /// Validate a key: non-empty and without surrounding whitespace.
    ///
    /// # Errors
    /// Returns [`CacheKeyError`] for blank or padded keys.
    pub fn new(value: impl Into<String>) -> Result<Self, CacheKeyError> {
        let raw = value.into();
        if raw.trim().is_empty() {
            return Err(CacheKeyError::Empty);
        }
        if raw.trim() != raw {
            return Err(CacheKeyError::ContainsWhitespace);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tag for entries derived from one user's data.
pub fn user_tag(user_id: uuid::Uuid) -> String {
    format!("user:{user_id}")
}

/// Tag for admin statistics.
pub const STATS_TAG: &str = "stats";

/// Cache-aside front end.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn KeyValueStore>,
    jitter: bool,
}

impl CacheAside {
    /// Cache-aside helper over `store` with TTL jitter enabled.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            jitter: true,
        }
    }

    /// Disable TTL jitter; used where exact expiry matters in tests.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    fn namespaced(key: &str) -> String {
        format!("{CACHE_PREFIX}{key}")
    }

    fn tag_set(tag: &str) -> String {
        format!("{CACHE_PREFIX}cache:tag:{tag}")
    }

    fn jittered(&self, ttl: Duration) -> Duration {
        let spread = ttl.as_millis() / 10;
        if !self.jitter || spread == 0 {
            return ttl;
        }
        let spread = u64::try_from(spread).unwrap_or(u64::MAX);
        ttl + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }

    /// Return the cached value for `key`, or compute it with `fetch` and
    /// store it for `ttl` under every tag in `tags`.
    pub async fn get_or_set<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        tags: &[String],
        fetch: F,
    ) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, Error>> + Send,
    {
        let full_key = Self::namespaced(key.as_str());
        match self.store.get(&full_key).await {
            Ok(Some(payload)) => match serde_json::from_str(&payload) {
                Ok(value) => {
                    debug!(key = %key, "cache hit");
                    return Ok(value);
                }
                Err(err) => warn!(key = %key, error = %err, "discarding undecodable cache entry"),
            },
            Ok(None) => debug!(key = %key, "cache miss"),
            Err(err) => warn!(key = %key, error = %err, "cache read failed; fetching directly"),
        }

        let value = fetch().await?;
        self.store_value(&full_key, &value, ttl, tags).await;
        Ok(value)
    }

    async fn store_value<T: Serialize + Sync>(
        &self,
        full_key: &str,
        value: &T,
        ttl: Duration,
        tags: &[String],
    ) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key = full_key, error = %err, "cache value not serialisable");
                return;
            }
        };
        if let Err(err) = self.store.set(full_key, &payload, self.jittered(ttl)).await {
            warn!(key = full_key, error = %err, "cache write failed");
            return;
        }
        for tag in tags {
            if let Err(err) = self.store.add_to_set(&Self::tag_set(tag), full_key).await {
                warn!(key = full_key, tag = %tag, error = %err, "cache tag registration failed");
            }
        }
    }

    /// Delete every entry registered under `tag`, then the tag set itself.
    pub async fn invalidate_tag(&self, tag: &str) {
        let set = Self::tag_set(tag);
        let members = match self.store.set_members(&set).await {
            Ok(members) => members,
            Err(err) => {
                warn!(tag, error = %err, "cache tag lookup failed");
                return;
            }
        };
        let mut keys = members;
        keys.push(set);
        if let Err(err) = self.store.delete(&keys).await {
            warn!(tag, error = %err, "cache invalidation failed");
        }
    }
}
