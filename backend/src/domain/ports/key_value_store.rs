//! Port over the shared key-value store backing the cache, rate limiter,
//! and circuit breaker.
use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by key-value store adapters.
    pub enum KeyValueStoreError {
        /// Store is unreachable or timing out.
        Backend { message: String } => "key-value store failure: {message}",
    }
}

/// Redis-shaped key-value operations used by the cache, rate limiter,
/// circuit breaker and job status store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KeyValueStoreError>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KeyValueStoreError>;

    async fn delete(&self, keys: &[String]) -> Result<(), KeyValueStoreError>;

    async fn exists(&self, key: &str) -> Result<bool, KeyValueStoreError>;

    /// Remaining time to live, `None` when the key is missing or persistent.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, KeyValueStoreError>;

    /// Increment a counter, applying `window` as expiry on the first
    /// increment. Returns the new count.
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, KeyValueStoreError>;

    async fn add_to_set(&self, set: &str, member: &str) -> Result<(), KeyValueStoreError>;

    async fn set_members(&self, set: &str) -> Result<Vec<String>, KeyValueStoreError>;
}
