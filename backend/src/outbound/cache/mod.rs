//! Redis adapter for the [`KeyValueStore`] port.
//!
//! Backs the cache-aside helper, the rate limiter, and the circuit breaker.
//! Every call checks a connection out of [`RedisPool`]; failures surface as
//! [`KeyValueStoreError::Backend`] and callers decide whether to fail open.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis::{self, FromRedisValue, ToRedisArgs};

use crate::domain::ports::{KeyValueStore, KeyValueStoreError};

mod pool;

pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError};

/// [`KeyValueStore`] over a Redis connection pool.
#[derive(Clone)]
pub struct RedisKeyValueStore {
    pool: RedisPool,
}

impl RedisKeyValueStore {
    /// Store backed by `pool`.
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T, KeyValueStoreError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| KeyValueStoreError::backend(err.to_string()))?;
        cmd.query_async(&mut *conn)
            .await
            .map_err(|err| KeyValueStoreError::backend(err.to_string()))
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn command(name: &str, args: impl ToRedisArgs) -> redis::Cmd {
    let mut cmd = redis::cmd(name);
    cmd.arg(args);
    cmd
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KeyValueStoreError> {
        self.query(&command("GET", key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KeyValueStoreError> {
        let mut cmd = command("SET", key);
        cmd.arg(value).arg("PX").arg(millis(ttl));
        self.query(&cmd).await
    }

    async fn delete(&self, keys: &[String]) -> Result<(), KeyValueStoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let _: u64 = self.query(&command("DEL", keys)).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, KeyValueStoreError> {
        let found: u64 = self.query(&command("EXISTS", key)).await?;
        Ok(found > 0)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, KeyValueStoreError> {
        // PTTL answers -2 for a missing key and -1 for a key without expiry.
        let remaining: i64 = self.query(&command("PTTL", key)).await?;
        Ok(u64::try_from(remaining).ok().map(Duration::from_millis))
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<u64, KeyValueStoreError> {
        let count: u64 = self.query(&command("INCR", key)).await?;
        if count == 1 {
            let mut expire = command("PEXPIRE", key);
            expire.arg(millis(window));
            let _: u64 = self.query(&expire).await?;
        }
        Ok(count)
    }

    async fn add_to_set(&self, set: &str, member: &str) -> Result<(), KeyValueStoreError> {
        let mut cmd = command("SADD", set);
        cmd.arg(member);
        let _: u64 = self.query(&cmd).await?;
        Ok(())
    }

    async fn set_members(&self, set: &str) -> Result<Vec<String>, KeyValueStoreError> {
        self.query(&command("SMEMBERS", set)).await
    }
}
