//! Job queue and job-status adapters.
//!
//! [`RedisJobQueue`] keeps pending jobs as JSON in a Redis list (`LPUSH` to
//! enqueue, `RPOP` to dequeue, so the oldest job leaves first).
//! [`KeyValueJobStatusStore`] stores progress records under
//! `portal:v1:job:<id>` for 24 hours on any [`KeyValueStore`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{JobQueue, JobQueueError, JobStatusStore, KeyValueStore};
use crate::domain::{Job, JobStatus};
use crate::outbound::cache::RedisPool;

const QUEUE_KEY: &str = "portal:v1:jobs:pending";
const STATUS_TTL: Duration = Duration::from_secs(24 * 60 * 60);

fn status_key(id: Uuid) -> String {
    format!("portal:v1:job:{id}")
}

/// Redis list backed queue.
#[derive(Clone)]
pub struct RedisJobQueue {
    pool: RedisPool,
    key: String,
}

impl RedisJobQueue {
    /// Queue on the `portal:v1:jobs` list.
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            key: QUEUE_KEY.to_owned(),
        }
    }

    async fn run<T: redis::FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T, JobQueueError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| JobQueueError::unavailable(err.to_string()))?;
        cmd.query_async(&mut *conn)
            .await
            .map_err(|err| JobQueueError::unavailable(err.to_string()))
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: &Job) -> Result<(), JobQueueError> {
        let payload = serde_json::to_string(job)
            .map_err(|err| JobQueueError::serialization(err.to_string()))?;
        let mut cmd = redis::cmd("LPUSH");
        cmd.arg(&self.key).arg(payload);
        let depth: u64 = self.run(&cmd).await?;
        debug!(job_id = %job.id, depth, "job enqueued");
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<Job>, JobQueueError> {
        let mut cmd = redis::cmd("RPOP");
        cmd.arg(&self.key);
        let payload: Option<String> = self.run(&cmd).await?;
        payload
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|err| JobQueueError::serialization(err.to_string()))
            })
            .transpose()
    }
}

/// Status records as JSON strings in the shared key-value store.
#[derive(Clone)]
pub struct KeyValueJobStatusStore {
    store: Arc<dyn KeyValueStore>,
}

impl KeyValueJobStatusStore {
    /// Status store over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobStatusStore for KeyValueJobStatusStore {
    async fn put(&self, status: &JobStatus) -> Result<(), JobQueueError> {
        let payload = serde_json::to_string(status)
            .map_err(|err| JobQueueError::serialization(err.to_string()))?;
        self.store
            .set(&status_key(status.id), &payload, STATUS_TTL)
            .await
            .map_err(|err| JobQueueError::unavailable(err.to_string()))
    }

    async fn get(&self, id: Uuid) -> Result<Option<JobStatus>, JobQueueError> {
        let raw = self
            .store
            .get(&status_key(id))
            .await
            .map_err(|err| JobQueueError::unavailable(err.to_string()))?;
        raw.map(|raw| {
            serde_json::from_str(&raw).map_err(|err| JobQueueError::serialization(err.to_string()))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JobPayload;
    use crate::outbound::memory::MemoryKeyValueStore;
    use chrono::Utc;
    use rstest::rstest;

    fn status() -> JobStatus {
        JobStatus::queued(&Job {
            id: Uuid::new_v4(),
            owner_id: Some(Uuid::new_v4()),
            payload: JobPayload::ExpireShareLinks,
            enqueued_at: Utc::now(),
        })
    }

    #[rstest]
    #[tokio::test]
    async fn statuses_round_trip_through_the_store() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = KeyValueJobStatusStore::new(kv.clone());
        let status = status();
        store.put(&status).await.expect("put");

        assert_eq!(store.get(status.id).await.expect("get"), Some(status.clone()));
        let ttl = kv
            .ttl(&status_key(status.id))
            .await
            .expect("ttl")
            .expect("expiring");
        assert!(ttl > Duration::from_secs(23 * 60 * 60));
    }

    #[rstest]
    #[tokio::test]
    async fn corrupt_records_are_serialisation_errors() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let id = Uuid::new_v4();
        kv.set(&status_key(id), "{", STATUS_TTL).await.expect("set");
        let err = KeyValueJobStatusStore::new(kv)
            .get(id)
            .await
            .expect_err("corrupt");
        assert!(matches!(err, JobQueueError::Serialization { .. }));
    }
}
