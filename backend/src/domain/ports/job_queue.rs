//! Ports for the background job queue and the job progress store.
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Error, Job, JobStatus};

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by queue and status adapters.
    pub enum JobQueueError {
        /// Queue backend is unavailable.
        Unavailable { message: String } => "job queue unavailable: {message}",
        /// Payload could not be encoded or decoded.
        Serialization { message: String } => "job serialisation failed: {message}",
    }
}

impl From<JobQueueError> for Error {
    fn from(value: JobQueueError) -> Self {
        match value {
            JobQueueError::Unavailable { message } => {
                Error::service_unavailable(format!("job queue unavailable: {message}"))
            }
            JobQueueError::Serialization { message } => {
                Error::internal(format!("job serialisation failed: {message}"))
            }
        }
    }
}

/// FIFO queue of pending jobs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: &Job) -> Result<(), JobQueueError>;

    /// Oldest pending job, if any. Never blocks.
    async fn dequeue(&self) -> Result<Option<Job>, JobQueueError>;
}

/// Latest status per job, kept for a day.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobStatusStore: Send + Sync {
    /// Store the latest progress, refreshing the retention period.
    async fn put(&self, status: &JobStatus) -> Result<(), JobQueueError>;

    async fn get(&self, id: Uuid) -> Result<Option<JobStatus>, JobQueueError>;
}
