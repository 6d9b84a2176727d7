//! Process-local FIFO [`JobQueue`].

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::Job;
use crate::domain::ports::{JobQueue, JobQueueError};

/// In-process FIFO job queue.
#[derive(Clone, Default)]
pub struct MemoryJobQueue {
    jobs: Arc<Mutex<VecDeque<Job>>>,
}

impl MemoryJobQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, VecDeque<Job>> {
        match self.jobs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: &Job) -> Result<(), JobQueueError> {
        self.jobs().push_back(job.clone());
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<Job>, JobQueueError> {
        Ok(self.jobs().pop_front())
    }
}
