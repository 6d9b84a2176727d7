//! Background worker draining the job queue.
//!
//! One worker task polls [`JobQueue`], runs each job inside its own
//! [`TraceId`] scope and records progress in the [`JobStatusStore`]. Status
//! writes are best effort; a job whose status cannot be stored still runs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use tokio::sync::watch;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::domain::ports::{JobQueue, JobStatusStore, Reports, ShareLinkRepository};
use crate::domain::{
    AccessContext, Caller, Error, Job, JobPayload, JobState, JobStatus, ReportDraft, Role,
    TraceId,
};

/// Worker timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobWorkerConfig {
    /// Idle delay after an empty poll.
    pub poll_interval: Duration,
    /// How often an `expire_share_links` job is scheduled.
    pub sweep_interval: Duration,
}

impl Default for JobWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            sweep_interval: Duration::from_secs(15 * 60),
        }
    }
}

/// Ports the worker drives.
#[derive(Clone)]
pub struct JobWorkerPorts {
    pub queue: Arc<dyn JobQueue>,
    pub statuses: Arc<dyn JobStatusStore>,
    pub reports: Arc<dyn Reports>,
    pub links: Arc<dyn ShareLinkRepository>,
}

/// Background worker draining the job queue.
pub struct JobWorker {
    ports: JobWorkerPorts,
    clock: Arc<dyn Clock>,
    config: JobWorkerConfig,
}

impl JobWorker {
    /// Worker over `ports`, polling as configured.
    pub fn new(ports: JobWorkerPorts, clock: Arc<dyn Clock>, config: JobWorkerConfig) -> Self {
        Self {
            ports,
            clock,
            config,
        }
    }

    /// Poll until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// A job already in progress always finishes before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(poll_ms = self.config.poll_interval.as_millis(), "job worker started");
        let mut next_sweep = self.clock.utc();
        loop {
            if *shutdown.borrow() {
                break;
            }
            let now = self.clock.utc();
            if now >= next_sweep {
                self.schedule_sweep(now).await;
                next_sweep = now + to_delta(self.config.sweep_interval);
            }
            match self.run_once().await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(err) => warn!(error = %err, "job queue poll failed"),
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                () = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
        info!("job worker stopped");
    }

    /// Process at most one job. Returns whether a job was taken.
    pub async fn run_once(&self) -> Result<bool, Error> {
        let Some(job) = self.ports.queue.dequeue().await? else {
            return Ok(false);
        };
        let span = info_span!("job", job_id = %job.id, kind = job.payload.kind());
        TraceId::scope(TraceId::generate(), self.process(job).instrument(span)).await;
        Ok(true)
    }

    async fn schedule_sweep(&self, now: DateTime<Utc>) {
        let job = Job {
            id: Uuid::new_v4(),
            owner_id: None,
            payload: JobPayload::ExpireShareLinks,
            enqueued_at: now,
        };
        self.save(&JobStatus::queued(&job)).await;
        if let Err(err) = self.ports.queue.enqueue(&job).await {
            warn!(error = %err, "failed to schedule share link expiry");
        }
    }

    async fn process(&self, job: Job) {
        let queued = match self.ports.statuses.get(job.id).await {
            Ok(Some(status)) => status,
            Ok(None) => JobStatus::queued(&job),
            Err(err) => {
                warn!(error = %err, "job status unavailable");
                JobStatus::queued(&job)
            }
        };
        let running = queued.transition(JobState::Running, self.clock.utc());
        self.save(&running).await;

        let finished = match &job.payload {
            JobPayload::DispatchReportBatch { items } => {
                self.dispatch_batch(job.owner_id, items, running).await
            }
            JobPayload::ExpireShareLinks => self.expire_links(running).await,
        };
        info!(
            state = ?finished.state,
            processed = finished.processed,
            total = finished.total,
            "job finished"
        );
        self.save(&finished).await;
    }

    async fn dispatch_batch(
        &self,
        owner_id: Option<Uuid>,
        items: &[ReportDraft],
        mut status: JobStatus,
    ) -> JobStatus {
        let Some(owner_id) = owner_id else {
            return self.finish(status, JobState::Failed, "batch has no owner".to_owned());
        };
        let caller = Caller::new(AccessContext::user(owner_id, Role::Emissor), None);
        let mut failed = 0_u32;
        for item in items {
            if let Err(err) = self.ports.reports.send(&caller, item.clone()).await {
                warn!(error = %err, receptor = %item.receptor_email, "batch item failed");
                failed += 1;
            }
            status.processed += 1;
            status.updated_at = self.clock.utc();
            self.save(&status).await;
        }
        let sent = status.processed - failed;
        let message = format!("sent {sent} of {} reports; {failed} failed", status.total);
        let state = if sent == 0 && failed > 0 {
            JobState::Failed
        } else {
            JobState::Completed
        };
        self.finish(status, state, message)
    }

    async fn expire_links(&self, mut status: JobStatus) -> JobStatus {
        match self
            .ports
            .links
            .revoke_expired(&AccessContext::system(), self.clock.utc())
            .await
        {
            Ok(count) => {
                status.processed = status.total;
                self.finish(status, JobState::Completed, format!("revoked {count} links"))
            }
            Err(err) => self.finish(status, JobState::Failed, err.to_string()),
        }
    }

    fn finish(&self, status: JobStatus, state: JobState, message: String) -> JobStatus {
        JobStatus {
            message: Some(message),
            ..status.transition(state, self.clock.utc())
        }
    }

    async fn save(&self, status: &JobStatus) {
        if let Err(err) = self.ports.statuses.put(status).await {
            warn!(error = %err, job_id = %status.id, "failed to store job status");
        }
    }
}

fn to_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}
