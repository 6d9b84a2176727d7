//! Sending, listing and viewing reports, plus batch job submission.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use pagination::Paginated;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::cache::{CacheAside, CacheKey, STATS_TAG, user_tag};
use crate::domain::ports::{
    FileRepository, JobQueue, JobStatusStore, ReportRepository, Reports, UserRepository,
};
use crate::domain::{
    AccessContext, AuditAction, AuditEntry, AuditLogger, BATCH_MAX, Caller, Email, Error, Job,
    JobPayload, JobStatus, Notification, NotificationStatus, PageKey, PageQuery, Report,
    ReportDraft, ReportStatus, ReportValidationError, Role, paginate,
};

const RECEIVED_TTL: Duration = Duration::from_secs(120);

/// Driven ports used by [`ReportsService`].
#[derive(Clone)]
pub struct ReportsPorts {
    pub users: Arc<dyn UserRepository>,
    pub files: Arc<dyn FileRepository>,
    pub reports: Arc<dyn ReportRepository>,
    pub queue: Arc<dyn JobQueue>,
    pub statuses: Arc<dyn JobStatusStore>,
}

/// Report service implementing [`Reports`].
#[derive(Clone)]
pub struct ReportsService {
    ports: ReportsPorts,
    audit: AuditLogger,
    cache: CacheAside,
    clock: Arc<dyn Clock>,
}

impl ReportsService {
    /// Build the service over its repositories and the job queue.
    pub fn new(
        ports: ReportsPorts,
        audit: AuditLogger,
        cache: CacheAside,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ports,
            audit,
            cache,
            clock,
        }
    }

    async fn receptor_for(&self, raw_email: &str, emissor_id: Uuid) -> Result<Uuid, Error> {
        let email = Email::parse(raw_email).map_err(|err| {
            Error::invalid_request(err.to_string()).with_details(json!({
                "field": "receptorEmail",
                "code": "invalid_email",
            }))
        })?;
        // Other accounts are invisible to an emissor's own context.
        let receptor = self
            .ports
            .users
            .find_by_email(&AccessContext::system(), &email)
            .await?
            .filter(|user| user.active && user.role == Role::Receptor)
            .ok_or_else(|| Error::not_found("receptor not found"))?;
        if receptor.id == emissor_id {
            return Err(Error::invalid_request("cannot send a report to yourself"));
        }
        Ok(receptor.id)
    }

    async fn invalidate_for(&self, receptor_id: Uuid) {
        self.cache.invalidate_tag(&user_tag(receptor_id)).await;
        self.cache.invalidate_tag(STATS_TAG).await;
    }
}

#[async_trait]
impl Reports for ReportsService {
    async fn send(&self, caller: &Caller, draft: ReportDraft) -> Result<Report, Error> {
        let emissor_id = caller.access.require_role(Role::Emissor)?;
        let receptor_id = self.receptor_for(&draft.receptor_email, emissor_id).await?;
        self.ports
            .files
            .find(&caller.access, draft.file_id)
            .await?
            .filter(|file| file.owner_id == emissor_id)
            .ok_or_else(|| Error::not_found("file not found"))?;

        let now = self.clock.utc();
        let report = Report {
            id: Uuid::new_v4(),
            emissor_id,
            receptor_id,
            file_id: draft.file_id,
            title: draft.title,
            protocol: draft.protocol,
            status: ReportStatus::Sent,
            sent_at: now,
            viewed_at: None,
        };
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: receptor_id,
            report_id: report.id,
            status: NotificationStatus::Unread,
            created_at: now,
            archived_at: None,
        };
        self.ports
            .reports
            .create_with_notification(&caller.access, &report, &notification)
            .await?;
        self.invalidate_for(receptor_id).await;
        info!(report_id = %report.id, emissor_id = %emissor_id, receptor_id = %receptor_id, "report sent");
        self.audit
            .record(
                AuditEntry::new(AuditAction::ReportSent, "report")
                    .actor(Some(emissor_id))
                    .resource(report.id)
                    .ip(caller.ip())
                    .metadata(json!({ "receptorId": receptor_id, "fileId": report.file_id })),
            )
            .await;
        Ok(report)
    }

    async fn list_sent(&self, caller: &Caller, page: PageQuery) -> Result<Paginated<Report>, Error> {
        let emissor_id = caller.access.require_role(Role::Emissor)?;
        let rows = self
            .ports
            .reports
            .list_sent(&caller.access, emissor_id, &page)
            .await?;
        Ok(paginate(rows, &page, |r| PageKey::new(r.sent_at, r.id)))
    }

    async fn list_received(
        &self,
        caller: &Caller,
        page: PageQuery,
    ) -> Result<Paginated<Report>, Error> {
        let receptor_id = caller.access.require_role(Role::Receptor)?;
        let page = &page;
        let fetch = move || async move {
            let rows = self
                .ports
                .reports
                .list_received(&caller.access, receptor_id, page)
                .await?;
            Ok(paginate(rows, page, |r| PageKey::new(r.sent_at, r.id)))
        };
        if page.cursor().is_some() {
            return fetch().await;
        }
        let key = CacheKey::new(format!("reports:received:{receptor_id}:{}", page.limit()))
            .map_err(|err| Error::internal(err.to_string()))?;
        self.cache
            .get_or_set(&key, RECEIVED_TTL, &[user_tag(receptor_id)], fetch)
            .await
    }

    async fn get(&self, caller: &Caller, id: Uuid) -> Result<Report, Error> {
        let user_id = caller.access.require_user()?;
        let report = self
            .ports
            .reports
            .find(&caller.access, id)
            .await?
            .filter(|report| report.involves(user_id) || caller.access.is_admin())
            .ok_or_else(|| Error::not_found("report not found"))?;
        if report.receptor_id != user_id || report.status != ReportStatus::Sent {
            return Ok(report);
        }

        let Some(viewed) = self
            .ports
            .reports
            .mark_viewed(&caller.access, id, self.clock.utc())
            .await?
        else {
            // A concurrent request won the transition.
            return Ok(self
                .ports
                .reports
                .find(&caller.access, id)
                .await?
                .unwrap_or(report));
        };
        self.invalidate_for(user_id).await;
        self.audit
            .record(
                AuditEntry::new(AuditAction::ReportViewed, "report")
                    .actor(Some(user_id))
                    .resource(id)
                    .ip(caller.ip()),
            )
            .await;
        Ok(viewed)
    }

    async fn enqueue_batch(
        &self,
        caller: &Caller,
        items: Vec<ReportDraft>,
    ) -> Result<JobStatus, Error> {
        let emissor_id = caller.access.require_role(Role::Emissor)?;
        if items.is_empty() || items.len() > BATCH_MAX {
            let err = ReportValidationError::BatchSize { max: BATCH_MAX };
            return Err(Error::invalid_request(err.to_string()).with_details(json!({
                "field": "items",
                "code": "invalid_batch_size",
            })));
        }
        let job = Job {
            id: Uuid::new_v4(),
            owner_id: Some(emissor_id),
            payload: JobPayload::DispatchReportBatch { items },
            enqueued_at: self.clock.utc(),
        };
        let status = JobStatus::queued(&job);
        self.ports.statuses.put(&status).await?;
        self.ports.queue.enqueue(&job).await?;
        info!(job_id = %job.id, total = status.total, "report batch queued");
        self.audit
            .record(
                AuditEntry::new(AuditAction::ReportBatchQueued, "job")
                    .actor(Some(emissor_id))
                    .resource(job.id)
                    .ip(caller.ip())
                    .metadata(json!({ "items": status.total })),
            )
            .await;
        Ok(status)
    }

    async fn job_status(&self, caller: &Caller, job_id: Uuid) -> Result<JobStatus, Error> {
        let user_id = caller.access.require_user()?;
        self.ports
            .statuses
            .get(job_id)
            .await?
            .filter(|status| status.owner_id == Some(user_id))
            .ok_or_else(|| Error::not_found("job not found"))
    }
}

#[cfg(test)]
#[path = "reports_service_tests.rs"]
mod tests;
