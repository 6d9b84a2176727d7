//! Background jobs and their progress records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::ReportDraft;

/// Work carried by a queued job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    /// Send many reports on behalf of one emissor.
    DispatchReportBatch { items: Vec<ReportDraft> },
    /// Revoke share links whose expiry has passed.
    ExpireShareLinks,
}

impl JobPayload {
    /// Snake_case job kind reported in statuses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DispatchReportBatch { .. } => "dispatch_report_batch",
            Self::ExpireShareLinks => "expire_share_links",
        }
    }

    /// Number of units of work, used as the initial `total`.
    pub fn size(&self) -> u32 {
        match self {
            Self::DispatchReportBatch { items } => u32::try_from(items.len()).unwrap_or(u32::MAX),
            Self::ExpireShareLinks => 1,
        }
    }
}

/// Queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    /// Account the job acts for; `None` for system jobs.
    pub owner_id: Option<Uuid>,
    pub payload: JobPayload,
    pub enqueued_at: DateTime<Utc>,
}

/// Progress state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
}

/// Progress record kept in the status store for 24 hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    pub kind: String,
    pub state: JobState,
    pub processed: u32,
    pub total: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    /// Initial record for a freshly enqueued job.
    pub fn queued(job: &Job) -> Self {
        Self {
            id: job.id,
            owner_id: job.owner_id,
            kind: job.payload.kind().to_owned(),
            state: JobState::Queued,
            processed: 0,
            total: job.payload.size(),
            message: None,
            updated_at: job.enqueued_at,
        }
    }

    /// Copy of this status moved to `state` at `at`.
    pub fn transition(&self, state: JobState, at: DateTime<Utc>) -> Self {
        Self {
            state,
            updated_at: at,
            ..self.clone()
        }
    }
}
