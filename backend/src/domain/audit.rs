//! Append-only audit trail.
//!
//! [`AuditLogger::record`] never fails: repository errors are logged and
//! dropped so auditing cannot break the operation being audited.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::AccessContext;
use super::ports::AuditRepository;

/// Audited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    LoginSucceeded,
    LoginFailed,
    UserRegistered,
    ReportSent,
    ReportViewed,
    ReportBatchQueued,
    NotificationArchived,
    EventCreated,
    EventUpdated,
    EventDeleted,
    FileUploaded,
    FileDownloaded,
    FileDeleted,
    ShareLinkCreated,
    ShareLinkRevoked,
    ShareLinkAccessed,
    ProfessionalCreated,
    ProfessionalDeleted,
    UserActivated,
    UserDeactivated,
}

impl AuditAction {
    /// Every action, in declaration order.
    pub const ALL: [AuditAction; 20] = [
        Self::LoginSucceeded,
        Self::LoginFailed,
        Self::UserRegistered,
        Self::ReportSent,
        Self::ReportViewed,
        Self::ReportBatchQueued,
        Self::NotificationArchived,
        Self::EventCreated,
        Self::EventUpdated,
        Self::EventDeleted,
        Self::FileUploaded,
        Self::FileDownloaded,
        Self::FileDeleted,
        Self::ShareLinkCreated,
        Self::ShareLinkRevoked,
        Self::ShareLinkAccessed,
        Self::ProfessionalCreated,
        Self::ProfessionalDeleted,
        Self::UserActivated,
        Self::UserDeactivated,
    ];

    /// Stable snake_case name stored with each record.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoginSucceeded => "login_succeeded",
            Self::LoginFailed => "login_failed",
            Self::UserRegistered => "user_registered",
            Self::ReportSent => "report_sent",
            Self::ReportViewed => "report_viewed",
            Self::ReportBatchQueued => "report_batch_queued",
            Self::NotificationArchived => "notification_archived",
            Self::EventCreated => "event_created",
            Self::EventUpdated => "event_updated",
            Self::EventDeleted => "event_deleted",
            Self::FileUploaded => "file_uploaded",
            Self::FileDownloaded => "file_downloaded",
            Self::FileDeleted => "file_deleted",
            Self::ShareLinkCreated => "share_link_created",
            Self::ShareLinkRevoked => "share_link_revoked",
            Self::ShareLinkAccessed => "share_link_accessed",
            Self::ProfessionalCreated => "professional_created",
            Self::ProfessionalDeleted => "professional_deleted",
            Self::UserActivated => "user_activated",
            Self::UserDeactivated => "user_deactivated",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("unknown audit action `{s}`"))
    }
}

/// Entry to append.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub actor_id: Option<Uuid>,
    pub action: AuditAction,
    pub resource_type: &'static str,
    pub resource_id: Option<Uuid>,
    pub ip: Option<String>,
    pub metadata: Value,
}

impl AuditEntry {
    /// Entry for `action` on a resource of `resource_type`.
    pub fn new(action: AuditAction, resource_type: &'static str) -> Self {
        Self {
            actor_id: None,
            action,
            resource_type,
            resource_id: None,
            ip: None,
            metadata: Value::Object(serde_json::Map::new()),
        }
    }

    /// Account that performed the action.
    pub fn actor(mut self, actor_id: Option<Uuid>) -> Self {
        self.actor_id = actor_id;
        self
    }

    /// Identifier of the affected resource.
    pub fn resource(mut self, resource_id: Uuid) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    /// Client address the request came from.
    pub fn ip(mut self, ip: Option<&str>) -> Self {
        self.ip = ip.map(str::to_owned);
        self
    }

    /// Free-form JSON details.
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Stored entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: Option<Uuid>,
    pub ip: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// Admin query filter; all fields optional and combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub actor_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AuditFilter {
    /// Whether `record` passes every set field of the filter.
    pub fn matches(&self, record: &AuditRecord) -> bool {
        self.actor_id.is_none_or(|id| record.actor_id == Some(id))
            && self.action.is_none_or(|action| record.action == action)
            && self.from.is_none_or(|from| record.created_at >= from)
            && self.to.is_none_or(|to| record.created_at <= to)
    }
}

/// Best-effort writer in front of the audit repository.
#[derive(Clone)]
pub struct AuditLogger {
    repo: Arc<dyn AuditRepository>,
    clock: Arc<dyn Clock>,
}

impl AuditLogger {
    /// Logger appending through `repo`, timestamped by `clock`.
    pub fn new(repo: Arc<dyn AuditRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Append `entry`; failures are logged and swallowed.
    pub async fn record(&self, entry: AuditEntry) {
        let record = AuditRecord {
            id: Uuid::new_v4(),
            actor_id: entry.actor_id,
            action: entry.action,
            resource_type: entry.resource_type.to_owned(),
            resource_id: entry.resource_id,
            ip: entry.ip,
            metadata: entry.metadata,
            created_at: self.clock.utc(),
        };
        if let Err(err) = self.repo.append(&AccessContext::system(), &record).await {
            error!(
                error = %err,
                action = %record.action,
                resource_type = %record.resource_type,
                "audit log write failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{AuditRepositoryError, MockAuditRepository};
    use mockable::DefaultClock;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn every_action_parses_back() {
        for action in AuditAction::ALL {
            assert_eq!(action.as_str().parse::<AuditAction>(), Ok(action));
        }
    }

    #[tokio::test]
    async fn record_swallows_repository_failures() {
        let mut repo = MockAuditRepository::new();
        repo.expect_append()
            .times(1)
            .returning(|_, _| Err(AuditRepositoryError::connection("down")));
        let logger = AuditLogger::new(Arc::new(repo), Arc::new(DefaultClock));
        logger
            .record(AuditEntry::new(AuditAction::LoginFailed, "user"))
            .await;
    }

    #[tokio::test]
    async fn record_forwards_entry_fields() {
        let actor = Uuid::new_v4();
        let resource = Uuid::new_v4();
        let mut repo = MockAuditRepository::new();
        repo.expect_append()
            .withf(move |ctx, record| {
                ctx.user_id().is_none()
                    && record.actor_id == Some(actor)
                    && record.resource_id == Some(resource)
                    && record.action == AuditAction::FileUploaded
                    && record.ip.as_deref() == Some("10.0.0.1")
                    && record.metadata == json!({"size": 3})
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let logger = AuditLogger::new(Arc::new(repo), Arc::new(DefaultClock));
        logger
            .record(
                AuditEntry::new(AuditAction::FileUploaded, "file")
                    .actor(Some(actor))
                    .resource(resource)
                    .ip(Some("10.0.0.1"))
                    .metadata(json!({"size": 3})),
            )
            .await;
    }

    #[rstest]
    fn filters_combine_with_and() {
        let actor = Uuid::new_v4();
        let record = AuditRecord {
            id: Uuid::new_v4(),
            actor_id: Some(actor),
            action: AuditAction::ReportSent,
            resource_type: "report".into(),
            resource_id: None,
            ip: None,
            metadata: json!({}),
            created_at: Utc::now(),
        };
        let mut filter = AuditFilter {
            actor_id: Some(actor),
            ..AuditFilter::default()
        };
        assert!(filter.matches(&record));
        filter.action = Some(AuditAction::LoginFailed);
        assert!(!filter.matches(&record));
    }
}
