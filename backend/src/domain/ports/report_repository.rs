//! Ports for reports and the notifications they create.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    AccessContext, Error, Notification, NotificationStatus, PageQuery, Report, ReportStatus,
};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by report and notification adapters.
    pub enum ReportRepositoryError {
        Connection { message: String } => "report repository connection failed: {message}",
        Query { message: String } => "report repository query failed: {message}",
    }
}

impl From<ReportRepositoryError> for Error {
    fn from(value: ReportRepositoryError) -> Self {
        match value {
            ReportRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("report repository unavailable: {message}"))
            }
            ReportRepositoryError::Query { message } => {
                Error::internal(format!("report repository error: {message}"))
            }
        }
    }
}

/// Port for reports and the notifications created with them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Persist a report and the receptor's notification atomically.
    async fn create_with_notification(
        &self,
        ctx: &AccessContext,
        report: &Report,
        notification: &Notification,
    ) -> Result<(), ReportRepositoryError>;

    async fn find(
        &self,
        ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<Report>, ReportRepositoryError>;

    /// Move a `sent` report to `viewed`. Returns the report when the
    /// transition happened, `None` when it was already viewed or missing.
    async fn mark_viewed(
        &self,
        ctx: &AccessContext,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Report>, ReportRepositoryError>;

    /// Reports sent by `emissor_id`, newest first.
    async fn list_sent(
        &self,
        ctx: &AccessContext,
        emissor_id: Uuid,
        page: &PageQuery,
    ) -> Result<Vec<Report>, ReportRepositoryError>;

    /// Reports received by `receptor_id`, newest first.
    async fn list_received(
        &self,
        ctx: &AccessContext,
        receptor_id: Uuid,
        page: &PageQuery,
    ) -> Result<Vec<Report>, ReportRepositoryError>;

    /// Report totals per status.
    async fn count_by_status(
        &self,
        ctx: &AccessContext,
    ) -> Result<Vec<(ReportStatus, u64)>, ReportRepositoryError>;
}

/// Port for inbox notifications.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// A user's notifications with `status`, newest first.
    async fn list(
        &self,
        ctx: &AccessContext,
        user_id: Uuid,
        status: NotificationStatus,
        page: &PageQuery,
    ) -> Result<Vec<Notification>, ReportRepositoryError>;

    async fn find(
        &self,
        ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<Notification>, ReportRepositoryError>;

    /// Archive a notification; archiving twice keeps the first timestamp.
    async fn archive(
        &self,
        ctx: &AccessContext,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Notification>, ReportRepositoryError>;
}
