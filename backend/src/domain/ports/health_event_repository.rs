//! Ports for health events and professionals.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{AccessContext, Error, EventRange, HealthEvent, Professional};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by calendar adapters.
    pub enum CalendarRepositoryError {
        Connection { message: String } => "calendar repository connection failed: {message}",
        Query { message: String } => "calendar repository query failed: {message}",
    }
}

impl From<CalendarRepositoryError> for Error {
    fn from(value: CalendarRepositoryError) -> Self {
        match value {
            CalendarRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("calendar repository unavailable: {message}"))
            }
            CalendarRepositoryError::Query { message } => {
                Error::internal(format!("calendar repository error: {message}"))
            }
        }
    }
}

/// Notification to archive alongside an event insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveNotification {
    pub notification_id: Uuid,
    pub at: DateTime<Utc>,
}

/// Port for health-event rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HealthEventRepository: Send + Sync {
    /// Insert an event, archiving `archive` in the same transaction.
    async fn create(
        &self,
        ctx: &AccessContext,
        event: &HealthEvent,
        archive: Option<ArchiveNotification>,
    ) -> Result<(), CalendarRepositoryError>;

    async fn find(
        &self,
        ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<HealthEvent>, CalendarRepositoryError>;

    /// Owner's events whose start falls in `range`, ordered by `starts_at`.
    async fn list(
        &self,
        ctx: &AccessContext,
        owner_id: Uuid,
        range: EventRange,
    ) -> Result<Vec<HealthEvent>, CalendarRepositoryError>;

    /// Replace mutable fields; `false` when the event is gone.
    async fn update(
        &self,
        ctx: &AccessContext,
        event: &HealthEvent,
    ) -> Result<bool, CalendarRepositoryError>;

    async fn delete(&self, ctx: &AccessContext, id: Uuid) -> Result<bool, CalendarRepositoryError>;
}

/// Port for professional contact rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfessionalRepository: Send + Sync {
    async fn create(
        &self,
        ctx: &AccessContext,
        professional: &Professional,
    ) -> Result<(), CalendarRepositoryError>;

    async fn find(
        &self,
        ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<Professional>, CalendarRepositoryError>;

    /// Owner's professionals ordered by name.
    async fn list(
        &self,
        ctx: &AccessContext,
        owner_id: Uuid,
    ) -> Result<Vec<Professional>, CalendarRepositoryError>;

    /// Delete and detach from events.
    async fn delete(&self, ctx: &AccessContext, id: Uuid) -> Result<bool, CalendarRepositoryError>;
}
