//! Driving ports for a receptor's health events and professionals.
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Caller, Error, EventDraft, EventRange, HealthEvent, Professional, ProfessionalDraft,
};

/// Driving port for a receptor's health calendar.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HealthEvents: Send + Sync {
    /// Create an event. With `notification_id`, the notification's report
    /// file is attached and the notification archived atomically.
    async fn create(
        &self,
        caller: &Caller,
        draft: EventDraft,
        notification_id: Option<Uuid>,
    ) -> Result<HealthEvent, Error>;

    async fn list(&self, caller: &Caller, range: EventRange) -> Result<Vec<HealthEvent>, Error>;

    async fn get(&self, caller: &Caller, id: Uuid) -> Result<HealthEvent, Error>;

    async fn update(&self, caller: &Caller, id: Uuid, draft: EventDraft)
    -> Result<HealthEvent, Error>;

    async fn delete(&self, caller: &Caller, id: Uuid) -> Result<(), Error>;
}

/// Driving port for a receptor's professional contacts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Professionals: Send + Sync {
    async fn create(
        &self,
        caller: &Caller,
        draft: ProfessionalDraft,
    ) -> Result<Professional, Error>;

    async fn list(&self, caller: &Caller) -> Result<Vec<Professional>, Error>;

    async fn delete(&self, caller: &Caller, id: Uuid) -> Result<(), Error>;
}
