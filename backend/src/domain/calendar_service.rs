//! Health events and the professionals list of a receptor.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::cache::{CacheAside, STATS_TAG, user_tag};
use crate::domain::ports::{
    ArchiveNotification, FileRepository, HealthEventRepository, HealthEvents,
    NotificationRepository, ProfessionalRepository, Professionals, ReportRepository,
};
use crate::domain::{
    AuditAction, AuditEntry, AuditLogger, Caller, EVENT_FILES_MAX, Error, EventDraft, EventRange,
    HealthEvent, NotificationStatus, Professional, ProfessionalDraft, Role,
};

/// Driven ports used by [`HealthEventsService`].
#[derive(Clone)]
pub struct CalendarPorts {
    pub events: Arc<dyn HealthEventRepository>,
    pub professionals: Arc<dyn ProfessionalRepository>,
    pub files: Arc<dyn FileRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub reports: Arc<dyn ReportRepository>,
}

/// Health-event service implementing [`HealthEvents`].
#[derive(Clone)]
pub struct HealthEventsService {
    ports: CalendarPorts,
    audit: AuditLogger,
    cache: CacheAside,
    clock: Arc<dyn Clock>,
}

fn attachment_error(message: impl Into<String>, field: &str) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field,
        "code": "invalid_attachment",
    }))
}

impl HealthEventsService {
    pub fn new(
        ports: CalendarPorts,
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

    async fn owned(&self, caller: &Caller, id: Uuid) -> Result<HealthEvent, Error> {
        let owner_id = caller.access.require_role(Role::Receptor)?;
        self.ports
            .events
            .find(&caller.access, id)
            .await?
            .filter(|event| event.owner_id == owner_id)
            .ok_or_else(|| Error::not_found("event not found"))
    }

    /// Every file must be the owner's upload or a report file they received.
    async fn check_files(&self, caller: &Caller, owner_id: Uuid, ids: &[Uuid]) -> Result<(), Error> {
        if ids.len() > EVENT_FILES_MAX {
            return Err(attachment_error(
                format!("at most {EVENT_FILES_MAX} files may be attached"),
                "fileIds",
            ));
        }
        let found = self.ports.files.find_many(&caller.access, ids).await?;
        for id in ids {
            let Some(file) = found.iter().find(|file| file.id == *id) else {
                return Err(attachment_error(format!("file {id} not found"), "fileIds"));
            };
            if file.owner_id != owner_id
                && !self
                    .ports
                    .files
                    .is_received_by(&caller.access, file.id, owner_id)
                    .await?
            {
                return Err(attachment_error(format!("file {id} not found"), "fileIds"));
            }
        }
        Ok(())
    }

    async fn check_professional(
        &self,
        caller: &Caller,
        owner_id: Uuid,
        professional_id: Option<Uuid>,
    ) -> Result<(), Error> {
        let Some(id) = professional_id else {
            return Ok(());
        };
        match self.ports.professionals.find(&caller.access, id).await? {
            Some(p) if p.owner_id == owner_id => Ok(()),
            _ => Err(attachment_error("professional not found", "professionalId")),
        }
    }

    async fn record(&self, caller: &Caller, action: AuditAction, event_id: Uuid) {
        self.audit
            .record(
                AuditEntry::new(action, "health_event")
                    .actor(caller.access.user_id())
                    .resource(event_id)
                    .ip(caller.ip()),
            )
            .await;
    }
}

#[async_trait]
impl HealthEvents for HealthEventsService {
    async fn create(
        &self,
        caller: &Caller,
        mut draft: EventDraft,
        notification_id: Option<Uuid>,
    ) -> Result<HealthEvent, Error> {
        let owner_id = caller.access.require_role(Role::Receptor)?;
        let now = self.clock.utc();
        let mut archive = None;
        if let Some(notification_id) = notification_id {
            let notification = self
                .ports
                .notifications
                .find(&caller.access, notification_id)
                .await?
                .filter(|n| n.user_id == owner_id)
                .ok_or_else(|| Error::not_found("notification not found"))?;
            let report = self
                .ports
                .reports
                .find(&caller.access, notification.report_id)
                .await?
                .ok_or_else(|| Error::not_found("report not found"))?;
            draft.attach(report.file_id);
            if notification.status == NotificationStatus::Unread {
                archive = Some(ArchiveNotification {
                    notification_id,
                    at: now,
                });
            }
        }
        self.check_files(caller, owner_id, &draft.file_ids).await?;
        self.check_professional(caller, owner_id, draft.professional_id)
            .await?;

        let event = HealthEvent {
            id: Uuid::new_v4(),
            owner_id,
            title: draft.title,
            description: draft.description,
            kind: draft.kind,
            starts_at: draft.starts_at,
            ends_at: draft.ends_at,
            professional_id: draft.professional_id,
            file_ids: draft.file_ids,
            created_at: now,
            updated_at: now,
        };
        self.ports
            .events
            .create(&caller.access, &event, archive)
            .await?;
        if archive.is_some() {
            self.cache.invalidate_tag(&user_tag(owner_id)).await;
            self.cache.invalidate_tag(STATS_TAG).await;
        }
        info!(event_id = %event.id, user_id = %owner_id, "health event created");
        self.record(caller, AuditAction::EventCreated, event.id).await;
        Ok(event)
    }

    async fn list(&self, caller: &Caller, range: EventRange) -> Result<Vec<HealthEvent>, Error> {
        let owner_id = caller.access.require_role(Role::Receptor)?;
        Ok(self
            .ports
            .events
            .list(&caller.access, owner_id, range)
            .await?)
    }

    async fn get(&self, caller: &Caller, id: Uuid) -> Result<HealthEvent, Error> {
        self.owned(caller, id).await
    }

    async fn update(
        &self,
        caller: &Caller,
        id: Uuid,
        draft: EventDraft,
    ) -> Result<HealthEvent, Error> {
        let existing = self.owned(caller, id).await?;
        self.check_files(caller, existing.owner_id, &draft.file_ids)
            .await?;
        self.check_professional(caller, existing.owner_id, draft.professional_id)
            .await?;
        let event = HealthEvent {
            title: draft.title,
            description: draft.description,
            kind: draft.kind,
            starts_at: draft.starts_at,
            ends_at: draft.ends_at,
            professional_id: draft.professional_id,
            file_ids: draft.file_ids,
            updated_at: self.clock.utc(),
            ..existing
        };
        if !self.ports.events.update(&caller.access, &event).await? {
            return Err(Error::not_found("event not found"));
        }
        self.record(caller, AuditAction::EventUpdated, id).await;
        Ok(event)
    }

    async fn delete(&self, caller: &Caller, id: Uuid) -> Result<(), Error> {
        self.owned(caller, id).await?;
        if !self.ports.events.delete(&caller.access, id).await? {
            return Err(Error::not_found("event not found"));
        }
        self.record(caller, AuditAction::EventDeleted, id).await;
        Ok(())
    }
}

/// Professional contact service implementing [`Professionals`].
#[derive(Clone)]
pub struct ProfessionalsService {
    professionals: Arc<dyn ProfessionalRepository>,
    audit: AuditLogger,
    clock: Arc<dyn Clock>,
}

impl ProfessionalsService {
    pub fn new(
        professionals: Arc<dyn ProfessionalRepository>,
        audit: AuditLogger,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            professionals,
            audit,
            clock,
        }
    }
}

#[async_trait]
impl Professionals for ProfessionalsService {
    async fn create(
        &self,
        caller: &Caller,
        draft: ProfessionalDraft,
    ) -> Result<Professional, Error> {
        let owner_id = caller.access.require_role(Role::Receptor)?;
        let professional = Professional {
            id: Uuid::new_v4(),
            owner_id,
            name: draft.name,
            specialty: draft.specialty,
            registry_number: draft.registry_number,
            phone: draft.phone,
            email: draft.email,
            created_at: self.clock.utc(),
        };
        self.professionals
            .create(&caller.access, &professional)
            .await?;
        self.audit
            .record(
                AuditEntry::new(AuditAction::ProfessionalCreated, "professional")
                    .actor(Some(owner_id))
                    .resource(professional.id)
                    .ip(caller.ip()),
            )
            .await;
        Ok(professional)
    }

    async fn list(&self, caller: &Caller) -> Result<Vec<Professional>, Error> {
        let owner_id = caller.access.require_role(Role::Receptor)?;
        Ok(self.professionals.list(&caller.access, owner_id).await?)
    }

    async fn delete(&self, caller: &Caller, id: Uuid) -> Result<(), Error> {
        let owner_id = caller.access.require_role(Role::Receptor)?;
        let owned = self
            .professionals
            .find(&caller.access, id)
            .await?
            .is_some_and(|p| p.owner_id == owner_id);
        if !owned || !self.professionals.delete(&caller.access, id).await? {
            return Err(Error::not_found("professional not found"));
        }
        self.audit
            .record(
                AuditEntry::new(AuditAction::ProfessionalDeleted, "professional")
                    .actor(Some(owner_id))
                    .resource(id)
                    .ip(caller.ip()),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "calendar_service_tests.rs"]
mod tests;
