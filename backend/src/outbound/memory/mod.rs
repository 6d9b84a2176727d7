//! In-memory repositories for development servers and integration tests.
//!
//! [`MemoryDatabase`] keeps every table behind one mutex, so each port
//! call is atomic the same way a single PostgreSQL transaction is. Row
//! visibility rules live in the domain services; this adapter ignores the
//! [`AccessContext`] apart from passing it through.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::ports::{
    ArchiveNotification, AuditRepository, AuditRepositoryError, CalendarRepositoryError,
    FileRepository, FileRepositoryError, HealthEventRepository, NotificationRepository,
    ProfessionalRepository, ReportRepository, ReportRepositoryError, ShareLinkRepository,
    ShareLinkRepositoryError, UserRepository, UserRepositoryError,
};
use crate::domain::{
    AccessContext, AuditFilter, AuditRecord, Email, EventRange, HealthEvent, Notification,
    NotificationStatus, PageKey, PageQuery, Professional, Report, ReportStatus, Role, ShareLink,
    StoredFile, User,
};

mod key_value;
mod queue;

pub use key_value::MemoryKeyValueStore;
pub use queue::MemoryJobQueue;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    files: HashMap<Uuid, StoredFile>,
    reports: HashMap<Uuid, Report>,
    notifications: HashMap<Uuid, Notification>,
    events: HashMap<Uuid, HealthEvent>,
    professionals: HashMap<Uuid, Professional>,
    share_links: HashMap<Uuid, ShareLink>,
    audit: Vec<AuditRecord>,
}

/// Shared in-memory store implementing every repository port.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryDatabase {
    /// Empty database.
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        match self.tables.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Newest-first keyset page over `rows`, over-fetching by one.
fn keyset_page<'a, T: Clone + 'a>(
    rows: impl Iterator<Item = &'a T>,
    page: &PageQuery,
    key_of: impl Fn(&T) -> PageKey,
) -> Vec<T> {
    let mut matching: Vec<&T> = rows
        .filter(|row| {
            let key = key_of(row);
            page.cursor().is_none_or(|cursor| cursor.precedes(key.at, key.id))
        })
        .collect();
    matching.sort_by(|a, b| key_of(b).cmp(&key_of(a)));
    matching
        .into_iter()
        .take(page.fetch_limit())
        .cloned()
        .collect()
}

#[async_trait]
impl UserRepository for MemoryDatabase {
    async fn create(&self, _ctx: &AccessContext, user: &User) -> Result<(), UserRepositoryError> {
        let mut tables = self.tables();
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(UserRepositoryError::duplicate_email(user.email.as_str()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        _ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<User>, UserRepositoryError> {
        Ok(self.tables().users.get(&id).cloned())
    }

    async fn find_by_email(
        &self,
        _ctx: &AccessContext,
        email: &Email,
    ) -> Result<Option<User>, UserRepositoryError> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn list(
        &self,
        _ctx: &AccessContext,
        role: Option<Role>,
        page: &PageQuery,
    ) -> Result<Vec<User>, UserRepositoryError> {
        let tables = self.tables();
        let rows = tables
            .users
            .values()
            .filter(|u| role.is_none_or(|r| u.role == r));
        Ok(keyset_page(rows, page, |u| PageKey::new(u.created_at, u.id)))
    }

    async fn set_active(
        &self,
        _ctx: &AccessContext,
        id: Uuid,
        active: bool,
    ) -> Result<Option<User>, UserRepositoryError> {
        let mut tables = self.tables();
        Ok(tables.users.get_mut(&id).map(|user| {
            user.active = active;
            user.clone()
        }))
    }

    async fn count_by_role(
        &self,
        _ctx: &AccessContext,
    ) -> Result<Vec<(Role, u64)>, UserRepositoryError> {
        let tables = self.tables();
        Ok([Role::Receptor, Role::Emissor, Role::Admin]
            .into_iter()
            .map(|role| {
                let count = tables.users.values().filter(|u| u.role == role).count();
                (role, count as u64)
            })
            .collect())
    }
}

#[async_trait]
impl FileRepository for MemoryDatabase {
    async fn insert(
        &self,
        _ctx: &AccessContext,
        file: &StoredFile,
    ) -> Result<(), FileRepositoryError> {
        self.tables().files.insert(file.id, file.clone());
        Ok(())
    }

    async fn find(
        &self,
        _ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<StoredFile>, FileRepositoryError> {
        Ok(self.tables().files.get(&id).cloned())
    }

    async fn find_many(
        &self,
        _ctx: &AccessContext,
        ids: &[Uuid],
    ) -> Result<Vec<StoredFile>, FileRepositoryError> {
        let tables = self.tables();
        Ok(ids
            .iter()
            .filter_map(|id| tables.files.get(id).cloned())
            .collect())
    }

    async fn list_by_owner(
        &self,
        _ctx: &AccessContext,
        owner_id: Uuid,
        page: &PageQuery,
    ) -> Result<Vec<StoredFile>, FileRepositoryError> {
        let tables = self.tables();
        let rows = tables.files.values().filter(|f| f.owner_id == owner_id);
        Ok(keyset_page(rows, page, |f| PageKey::new(f.created_at, f.id)))
    }

    async fn is_received_by(
        &self,
        _ctx: &AccessContext,
        file_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, FileRepositoryError> {
        Ok(self
            .tables()
            .reports
            .values()
            .any(|r| r.file_id == file_id && r.receptor_id == user_id))
    }

    async fn delete(&self, _ctx: &AccessContext, id: Uuid) -> Result<bool, FileRepositoryError> {
        let mut tables = self.tables();
        if tables.reports.values().any(|r| r.file_id == id) {
            return Err(FileRepositoryError::in_use(id));
        }
        if tables.files.remove(&id).is_none() {
            return Ok(false);
        }
        for event in tables.events.values_mut() {
            event.file_ids.retain(|file_id| *file_id != id);
        }
        for link in tables.share_links.values_mut() {
            link.file_ids.retain(|file_id| *file_id != id);
        }
        Ok(true)
    }
}

#[async_trait]
impl ReportRepository for MemoryDatabase {
    async fn create_with_notification(
        &self,
        _ctx: &AccessContext,
        report: &Report,
        notification: &Notification,
    ) -> Result<(), ReportRepositoryError> {
        let mut tables = self.tables();
        tables.reports.insert(report.id, report.clone());
        tables
            .notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn find(
        &self,
        _ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<Report>, ReportRepositoryError> {
        Ok(self.tables().reports.get(&id).cloned())
    }

    async fn mark_viewed(
        &self,
        _ctx: &AccessContext,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Report>, ReportRepositoryError> {
        let mut tables = self.tables();
        Ok(tables
            .reports
            .get_mut(&id)
            .filter(|report| report.status == ReportStatus::Sent)
            .map(|report| {
                report.status = ReportStatus::Viewed;
                report.viewed_at = Some(at);
                report.clone()
            }))
    }

    async fn list_sent(
        &self,
        _ctx: &AccessContext,
        emissor_id: Uuid,
        page: &PageQuery,
    ) -> Result<Vec<Report>, ReportRepositoryError> {
        let tables = self.tables();
        let rows = tables.reports.values().filter(|r| r.emissor_id == emissor_id);
        Ok(keyset_page(rows, page, |r| PageKey::new(r.sent_at, r.id)))
    }

    async fn list_received(
        &self,
        _ctx: &AccessContext,
        receptor_id: Uuid,
        page: &PageQuery,
    ) -> Result<Vec<Report>, ReportRepositoryError> {
        let tables = self.tables();
        let rows = tables
            .reports
            .values()
            .filter(|r| r.receptor_id == receptor_id);
        Ok(keyset_page(rows, page, |r| PageKey::new(r.sent_at, r.id)))
    }

    async fn count_by_status(
        &self,
        _ctx: &AccessContext,
    ) -> Result<Vec<(ReportStatus, u64)>, ReportRepositoryError> {
        let tables = self.tables();
        Ok(
            [ReportStatus::Sent, ReportStatus::Viewed, ReportStatus::Archived]
                .into_iter()
                .map(|status| {
                    let count = tables.reports.values().filter(|r| r.status == status).count();
                    (status, count as u64)
                })
                .collect(),
        )
    }
}

fn archive_in(tables: &mut Tables, id: Uuid, at: DateTime<Utc>) -> Option<Notification> {
    let notification = tables.notifications.get_mut(&id)?;
    if notification.status == NotificationStatus::Unread {
        notification.status = NotificationStatus::Archived;
        notification.archived_at = Some(at);
        if let Some(report) = tables.reports.get_mut(&notification.report_id) {
            report.status = ReportStatus::Archived;
        }
    }
    Some(notification.clone())
}

#[async_trait]
impl NotificationRepository for MemoryDatabase {
    async fn list(
        &self,
        _ctx: &AccessContext,
        user_id: Uuid,
        status: NotificationStatus,
        page: &PageQuery,
    ) -> Result<Vec<Notification>, ReportRepositoryError> {
        let tables = self.tables();
        let rows = tables
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && n.status == status);
        Ok(keyset_page(rows, page, |n| PageKey::new(n.created_at, n.id)))
    }

    async fn find(
        &self,
        _ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<Notification>, ReportRepositoryError> {
        Ok(self.tables().notifications.get(&id).cloned())
    }

    async fn archive(
        &self,
        _ctx: &AccessContext,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Notification>, ReportRepositoryError> {
        Ok(archive_in(&mut self.tables(), id, at))
    }
}

#[async_trait]
impl HealthEventRepository for MemoryDatabase {
    async fn create(
        &self,
        _ctx: &AccessContext,
        event: &HealthEvent,
        archive: Option<ArchiveNotification>,
    ) -> Result<(), CalendarRepositoryError> {
        let mut tables = self.tables();
        if let Some(archive) = archive {
            archive_in(&mut tables, archive.notification_id, archive.at);
        }
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn find(
        &self,
        _ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<HealthEvent>, CalendarRepositoryError> {
        Ok(self.tables().events.get(&id).cloned())
    }

    async fn list(
        &self,
        _ctx: &AccessContext,
        owner_id: Uuid,
        range: EventRange,
    ) -> Result<Vec<HealthEvent>, CalendarRepositoryError> {
        let mut events: Vec<HealthEvent> = self
            .tables()
            .events
            .values()
            .filter(|e| e.owner_id == owner_id && range.contains(e.starts_at))
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.starts_at, e.id));
        Ok(events)
    }

    async fn update(
        &self,
        _ctx: &AccessContext,
        event: &HealthEvent,
    ) -> Result<bool, CalendarRepositoryError> {
        let mut tables = self.tables();
        match tables.events.get_mut(&event.id) {
            Some(stored) => {
                *stored = event.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, _ctx: &AccessContext, id: Uuid) -> Result<bool, CalendarRepositoryError> {
        Ok(self.tables().events.remove(&id).is_some())
    }
}

#[async_trait]
impl ProfessionalRepository for MemoryDatabase {
    async fn create(
        &self,
        _ctx: &AccessContext,
        professional: &Professional,
    ) -> Result<(), CalendarRepositoryError> {
        self.tables()
            .professionals
            .insert(professional.id, professional.clone());
        Ok(())
    }

    async fn find(
        &self,
        _ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<Professional>, CalendarRepositoryError> {
        Ok(self.tables().professionals.get(&id).cloned())
    }

    async fn list(
        &self,
        _ctx: &AccessContext,
        owner_id: Uuid,
    ) -> Result<Vec<Professional>, CalendarRepositoryError> {
        let mut rows: Vec<Professional> = self
            .tables()
            .professionals
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn delete(&self, _ctx: &AccessContext, id: Uuid) -> Result<bool, CalendarRepositoryError> {
        let mut tables = self.tables();
        if tables.professionals.remove(&id).is_none() {
            return Ok(false);
        }
        for event in tables.events.values_mut() {
            if event.professional_id == Some(id) {
                event.professional_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl ShareLinkRepository for MemoryDatabase {
    async fn create(
        &self,
        _ctx: &AccessContext,
        link: &ShareLink,
    ) -> Result<(), ShareLinkRepositoryError> {
        self.tables().share_links.insert(link.id, link.clone());
        Ok(())
    }

    async fn list(
        &self,
        _ctx: &AccessContext,
        owner_id: Uuid,
    ) -> Result<Vec<ShareLink>, ShareLinkRepositoryError> {
        let mut rows: Vec<ShareLink> = self
            .tables()
            .share_links
            .values()
            .filter(|l| l.owner_id == owner_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    async fn find(
        &self,
        _ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<ShareLink>, ShareLinkRepositoryError> {
        Ok(self.tables().share_links.get(&id).cloned())
    }

    async fn find_by_token_hash(
        &self,
        _ctx: &AccessContext,
        token_hash: &str,
    ) -> Result<Option<ShareLink>, ShareLinkRepositoryError> {
        Ok(self
            .tables()
            .share_links
            .values()
            .find(|l| l.token_hash == token_hash)
            .cloned())
    }

    async fn revoke(
        &self,
        _ctx: &AccessContext,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<ShareLink>, ShareLinkRepositoryError> {
        let mut tables = self.tables();
        Ok(tables.share_links.get_mut(&id).map(|link| {
            link.revoked_at.get_or_insert(at);
            link.clone()
        }))
    }

    async fn record_access(
        &self,
        _ctx: &AccessContext,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ShareLink>, ShareLinkRepositoryError> {
        let mut tables = self.tables();
        Ok(tables
            .share_links
            .get_mut(&id)
            .filter(|link| link.is_usable(now))
            .map(|link| {
                link.access_count += 1;
                link.clone()
            }))
    }

    async fn revoke_expired(
        &self,
        _ctx: &AccessContext,
        now: DateTime<Utc>,
    ) -> Result<u64, ShareLinkRepositoryError> {
        let mut tables = self.tables();
        let mut revoked = 0;
        for link in tables.share_links.values_mut() {
            if link.revoked_at.is_none() && link.expires_at <= now {
                link.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

#[async_trait]
impl AuditRepository for MemoryDatabase {
    async fn append(
        &self,
        _ctx: &AccessContext,
        record: &AuditRecord,
    ) -> Result<(), AuditRepositoryError> {
        self.tables().audit.push(record.clone());
        Ok(())
    }

    async fn query(
        &self,
        _ctx: &AccessContext,
        filter: &AuditFilter,
        page: &PageQuery,
    ) -> Result<Vec<AuditRecord>, AuditRepositoryError> {
        let tables = self.tables();
        let rows = tables.audit.iter().filter(|r| filter.matches(r));
        Ok(keyset_page(rows, page, |r| PageKey::new(r.created_at, r.id)))
    }
}
