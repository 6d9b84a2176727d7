//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types live here so
//! every repository decodes stored enums the same way.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    AuditAction, AuditRecord, DisplayName, Email, EventKind, HealthEvent, Notification,
    NotificationStatus, PasswordDigest, Professional, Report, ReportStatus, Role, ShareLink,
    StorageBackend, StoredFile, User,
};

use super::schema::{
    audit_log, files, health_events, notifications, professionals, reports, share_links, users,
};

/// A stored value the domain cannot represent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("corrupt {column} value `{value}`")]
pub(crate) struct CorruptRow {
    column: &'static str,
    value: String,
}

impl CorruptRow {
    fn new(column: &'static str, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

fn parse<T: FromStr>(column: &'static str, raw: &str) -> Result<T, CorruptRow> {
    raw.parse().map_err(|_| CorruptRow::new(column, raw))
}

fn non_negative(column: &'static str, raw: i32) -> Result<u32, CorruptRow> {
    u32::try_from(raw).map_err(|_| CorruptRow::new(column, raw.to_string()))
}

/// Counters never exceed `i32::MAX` because the API caps them far below.
pub(crate) fn to_db_count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub active: bool,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = CorruptRow;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email =
            Email::try_from(row.email.clone()).map_err(|_| CorruptRow::new("email", row.email))?;
        let display_name = DisplayName::try_from(row.display_name.clone())
            .map_err(|_| CorruptRow::new("display_name", row.display_name))?;
        Ok(User {
            id: row.id,
            email,
            display_name,
            role: parse::<Role>("role", &row.role)?,
            active: row.active,
            password: PasswordDigest::from_stored(row.password_hash),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub display_name: &'a str,
    pub role: &'a str,
    pub active: bool,
    pub password_hash: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> From<&'a User> for NewUserRow<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: user.id,
            email: user.email.as_str(),
            display_name: user.display_name.as_str(),
            role: user.role.as_str(),
            active: user.active,
            password_hash: user.password.as_str(),
            created_at: user.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = files)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FileRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_backend: String,
    pub storage_key: String,
    pub public_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<FileRow> for StoredFile {
    type Error = CorruptRow;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        Ok(StoredFile {
            id: row.id,
            owner_id: row.owner_id,
            original_name: row.original_name,
            content_type: row.content_type,
            size_bytes: row.size_bytes,
            storage_backend: parse::<StorageBackend>("storage_backend", &row.storage_backend)?,
            storage_key: row.storage_key,
            public_url: row.public_url,
            created_at: row.created_at,
        })
    }
}

impl From<&StoredFile> for FileRow {
    fn from(file: &StoredFile) -> Self {
        Self {
            id: file.id,
            owner_id: file.owner_id,
            original_name: file.original_name.clone(),
            content_type: file.content_type.clone(),
            size_bytes: file.size_bytes,
            storage_backend: file.storage_backend.as_str().to_owned(),
            storage_key: file.storage_key.clone(),
            public_url: file.public_url.clone(),
            created_at: file.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports and notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = reports)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ReportRow {
    pub id: Uuid,
    pub emissor_id: Uuid,
    pub receptor_id: Uuid,
    pub file_id: Uuid,
    pub title: String,
    pub protocol: Option<String>,
    pub status: String,
    pub sent_at: DateTime<Utc>,
    pub viewed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReportRow> for Report {
    type Error = CorruptRow;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(Report {
            id: row.id,
            emissor_id: row.emissor_id,
            receptor_id: row.receptor_id,
            file_id: row.file_id,
            title: row.title,
            protocol: row.protocol,
            status: parse::<ReportStatus>("status", &row.status)?,
            sent_at: row.sent_at,
            viewed_at: row.viewed_at,
        })
    }
}

impl From<&Report> for ReportRow {
    fn from(report: &Report) -> Self {
        Self {
            id: report.id,
            emissor_id: report.emissor_id,
            receptor_id: report.receptor_id,
            file_id: report.file_id,
            title: report.title.clone(),
            protocol: report.protocol.clone(),
            status: report.status.as_str().to_owned(),
            sent_at: report.sent_at,
            viewed_at: report.viewed_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub report_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = CorruptRow;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            report_id: row.report_id,
            status: parse::<NotificationStatus>("status", &row.status)?,
            created_at: row.created_at,
            archived_at: row.archived_at,
        })
    }
}

impl From<&Notification> for NotificationRow {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            user_id: notification.user_id,
            report_id: notification.report_id,
            status: notification.status.as_str().to_owned(),
            created_at: notification.created_at,
            archived_at: notification.archived_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = professionals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ProfessionalRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub specialty: String,
    pub registry_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ProfessionalRow> for Professional {
    fn from(row: ProfessionalRow) -> Self {
        Professional {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            specialty: row.specialty,
            registry_number: row.registry_number,
            phone: row.phone,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

impl From<&Professional> for ProfessionalRow {
    fn from(p: &Professional) -> Self {
        Self {
            id: p.id,
            owner_id: p.owner_id,
            name: p.name.clone(),
            specialty: p.specialty.clone(),
            registry_number: p.registry_number.clone(),
            phone: p.phone.clone(),
            email: p.email.clone(),
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = health_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct HealthEventRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub kind: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub professional_id: Option<Uuid>,
    pub file_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<HealthEventRow> for HealthEvent {
    type Error = CorruptRow;

    fn try_from(row: HealthEventRow) -> Result<Self, Self::Error> {
        Ok(HealthEvent {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            kind: parse::<EventKind>("kind", &row.kind)?,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            professional_id: row.professional_id,
            file_ids: row.file_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&HealthEvent> for HealthEventRow {
    fn from(event: &HealthEvent) -> Self {
        Self {
            id: event.id,
            owner_id: event.owner_id,
            title: event.title.clone(),
            description: event.description.clone(),
            kind: event.kind.as_str().to_owned(),
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            professional_id: event.professional_id,
            file_ids: event.file_ids.clone(),
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// Mutable event columns; `None` values are written as NULL.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = health_events)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct HealthEventUpdate<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub kind: &'a str,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub professional_id: Option<Uuid>,
    pub file_ids: &'a [Uuid],
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a HealthEvent> for HealthEventUpdate<'a> {
    fn from(event: &'a HealthEvent) -> Self {
        Self {
            title: &event.title,
            description: event.description.as_deref(),
            kind: event.kind.as_str(),
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            professional_id: event.professional_id,
            file_ids: &event.file_ids,
            updated_at: event.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Share links
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = share_links)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ShareLinkRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub token_hash: String,
    pub file_ids: Vec<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub max_accesses: Option<i32>,
    pub access_count: i32,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ShareLinkRow> for ShareLink {
    type Error = CorruptRow;

    fn try_from(row: ShareLinkRow) -> Result<Self, Self::Error> {
        Ok(ShareLink {
            id: row.id,
            owner_id: row.owner_id,
            token_hash: row.token_hash,
            file_ids: row.file_ids,
            expires_at: row.expires_at,
            max_accesses: row
                .max_accesses
                .map(|max| non_negative("max_accesses", max))
                .transpose()?,
            access_count: non_negative("access_count", row.access_count)?,
            revoked_at: row.revoked_at,
            created_at: row.created_at,
        })
    }
}

impl From<&ShareLink> for ShareLinkRow {
    fn from(link: &ShareLink) -> Self {
        Self {
            id: link.id,
            owner_id: link.owner_id,
            token_hash: link.token_hash.clone(),
            file_ids: link.file_ids.clone(),
            expires_at: link.expires_at,
            max_accesses: link.max_accesses.map(to_db_count),
            access_count: to_db_count(link.access_count),
            revoked_at: link.revoked_at,
            created_at: link.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = audit_log)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AuditRow {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<Uuid>,
    pub ip: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditRecord {
    type Error = CorruptRow;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditRecord {
            id: row.id,
            actor_id: row.actor_id,
            action: parse::<AuditAction>("action", &row.action)?,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            ip: row.ip,
            metadata: row.metadata,
            created_at: row.created_at,
        })
    }
}

impl From<&AuditRecord> for AuditRow {
    fn from(record: &AuditRecord) -> Self {
        Self {
            id: record.id,
            actor_id: record.actor_id,
            action: record.action.as_str().to_owned(),
            resource_type: record.resource_type.clone(),
            resource_id: record.resource_id,
            ip: record.ip.clone(),
            metadata: record.metadata.clone(),
            created_at: record.created_at,
        }
    }
}

/// Decode a batch of rows, failing on the first corrupt one.
pub(crate) fn decode_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, CorruptRow>
where
    T: TryFrom<R, Error = CorruptRow>,
{
    rows.into_iter().map(T::try_from).collect()
}
