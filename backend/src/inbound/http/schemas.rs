//! Response bodies and their OpenAPI schemas.
//!
//! Domain entities carry fields clients must never see (password digests,
//! storage keys, token hashes), so handlers convert them into the camelCase
//! DTOs defined here before serialising.

use chrono::{DateTime, Utc};
use pagination::Paginated;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    AuditAction, AuditRecord, CreatedShareLink, EventKind, HealthEvent, Notification,
    NotificationStatus, Professional, Report, ReportStatus, Role, ShareLink, SharedBundle,
    StorageBackend, StoredFile, User,
};

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    #[schema(example = "ana@example.com")]
    pub email: String,
    #[schema(example = "Ana Souza")]
    pub display_name: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.as_str().to_owned(),
            display_name: user.display_name.as_str().to_owned(),
            role: user.role,
            active: user.active,
            created_at: user.created_at,
        }
    }
}

/// File metadata; the storage key stays server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[schema(example = "hemograma.pdf")]
    pub original_name: String,
    #[schema(example = "application/pdf")]
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_backend: StorageBackend,
    pub created_at: DateTime<Utc>,
}

impl From<&StoredFile> for FileResponse {
    fn from(file: &StoredFile) -> Self {
        Self {
            id: file.id,
            owner_id: file.owner_id,
            original_name: file.original_name.clone(),
            content_type: file.content_type.clone(),
            size_bytes: file.size_bytes,
            storage_backend: file.storage_backend,
            created_at: file.created_at,
        }
    }
}

/// Report as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: Uuid,
    pub emissor_id: Uuid,
    pub receptor_id: Uuid,
    pub file_id: Uuid,
    #[schema(example = "Complete blood count")]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    pub status: ReportStatus,
    pub sent_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewed_at: Option<DateTime<Utc>>,
}

impl From<&Report> for ReportResponse {
    fn from(report: &Report) -> Self {
        Self {
            id: report.id,
            emissor_id: report.emissor_id,
            receptor_id: report.receptor_id,
            file_id: report.file_id,
            title: report.title.clone(),
            protocol: report.protocol.clone(),
            status: report.status,
            sent_at: report.sent_at,
            viewed_at: report.viewed_at,
        }
    }
}

/// Inbox entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: Uuid,
    pub report_id: Uuid,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<DateTime<Utc>>,
}

impl From<&Notification> for NotificationResponse {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            report_id: notification.report_id,
            status: notification.status,
            created_at: notification.created_at,
            archived_at: notification.archived_at,
        }
    }
}

/// Health event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: EventKind,
    pub starts_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professional_id: Option<Uuid>,
    pub file_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&HealthEvent> for EventResponse {
    fn from(event: &HealthEvent) -> Self {
        Self {
            id: event.id,
            title: event.title.clone(),
            description: event.description.clone(),
            kind: event.kind,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            professional_id: event.professional_id,
            file_ids: event.file_ids.clone(),
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

/// Professional contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalResponse {
    pub id: Uuid,
    #[schema(example = "Dr. Helena Prado")]
    pub name: String,
    #[schema(example = "Cardiology")]
    pub specialty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Professional> for ProfessionalResponse {
    fn from(professional: &Professional) -> Self {
        Self {
            id: professional.id,
            name: professional.name.clone(),
            specialty: professional.specialty.clone(),
            registry_number: professional.registry_number.clone(),
            phone: professional.phone.clone(),
            email: professional.email.clone(),
            created_at: professional.created_at,
        }
    }
}

/// Share link as seen by its owner. The token itself is never listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareLinkResponse {
    pub id: Uuid,
    pub file_ids: Vec<Uuid>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_accesses: Option<u32>,
    pub access_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&ShareLink> for ShareLinkResponse {
    fn from(link: &ShareLink) -> Self {
        Self {
            id: link.id,
            file_ids: link.file_ids.clone(),
            expires_at: link.expires_at,
            max_accesses: link.max_accesses,
            access_count: link.access_count,
            revoked_at: link.revoked_at,
            created_at: link.created_at,
        }
    }
}

/// Creation result; `token` and `url` are shown exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedShareLinkResponse {
    pub link: ShareLinkResponse,
    pub token: String,
    pub url: String,
}

impl From<&CreatedShareLink> for CreatedShareLinkResponse {
    fn from(created: &CreatedShareLink) -> Self {
        Self {
            link: ShareLinkResponse::from(&created.link),
            token: created.token.as_str().to_owned(),
            url: created.url.clone(),
        }
    }
}

/// What an anonymous visitor sees for a share token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SharedBundleResponse {
    pub expires_at: DateTime<Utc>,
    pub files: Vec<SharedFileResponse>,
}

/// File listed by a resolved share link; storage details are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SharedFileResponse {
    pub id: Uuid,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
}

impl From<&SharedBundle> for SharedBundleResponse {
    fn from(bundle: &SharedBundle) -> Self {
        Self {
            expires_at: bundle.link.expires_at,
            files: bundle
                .files
                .iter()
                .map(|file| SharedFileResponse {
                    id: file.id,
                    original_name: file.original_name.clone(),
                    content_type: file.content_type.clone(),
                    size_bytes: file.size_bytes,
                })
                .collect(),
        }
    }
}

/// Audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecordResponse {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<Uuid>,
    pub action: AuditAction,
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<&AuditRecord> for AuditRecordResponse {
    fn from(record: &AuditRecord) -> Self {
        Self {
            id: record.id,
            actor_id: record.actor_id,
            action: record.action,
            resource_type: record.resource_type.clone(),
            resource_id: record.resource_id,
            ip: record.ip.clone(),
            metadata: record.metadata.clone(),
            created_at: record.created_at,
        }
    }
}

/// Convert every item of a domain page into its response DTO.
pub(crate) fn page_of<'a, T: 'a, R>(page: &'a Paginated<T>) -> Paginated<R>
where
    R: From<&'a T>,
{
    Paginated {
        data: page.data.iter().map(R::from).collect(),
        next_cursor: page.next_cursor.clone(),
    }
}

macro_rules! page_schema {
    ($(#[$meta:meta])* $name:ident => $item:ty) => {
        $(#[$meta])*
        #[derive(Serialize, ToSchema)]
        #[serde(rename_all = "camelCase")]
        #[expect(dead_code, reason = "documents the list envelope for OpenAPI only")]
        pub struct $name {
            data: Vec<$item>,
            /// Opaque cursor for the next page; absent on the last page.
            next_cursor: Option<String>,
        }
    };
}

page_schema!(
    /// Page of accounts.
    UserPage => UserResponse
);
page_schema!(
    /// Page of file metadata.
    FilePage => FileResponse
);
page_schema!(
    /// Page of reports.
    ReportPage => ReportResponse
);
page_schema!(
    /// Page of notifications.
    NotificationPage => NotificationResponse
);
page_schema!(
    /// Page of audit records.
    AuditPage => AuditRecordResponse
);

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;

    use crate::domain::{DisplayName, Email, PasswordDigest};

    #[rstest]
    fn user_responses_never_carry_the_password_digest() {
        let user = User {
            id: Uuid::nil(),
            email: Email::parse("ana@example.com").expect("email"),
            display_name: DisplayName::parse("Ana Souza").expect("name"),
            role: Role::Receptor,
            active: true,
            password: PasswordDigest::from_stored("$argon2id$secret"),
            created_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).single().expect("date"),
        };
        let body = serde_json::to_value(UserResponse::from(&user)).expect("serialise");
        assert_eq!(
            body,
            json!({
                "id": Uuid::nil(),
                "email": "ana@example.com",
                "displayName": "Ana Souza",
                "role": "receptor",
                "active": true,
                "createdAt": "2026-01-02T03:04:05Z",
            })
        );
    }

    #[rstest]
    fn file_responses_hide_storage_details() {
        let file = StoredFile {
            id: Uuid::nil(),
            owner_id: Uuid::nil(),
            original_name: "scan.png".to_owned(),
            content_type: "image/png".to_owned(),
            size_bytes: 12,
            storage_backend: StorageBackend::Local,
            storage_key: "owner/file".to_owned(),
            public_url: Some("https://cdn.example/x".to_owned()),
            created_at: Utc::now(),
        };
        let body = serde_json::to_value(FileResponse::from(&file)).expect("serialise");
        assert!(body.get("storageKey").is_none());
        assert!(body.get("publicUrl").is_none());
        assert_eq!(body.get("originalName"), Some(&json!("scan.png")));
    }

    #[rstest]
    fn pages_keep_their_cursor() {
        let page = Paginated {
            data: vec![Professional {
                id: Uuid::nil(),
                owner_id: Uuid::nil(),
                name: "Dr. Prado".to_owned(),
                specialty: String::new(),
                registry_number: None,
                phone: None,
                email: None,
                created_at: Utc::now(),
            }],
            next_cursor: Some("abc".to_owned()),
        };
        let converted: Paginated<ProfessionalResponse> = page_of(&page);
        assert_eq!(converted.next_cursor.as_deref(), Some("abc"));
        assert_eq!(converted.data.len(), 1);
    }
}
