//! Reports sent from emissors to receptors and the inbox notifications
//! they create.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Longest accepted report title.
pub const REPORT_TITLE_MAX: usize = 200;
/// Longest accepted protocol reference.
pub const PROTOCOL_MAX: usize = 64;
/// Largest batch accepted by a single batch request.
pub const BATCH_MAX: usize = 100;

/// Lifecycle of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Sent,
    Viewed,
    Archived,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Viewed => "viewed",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(Self::Sent),
            "viewed" => Ok(Self::Viewed),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown report status `{other}`")),
        }
    }
}

/// A document sent to a receptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub emissor_id: Uuid,
    pub receptor_id: Uuid,
    pub file_id: Uuid,
    pub title: String,
    pub protocol: Option<String>,
    pub status: ReportStatus,
    pub sent_at: DateTime<Utc>,
    pub viewed_at: Option<DateTime<Utc>>,
}

impl Report {
    /// Whether `user_id` sent or received this report.
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.emissor_id == user_id || self.receptor_id == user_id
    }
}

/// Validated fields for sending one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDraft {
    pub receptor_email: String,
    pub file_id: Uuid,
    pub title: String,
    pub protocol: Option<String>,
}

/// Report draft validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportValidationError {
    #[error("title must be 1..={max} characters")]
    Title { max: usize },
    #[error("protocol must be at most {max} characters")]
    Protocol { max: usize },
    #[error("receptor email must not be empty")]
    ReceptorEmail,
    #[error("a batch must contain between 1 and {max} reports")]
    BatchSize { max: usize },
}

impl ReportDraft {
    /// Trim and bound-check the free-text fields.
    pub fn new(
        receptor_email: &str,
        file_id: Uuid,
        title: &str,
        protocol: Option<&str>,
    ) -> Result<Self, ReportValidationError> {
        let receptor_email = receptor_email.trim();
        if receptor_email.is_empty() {
            return Err(ReportValidationError::ReceptorEmail);
        }
        let title = title.trim();
        if title.is_empty() || title.chars().count() > REPORT_TITLE_MAX {
            return Err(ReportValidationError::Title {
                max: REPORT_TITLE_MAX,
            });
        }
        let protocol = protocol.map(str::trim).filter(|p| !p.is_empty());
        if protocol.is_some_and(|p| p.chars().count() > PROTOCOL_MAX) {
            return Err(ReportValidationError::Protocol { max: PROTOCOL_MAX });
        }
        Ok(Self {
            receptor_email: receptor_email.to_owned(),
            file_id,
            title: title.to_owned(),
            protocol: protocol.map(str::to_owned),
        })
    }
}

/// Inbox state of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Unread,
    Archived,
}

impl NotificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unread" => Ok(Self::Unread),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown notification status `{other}`")),
        }
    }
}

/// Inbox entry pointing at a received report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub report_id: Uuid,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub archived_at: Option<DateTime<Utc>>,
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFlowStats {
    pub reports_sent: u64,
    pub reports_viewed: u64,
    pub reports_archived: u64,
    pub receptors: u64,
    pub emissors: u64,
    pub admins: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn drafts_trim_and_drop_blank_protocols() {
        let draft = ReportDraft::new(" ana@x.y ", Uuid::nil(), "  Hemogram ", Some("  "))
            .expect("valid");
        assert_eq!(draft.receptor_email, "ana@x.y");
        assert_eq!(draft.title, "Hemogram");
        assert!(draft.protocol.is_none());
    }

    #[rstest]
    #[case("", "t", None)]
    #[case("a@b", "  ", None)]
    #[case("a@b", "t", Some("p".repeat(PROTOCOL_MAX + 1)))]
    fn invalid_drafts_are_rejected(
        #[case] email: &str,
        #[case] title: &str,
        #[case] protocol: Option<String>,
    ) {
        assert!(ReportDraft::new(email, Uuid::nil(), title, protocol.as_deref()).is_err());
    }

    #[rstest]
    fn participants_are_recognised() {
        let report = Report {
            id: Uuid::new_v4(),
            emissor_id: Uuid::from_u128(1),
            receptor_id: Uuid::from_u128(2),
            file_id: Uuid::new_v4(),
            title: "t".into(),
            protocol: None,
            status: ReportStatus::Sent,
            sent_at: Utc::now(),
            viewed_at: None,
        };
        assert!(report.involves(Uuid::from_u128(1)));
        assert!(report.involves(Uuid::from_u128(2)));
        assert!(!report.involves(Uuid::from_u128(3)));
    }
}
