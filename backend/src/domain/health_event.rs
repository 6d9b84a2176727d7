//! Calendar entries receptors keep about their own care.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Longest accepted event title.
pub const EVENT_TITLE_MAX: usize = 200;
/// Longest accepted event description.
pub const EVENT_DESCRIPTION_MAX: usize = 4000;
/// Most files attachable to one event.
pub const EVENT_FILES_MAX: usize = 20;

/// Category of a health event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Consultation,
    Exam,
    Procedure,
    Vaccination,
    Other,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Consultation => "consultation",
            Self::Exam => "exam",
            Self::Procedure => "procedure",
            Self::Vaccination => "vaccination",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consultation" => Ok(Self::Consultation),
            "exam" => Ok(Self::Exam),
            "procedure" => Ok(Self::Procedure),
            "vaccination" => Ok(Self::Vaccination),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown event kind `{other}`")),
        }
    }
}

/// Persisted health event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthEvent {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub kind: EventKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub professional_id: Option<Uuid>,
    pub file_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Health event validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventValidationError {
    #[error("title must be 1..={max} characters")]
    Title { max: usize },
    #[error("description must be at most {max} characters")]
    Description { max: usize },
    #[error("event must not end before it starts")]
    EndsBeforeStart,
    #[error("at most {max} files may be attached")]
    TooManyFiles { max: usize },
}

/// Validated fields for creating or replacing an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub kind: EventKind,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub professional_id: Option<Uuid>,
    pub file_ids: Vec<Uuid>,
}

impl EventDraft {
    /// Validate the draft. Duplicate file ids collapse to one while keeping
    /// first-seen order.
    pub fn new(
        title: &str,
        description: Option<&str>,
        kind: EventKind,
        starts_at: DateTime<Utc>,
        ends_at: Option<DateTime<Utc>>,
        professional_id: Option<Uuid>,
        file_ids: Vec<Uuid>,
    ) -> Result<Self, EventValidationError> {
        let title = title.trim();
        if title.is_empty() || title.chars().count() > EVENT_TITLE_MAX {
            return Err(EventValidationError::Title {
                max: EVENT_TITLE_MAX,
            });
        }
        let description = description.map(str::trim).filter(|d| !d.is_empty());
        if description.is_some_and(|d| d.chars().count() > EVENT_DESCRIPTION_MAX) {
            return Err(EventValidationError::Description {
                max: EVENT_DESCRIPTION_MAX,
            });
        }
        if ends_at.is_some_and(|end| end < starts_at) {
            return Err(EventValidationError::EndsBeforeStart);
        }
        let mut unique = Vec::with_capacity(file_ids.len());
        for id in file_ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.len() > EVENT_FILES_MAX {
            return Err(EventValidationError::TooManyFiles {
                max: EVENT_FILES_MAX,
            });
        }
        Ok(Self {
            title: title.to_owned(),
            description: description.map(str::to_owned),
            kind,
            starts_at,
            ends_at,
            professional_id,
            file_ids: unique,
        })
    }

    /// Attach one more file unless already present.
    pub fn attach(&mut self, file_id: Uuid) {
        if !self.file_ids.contains(&file_id) {
            self.file_ids.push(file_id);
        }
    }
}

/// Inclusive time range filter for listing events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl EventRange {
    /// Whether `at` falls inside the range; open ends are unbounded.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| at >= from) && self.to.is_none_or(|to| at <= to)
    }
}
