//! Health professionals a receptor keeps on file.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Email;

const NAME_MAX: usize = 120;
const SPECIALTY_MAX: usize = 120;
const REGISTRY_MAX: usize = 40;
const PHONE_MAX: usize = 32;

/// A contact in a receptor's list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Professional {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub specialty: String,
    pub registry_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Reasons a professional draft is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfessionalValidationError {
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("name must not be empty")]
    EmptyName,
    #[error("email is not valid")]
    Email,
}

/// Validated contact card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfessionalDraft {
    pub name: String,
    pub specialty: String,
    pub registry_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

fn optional(
    value: Option<&str>,
    field: &'static str,
    max: usize,
) -> Result<Option<String>, ProfessionalValidationError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if v.chars().count() > max => Err(ProfessionalValidationError::TooLong { field, max }),
        other => Ok(other.map(str::to_owned)),
    }
}

impl ProfessionalDraft {
    /// Validate and trim a draft.
    ///
    /// # Errors
    /// Returns [`ProfessionalValidationError`] for blank or overlong fields.
    pub fn new(
        name: &str,
        specialty: &str,
        registry_number: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Result<Self, ProfessionalValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfessionalValidationError::EmptyName);
        }
        if name.chars().count() > NAME_MAX {
            return Err(ProfessionalValidationError::TooLong {
                field: "name",
                max: NAME_MAX,
            });
        }
        let specialty = optional(Some(specialty), "specialty", SPECIALTY_MAX)?.unwrap_or_default();
        let email = optional(email, "email", 254)?
            .map(|raw| Email::parse(&raw).map(String::from))
            .transpose()
            .map_err(|_| ProfessionalValidationError::Email)?;
        Ok(Self {
            name: name.to_owned(),
            specialty,
            registry_number: optional(registry_number, "registryNumber", REGISTRY_MAX)?,
            phone: optional(phone, "phone", PHONE_MAX)?,
            email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn blank_optionals_become_none() {
        let draft = ProfessionalDraft::new("Dr. Lima", "Cardiology", Some(" "), None, Some(""))
            .expect("valid");
        assert!(draft.registry_number.is_none());
        assert!(draft.email.is_none());
    }

    #[rstest]
    fn emails_are_normalised() {
        let draft = ProfessionalDraft::new("Dr. Lima", "", None, None, Some(" Lima@Clinic.Example"))
            .expect("valid");
        assert_eq!(draft.email.as_deref(), Some("lima@clinic.example"));
    }

    #[rstest]
    #[case("  ", ProfessionalValidationError::EmptyName)]
    fn names_are_required(#[case] name: &str, #[case] expected: ProfessionalValidationError) {
        assert_eq!(ProfessionalDraft::new(name, "", None, None, None), Err(expected));
    }

    #[rstest]
    fn bad_emails_are_rejected() {
        assert_eq!(
            ProfessionalDraft::new("Dr. Lima", "", None, None, Some("nope")),
            Err(ProfessionalValidationError::Email)
        );
    }
}
