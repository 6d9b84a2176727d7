//! Portal accounts: roles, validated identity fields, and password hashes.

use std::fmt;
use std::str::FromStr;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use zeroize::Zeroizing;

/// Minimum display name length in characters.
pub const DISPLAY_NAME_MIN: usize = 2;
/// Maximum display name length in characters.
pub const DISPLAY_NAME_MAX: usize = 80;
/// Minimum password length in characters.
pub const PASSWORD_MIN: usize = 8;

/// Validation failures for account fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    #[error("email must look like local@domain")]
    InvalidEmail,
    #[error("display name must be between {min} and {max} characters")]
    DisplayNameLength { min: usize, max: usize },
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("unknown role `{0}`")]
    UnknownRole(String),
}

/// Account role. Row-level security policies key off the same strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Patient receiving reports.
    Receptor,
    /// Lab issuing reports.
    Emissor,
    /// Portal administrator.
    Admin,
}

impl Role {
    /// Stable storage and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Receptor => "receptor",
            Self::Emissor => "emissor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UserValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receptor" => Ok(Self::Receptor),
            "emissor" => Ok(Self::Emissor),
            "admin" => Ok(Self::Admin),
            other => Err(UserValidationError::UnknownRole(other.to_owned())),
        }
    }
}

/// Lower-cased email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Trim, lower-case and validate an address.
    pub fn parse(raw: &str) -> Result<Self, UserValidationError> {
        let normalised = raw.trim().to_lowercase();
        let mut parts = normalised.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(UserValidationError::InvalidEmail);
        };
        if local.is_empty() || domain.is_empty() || normalised.chars().any(char::is_whitespace) {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(normalised))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

/// Trimmed display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Trim and validate a display name.
    ///
    /// # Errors
    /// Returns [`UserValidationError`] when the name is too short or too long.
    pub fn parse(raw: &str) -> Result<Self, UserValidationError> {
        let trimmed = raw.trim();
        let length = trimmed.chars().count();
        if !(DISPLAY_NAME_MIN..=DISPLAY_NAME_MAX).contains(&length) {
            return Err(UserValidationError::DisplayNameLength {
                min: DISPLAY_NAME_MIN,
                max: DISPLAY_NAME_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

/// Plaintext password held only long enough to hash or verify it.
#[derive(Clone)]
pub struct Password(Zeroizing<String>);

impl Password {
    /// Accept a password for registration, enforcing the minimum length.
    pub fn new(raw: &str) -> Result<Self, UserValidationError> {
        if raw.chars().count() < PASSWORD_MIN {
            return Err(UserValidationError::PasswordTooShort { min: PASSWORD_MIN });
        }
        Ok(Self(Zeroizing::new(raw.to_owned())))
    }

    /// Accept a password for verification without length checks.
    pub fn for_login(raw: &str) -> Self {
        Self(Zeroizing::new(raw.to_owned()))
    }

    /// Produce an Argon2id PHC string.
    pub fn hash(&self) -> Result<PasswordDigest, PasswordHashError> {
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt)
            .map_err(|err| PasswordHashError(err.to_string()))?;
        let digest = Argon2::default()
            .hash_password(self.0.as_bytes(), &salt)
            .map_err(|err| PasswordHashError(err.to_string()))?;
        Ok(PasswordDigest(digest.to_string()))
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(..)")
    }
}

/// Failure while hashing a password.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(String);

/// Stored Argon2 PHC string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Wrap a PHC string loaded from storage.
    pub fn from_stored(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time verification; malformed digests never match.
    pub fn verify(&self, password: &Password) -> bool {
        PasswordHash::new(&self.0)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.0.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

/// Persisted account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: Email,
    pub display_name: DisplayName,
    pub role: Role,
    pub active: bool,
    pub password: PasswordDigest,
    pub created_at: DateTime<Utc>,
}

/// Validated registration request.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: Email,
    pub display_name: DisplayName,
    pub role: Role,
    pub password: Password,
}

impl Registration {
    /// Validate raw registration fields. Only receptor and emissor
    /// accounts may self-register.
    pub fn try_from_parts(
        email: &str,
        password: &str,
        display_name: &str,
        role: Role,
    ) -> Result<Self, RegistrationError> {
        if role == Role::Admin {
            return Err(RegistrationError::AdminSelfRegistration);
        }
        Ok(Self {
            email: Email::parse(email).map_err(RegistrationError::Field)?,
            display_name: DisplayName::parse(display_name).map_err(RegistrationError::Field)?,
            role,
            password: Password::new(password).map_err(RegistrationError::Field)?,
        })
    }
}

/// Reasons a registration payload is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Field(UserValidationError),
    #[error("admin accounts cannot self-register")]
    AdminSelfRegistration,
}
