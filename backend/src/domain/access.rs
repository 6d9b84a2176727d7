//! Caller identity handed to every repository call.
//!
//! The PostgreSQL adapters copy this into the transaction-local settings
//! `app.user_id` and `app.role` so row-level security policies scope rows.

use uuid::Uuid;

use super::{Error, Role};

/// Role attached to an access context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessRole {
    /// A signed-in account.
    User(Role),
    /// Unauthenticated public flows (login, share links) and background jobs.
    System,
}

impl AccessRole {
    /// Value written to `app.role`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User(role) => role.as_str(),
            Self::System => "system",
        }
    }
}

/// Who is acting.
///
/// ```
/// use portal::domain::{AccessContext, Role};
/// use uuid::Uuid;
///
/// let ctx = AccessContext::user(Uuid::nil(), Role::Receptor);
/// assert_eq!(ctx.role_name(), "receptor");
/// assert!(AccessContext::system().user_id().is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessContext {
    user_id: Option<Uuid>,
    role: AccessRole,
}

impl AccessContext {
    /// Context for a signed-in account.
    pub fn user(user_id: Uuid, role: Role) -> Self {
        Self {
            user_id: Some(user_id),
            role: AccessRole::User(role),
        }
    }

    /// Context for public flows and background work.
    pub fn system() -> Self {
        Self {
            user_id: None,
            role: AccessRole::System,
        }
    }

    /// Account id, absent for the system context.
    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn role(&self) -> AccessRole {
        self.role
    }

    /// Role as written to `app.role` for row-level security.
    pub fn role_name(&self) -> &'static str {
        self.role.as_str()
    }

    /// Value written to `app.user_id`; empty for the system context.
    pub fn user_id_setting(&self) -> String {
        self.user_id.map(|id| id.to_string()).unwrap_or_default()
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, AccessRole::User(Role::Admin))
    }

    /// Whether this is a signed-in account holding `role`.
    pub fn has_role(&self, role: Role) -> bool {
        self.role == AccessRole::User(role)
    }

    /// Signed-in user id or `401`.
    pub fn require_user(&self) -> Result<Uuid, Error> {
        self.user_id
            .ok_or_else(|| Error::unauthorized("login required"))
    }

    /// Signed-in user id when the caller holds `role`, otherwise `403`.
    pub fn require_role(&self, role: Role) -> Result<Uuid, Error> {
        let id = self.require_user()?;
        if self.has_role(role) {
            Ok(id)
        } else {
            Err(Error::forbidden(format!("{} role required", role.as_str())))
        }
    }
}

/// Access context plus request metadata used for auditing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub access: AccessContext,
    pub ip: Option<String>,
}

impl Caller {
    /// Caller acting under `access` from the client address `ip`.
    pub fn new(access: AccessContext, ip: Option<String>) -> Self {
        Self { access, ip }
    }

    /// Anonymous caller for public endpoints.
    pub fn anonymous(ip: Option<String>) -> Self {
        Self::new(AccessContext::system(), ip)
    }

    /// Client address recorded in audit entries.
    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    fn system_context_has_no_user_setting() {
        assert_eq!(AccessContext::system().user_id_setting(), "");
        assert_eq!(AccessContext::system().role_name(), "system");
    }

    #[rstest]
    #[case(Role::Receptor, Role::Emissor, Some(ErrorCode::Forbidden))]
    #[case(Role::Emissor, Role::Emissor, None)]
    fn role_checks(#[case] held: Role, #[case] wanted: Role, #[case] error: Option<ErrorCode>) {
        let ctx = AccessContext::user(Uuid::new_v4(), held);
        assert_eq!(ctx.require_role(wanted).err().map(|e| e.code()), error);
    }

    #[rstest]
    fn system_context_is_unauthorised_for_user_operations() {
        let err = AccessContext::system()
            .require_role(Role::Admin)
            .expect_err("system is not a user");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
    }
}
