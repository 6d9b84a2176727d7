//! Driving ports for account registration, login, and administration.
use async_trait::async_trait;
use pagination::Paginated;
use uuid::Uuid;

use crate::domain::{
    AuditFilter, AuditRecord, Caller, DocumentFlowStats, Error, PageQuery, Password, Registration,
    Role, User,
};

/// Driving port for registration, login and the current account.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Accounts: Send + Sync {
    /// Create a receptor or emissor account.
    async fn register(&self, caller: &Caller, registration: Registration) -> Result<User, Error>;

    /// Verify credentials. Every failure reads `invalid credentials`.
    async fn login(&self, caller: &Caller, email: &str, password: Password) -> Result<User, Error>;

    /// The signed-in account; inactive accounts are treated as signed out.
    async fn current_user(&self, caller: &Caller) -> Result<User, Error>;
}

/// Driving port for admin-only account and audit operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Administration: Send + Sync {
    async fn list_users(
        &self,
        caller: &Caller,
        role: Option<Role>,
        page: PageQuery,
    ) -> Result<Paginated<User>, Error>;

    /// Activate or deactivate an account. Admins may not deactivate
    /// themselves.
    async fn set_active(&self, caller: &Caller, user_id: Uuid, active: bool)
    -> Result<User, Error>;

    async fn audit_log(
        &self,
        caller: &Caller,
        filter: AuditFilter,
        page: PageQuery,
    ) -> Result<Paginated<AuditRecord>, Error>;

    async fn document_flow_stats(&self, caller: &Caller) -> Result<DocumentFlowStats, Error>;
}
