//! Port for account persistence.
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{AccessContext, Email, Error, PageQuery, Role, User};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// The email address is already registered.
        DuplicateEmail { email: String } => "email already registered: {email}",
    }
}

impl From<UserRepositoryError> for Error {
    fn from(value: UserRepositoryError) -> Self {
        match value {
            UserRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("user repository unavailable: {message}"))
            }
            UserRepositoryError::Query { message } => {
                Error::internal(format!("user repository error: {message}"))
            }
            UserRepositoryError::DuplicateEmail { .. } => {
                Error::conflict("email already registered")
            }
        }
    }
}

/// Port for account rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account.
    async fn create(&self, ctx: &AccessContext, user: &User) -> Result<(), UserRepositoryError>;

    async fn find_by_id(
        &self,
        ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<User>, UserRepositoryError>;

    async fn find_by_email(
        &self,
        ctx: &AccessContext,
        email: &Email,
    ) -> Result<Option<User>, UserRepositoryError>;

    /// Newest accounts first, optionally filtered by role. Returns up to
    /// `page.fetch_limit()` rows.
    async fn list(
        &self,
        ctx: &AccessContext,
        role: Option<Role>,
        page: &PageQuery,
    ) -> Result<Vec<User>, UserRepositoryError>;

    /// Toggle the active flag, returning the updated account.
    async fn set_active(
        &self,
        ctx: &AccessContext,
        id: Uuid,
        active: bool,
    ) -> Result<Option<User>, UserRepositoryError>;

    /// Account totals per role.
    async fn count_by_role(
        &self,
        ctx: &AccessContext,
    ) -> Result<Vec<(Role, u64)>, UserRepositoryError>;
}
