//! Port for share link persistence.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{AccessContext, Error, ShareLink};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by share link adapters.
    pub enum ShareLinkRepositoryError {
        Connection { message: String } => "share link repository connection failed: {message}",
        Query { message: String } => "share link repository query failed: {message}",
    }
}

impl From<ShareLinkRepositoryError> for Error {
    fn from(value: ShareLinkRepositoryError) -> Self {
        match value {
            ShareLinkRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("share link repository unavailable: {message}"))
            }
            ShareLinkRepositoryError::Query { message } => {
                Error::internal(format!("share link repository error: {message}"))
            }
        }
    }
}

/// Port for share links, looked up by token hash.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShareLinkRepository: Send + Sync {
    async fn create(&self, ctx: &AccessContext, link: &ShareLink)
    -> Result<(), ShareLinkRepositoryError>;

    /// Owner's links, newest first.
    async fn list(
        &self,
        ctx: &AccessContext,
        owner_id: Uuid,
    ) -> Result<Vec<ShareLink>, ShareLinkRepositoryError>;

    async fn find(
        &self,
        ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<ShareLink>, ShareLinkRepositoryError>;

    async fn find_by_token_hash(
        &self,
        ctx: &AccessContext,
        token_hash: &str,
    ) -> Result<Option<ShareLink>, ShareLinkRepositoryError>;

    /// Set `revoked_at` unless already revoked; returns the stored link.
    async fn revoke(
        &self,
        ctx: &AccessContext,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<ShareLink>, ShareLinkRepositoryError>;

    /// Atomically count one access when the link is still usable at `now`.
    /// Returns the updated link, or `None` when it is unusable.
    async fn record_access(
        &self,
        ctx: &AccessContext,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ShareLink>, ShareLinkRepositoryError>;

    /// Revoke every unrevoked link expired at `now`; returns how many.
    async fn revoke_expired(
        &self,
        ctx: &AccessContext,
        now: DateTime<Utc>,
    ) -> Result<u64, ShareLinkRepositoryError>;
}
