//! Port for the append-only audit log.
use async_trait::async_trait;

use crate::domain::{AccessContext, AuditFilter, AuditRecord, Error, PageQuery};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by audit adapters.
    pub enum AuditRepositoryError {
        Connection { message: String } => "audit repository connection failed: {message}",
        Query { message: String } => "audit repository query failed: {message}",
    }
}

impl From<AuditRepositoryError> for Error {
    fn from(value: AuditRepositoryError) -> Self {
        match value {
            AuditRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("audit repository unavailable: {message}"))
            }
            AuditRepositoryError::Query { message } => {
                Error::internal(format!("audit repository error: {message}"))
            }
        }
    }
}

/// Port for appending and querying audit records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(
        &self,
        ctx: &AccessContext,
        record: &AuditRecord,
    ) -> Result<(), AuditRepositoryError>;

    /// Matching records, newest first, up to `page.fetch_limit()` rows.
    async fn query(
        &self,
        ctx: &AccessContext,
        filter: &AuditFilter,
        page: &PageQuery,
    ) -> Result<Vec<AuditRecord>, AuditRepositoryError>;
}
