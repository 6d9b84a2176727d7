//! Port for file metadata persistence.
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{AccessContext, Error, PageQuery, StoredFile};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by file repository adapters.
    pub enum FileRepositoryError {
        Connection { message: String } => "file repository connection failed: {message}",
        Query { message: String } => "file repository query failed: {message}",
        /// The file backs a report and cannot be removed.
        InUse { id: Uuid } => "file {id} is referenced by a report",
    }
}

impl From<FileRepositoryError> for Error {
    fn from(value: FileRepositoryError) -> Self {
        match value {
            FileRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("file repository unavailable: {message}"))
            }
            FileRepositoryError::Query { message } => {
                Error::internal(format!("file repository error: {message}"))
            }
            FileRepositoryError::InUse { .. } => {
                Error::conflict("file is attached to a sent report")
            }
        }
    }
}

/// Port for stored-file metadata.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn insert(&self, ctx: &AccessContext, file: &StoredFile)
    -> Result<(), FileRepositoryError>;

    async fn find(
        &self,
        ctx: &AccessContext,
        id: Uuid,
    ) -> Result<Option<StoredFile>, FileRepositoryError>;

    /// Fetch several files at once; unknown ids are skipped.
    async fn find_many(
        &self,
        ctx: &AccessContext,
        ids: &[Uuid],
    ) -> Result<Vec<StoredFile>, FileRepositoryError>;

    /// Owner's files, newest first, up to `page.fetch_limit()` rows.
    async fn list_by_owner(
        &self,
        ctx: &AccessContext,
        owner_id: Uuid,
        page: &PageQuery,
    ) -> Result<Vec<StoredFile>, FileRepositoryError>;

    /// Whether `user_id` received a report backed by the file.
    async fn is_received_by(
        &self,
        ctx: &AccessContext,
        file_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, FileRepositoryError>;

    /// Remove metadata. Fails with `InUse` when a report references the
    /// file; returns `false` when nothing was deleted.
    async fn delete(&self, ctx: &AccessContext, id: Uuid) -> Result<bool, FileRepositoryError>;
}
