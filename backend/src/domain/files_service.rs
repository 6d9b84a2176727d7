//! File uploads, downloads and deletion.
//!
//! Writes to the byte store go through the circuit breaker so a failing
//! external backend is skipped until its open window expires.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::Paginated;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::circuit_breaker::{CircuitBreaker, CircuitError};
use crate::domain::ports::{FileRepository, FileStorage, FileStorageError, Files};
use crate::domain::{
    AuditAction, AuditEntry, AuditLogger, Caller, Error, FileContent, PageKey, PageQuery,
    StorageBackend, StoredFile, Upload, paginate, storage_key,
};

pub(crate) fn map_storage_error(err: FileStorageError) -> Error {
    match err {
        FileStorageError::NotFound { .. } => Error::not_found("file content not found"),
        FileStorageError::InvalidKey { key } => Error::internal(format!("invalid storage key {key}")),
        FileStorageError::Backend { message } => {
            Error::service_unavailable(format!("file storage unavailable: {message}"))
        }
    }
}

/// Resolve stored metadata to bytes or a redirect to the backend URL.
pub(crate) async fn load_content(
    storage: &dyn FileStorage,
    file: StoredFile,
) -> Result<FileContent, Error> {
    if file.storage_backend == StorageBackend::Cloudinary {
        if let Some(url) = file.public_url.clone() {
            return Ok(FileContent::Redirect { file, url });
        }
    }
    let bytes = storage
        .get(&file.storage_key)
        .await
        .map_err(map_storage_error)?;
    Ok(FileContent::Bytes { file, bytes })
}

/// File service implementing [`Files`].
#[derive(Clone)]
pub struct FilesService {
    files: Arc<dyn FileRepository>,
    storage: Arc<dyn FileStorage>,
    breaker: CircuitBreaker,
    audit: AuditLogger,
    clock: Arc<dyn Clock>,
}

impl FilesService {
    /// Build the service; uploads to `storage` pass through `breaker`.
    pub fn new(
        files: Arc<dyn FileRepository>,
        storage: Arc<dyn FileStorage>,
        breaker: CircuitBreaker,
        audit: AuditLogger,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            files,
            storage,
            breaker,
            audit,
            clock,
        }
    }

    async fn readable_by(&self, caller: &Caller, file: &StoredFile, user_id: Uuid) -> Result<bool, Error> {
        if file.owner_id == user_id || caller.access.is_admin() {
            return Ok(true);
        }
        Ok(self
            .files
            .is_received_by(&caller.access, file.id, user_id)
            .await?)
    }
}

#[async_trait]
impl Files for FilesService {
    async fn upload(&self, caller: &Caller, upload: Upload) -> Result<StoredFile, Error> {
        let owner_id = caller.access.require_user()?;
        let id = Uuid::new_v4();
        let key = storage_key(owner_id, id);
        let stored = self
            .breaker
            .call(|| self.storage.put(&key, &upload.bytes, &upload.content_type))
            .await
            .map_err(|err| match err {
                CircuitError::Open { .. } => {
                    Error::service_unavailable("file storage temporarily unavailable")
                }
                CircuitError::Inner(inner) => map_storage_error(inner),
            })?;

        let file = StoredFile {
            id,
            owner_id,
            size_bytes: i64::try_from(upload.bytes.len()).unwrap_or(i64::MAX),
            original_name: upload.original_name,
            content_type: upload.content_type,
            storage_backend: self.storage.backend(),
            storage_key: stored.key,
            public_url: stored.public_url,
            created_at: self.clock.utc(),
        };
        if let Err(err) = self.files.insert(&caller.access, &file).await {
            if let Err(cleanup) = self.storage.delete(&file.storage_key).await {
                warn!(file_id = %file.id, error = %cleanup, "orphaned stored object");
            }
            return Err(err.into());
        }
        info!(file_id = %file.id, size = file.size_bytes, backend = %file.storage_backend, "file uploaded");
        self.audit
            .record(
                AuditEntry::new(AuditAction::FileUploaded, "file")
                    .actor(Some(owner_id))
                    .resource(file.id)
                    .ip(caller.ip())
                    .metadata(json!({
                        "name": file.original_name,
                        "contentType": file.content_type,
                        "size": file.size_bytes,
                    })),
            )
            .await;
        Ok(file)
    }

    async fn list(&self, caller: &Caller, page: PageQuery) -> Result<Paginated<StoredFile>, Error> {
        let owner_id = caller.access.require_user()?;
        let rows = self
            .files
            .list_by_owner(&caller.access, owner_id, &page)
            .await?;
        Ok(paginate(rows, &page, |file| PageKey::new(file.created_at, file.id)))
    }

    async fn download(&self, caller: &Caller, id: Uuid) -> Result<FileContent, Error> {
        let user_id = caller.access.require_user()?;
        let file = self
            .files
            .find(&caller.access, id)
            .await?
            .ok_or_else(|| Error::not_found("file not found"))?;
        if !self.readable_by(caller, &file, user_id).await? {
            return Err(Error::not_found("file not found"));
        }
        let content = load_content(self.storage.as_ref(), file).await?;
        self.audit
            .record(
                AuditEntry::new(AuditAction::FileDownloaded, "file")
                    .actor(Some(user_id))
                    .resource(id)
                    .ip(caller.ip()),
            )
            .await;
        Ok(content)
    }

    async fn delete(&self, caller: &Caller, id: Uuid) -> Result<(), Error> {
        let owner_id = caller.access.require_user()?;
        let file = self
            .files
            .find(&caller.access, id)
            .await?
            .filter(|file| file.owner_id == owner_id)
            .ok_or_else(|| Error::not_found("file not found"))?;
        if !self.files.delete(&caller.access, id).await? {
            return Err(Error::not_found("file not found"));
        }
        if let Err(err) = self.storage.delete(&file.storage_key).await {
            warn!(file_id = %id, error = %err, "stored object not removed");
        }
        self.audit
            .record(
                AuditEntry::new(AuditAction::FileDeleted, "file")
                    .actor(Some(owner_id))
                    .resource(id)
                    .ip(caller.ip()),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "files_service_tests.rs"]
mod tests;
