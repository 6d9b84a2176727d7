//! Port for the byte store holding uploaded files.
use async_trait::async_trait;

use crate::domain::StorageBackend;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by storage adapters.
    pub enum FileStorageError {
        /// The key is malformed or escapes the storage root.
        InvalidKey { key: String } => "invalid storage key: {key}",
        /// No object stored under the key.
        NotFound { key: String } => "no stored object for {key}",
        /// The backend failed or rejected the request.
        Backend { message: String } => "file storage failure: {message}",
    }
}

/// Result of a successful `put`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    /// Download URL for backends that serve files themselves.
    pub public_url: Option<String>,
}

/// Port for the blob store holding file contents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    fn backend(&self) -> StorageBackend;

    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredObject, FileStorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, FileStorageError>;

    /// Remove the object; deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), FileStorageError>;
}
