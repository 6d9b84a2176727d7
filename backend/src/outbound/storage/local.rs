//! Filesystem storage rooted in one capability-scoped directory.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};

use crate::domain::StorageBackend;
use crate::domain::ports::{FileStorage, FileStorageError, StoredObject};

/// Stores objects as files under `root/<owner>/<file-id>`.
///
/// All access goes through a `cap_std` [`Dir`], so a key can never reach
/// outside the root even if validation were bypassed.
#[derive(Clone)]
pub struct LocalFileStorage {
    root: Arc<Dir>,
}

impl LocalFileStorage {
    /// Open (creating if needed) the storage root.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        Dir::create_ambient_dir_all(root, ambient_authority())?;
        let dir = Dir::open_ambient_dir(root, ambient_authority())?;
        Ok(Self {
            root: Arc::new(dir),
        })
    }

    async fn blocking<T, F>(&self, key: &str, op: F) -> Result<T, FileStorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Dir, &Path) -> io::Result<T> + Send + 'static,
    {
        let path = validate_key(key)?;
        let root = Arc::clone(&self.root);
        let owned_key = key.to_owned();
        tokio::task::spawn_blocking(move || op(&root, &path))
            .await
            .map_err(|err| FileStorageError::backend(err.to_string()))?
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => FileStorageError::not_found(owned_key),
                _ => FileStorageError::backend(err.to_string()),
            })
    }
}

/// Keys are `/`-separated segments of ASCII alphanumerics and dashes.
fn validate_key(key: &str) -> Result<PathBuf, FileStorageError> {
    let valid = !key.is_empty()
        && key.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    if valid {
        Ok(key.split('/').collect())
    } else {
        Err(FileStorageError::invalid_key(key))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Local
    }

    async fn put(
        &self,
        key: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<StoredObject, FileStorageError> {
        let bytes = bytes.to_vec();
        self.blocking(key, move |root, path| {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                root.create_dir_all(parent)?;
            }
            root.write(path, bytes)
        })
        .await?;
        Ok(StoredObject {
            key: key.to_owned(),
            public_url: None,
        })
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, FileStorageError> {
        self.blocking(key, |root, path| root.read(path)).await
    }

    async fn delete(&self, key: &str) -> Result<(), FileStorageError> {
        self.blocking(key, |root, path| match root.remove_file(path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn storage() -> (TempDir, LocalFileStorage) {
        let dir = TempDir::new().expect("tempdir");
        let storage = LocalFileStorage::open(dir.path()).expect("open");
        (dir, storage)
    }

    #[rstest]
    #[tokio::test]
    async fn put_then_get_returns_the_bytes(storage: (TempDir, LocalFileStorage)) {
        let (_dir, storage) = storage;
        let stored = storage
            .put("owner-1/file-1", b"%PDF", "application/pdf")
            .await
            .expect("put");
        assert_eq!(stored.public_url, None);
        assert_eq!(storage.get("owner-1/file-1").await.expect("get"), b"%PDF");
    }

    #[rstest]
    #[tokio::test]
    async fn missing_objects_are_not_found(storage: (TempDir, LocalFileStorage)) {
        let (_dir, storage) = storage;
        let err = storage.get("owner-1/nope").await.expect_err("missing");
        assert!(matches!(err, FileStorageError::NotFound { .. }));
        storage.delete("owner-1/nope").await.expect("idempotent delete");
    }

    #[rstest]
    #[case("../etc/passwd")]
    #[case("/abs")]
    #[case("a//b")]
    #[case("a/b.txt")]
    #[case("")]
    #[tokio::test]
    async fn escaping_keys_are_rejected(
        storage: (TempDir, LocalFileStorage),
        #[case] key: &str,
    ) {
        let (_dir, storage) = storage;
        let err = storage.put(key, b"x", "text/plain").await.expect_err("invalid");
        assert!(matches!(err, FileStorageError::InvalidKey { .. }));
    }
}
