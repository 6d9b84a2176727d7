//! Uploaded file metadata and upload validation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Content types accepted for upload.
pub const ALLOWED_CONTENT_TYPES: [&str; 5] = [
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/webp",
    "text/plain",
];

/// Longest accepted original file name, in characters.
pub const FILE_NAME_MAX: usize = 255;

/// Where the bytes of a file live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Local,
    Cloudinary,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloudinary => "cloudinary",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "cloudinary" => Ok(Self::Cloudinary),
            other => Err(format!("unknown storage backend `{other}`")),
        }
    }
}

/// Persisted file metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_backend: StorageBackend,
    pub storage_key: String,
    pub public_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Reasons an upload is refused before reaching storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadValidationError {
    #[error("file is empty")]
    Empty,
    #[error("file exceeds {max} bytes")]
    TooLarge { max: usize },
    #[error("content type `{0}` is not allowed")]
    ContentType(String),
    #[error("file name must be 1..={max} characters without path separators")]
    Name { max: usize },
}

/// Validated upload headed for storage.
#[derive(Debug, Clone)]
pub struct Upload {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Check name, content type and size. Content type parameters such as
    /// `; charset=utf-8` are dropped.
    pub fn validate(
        original_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
        max_bytes: usize,
    ) -> Result<Self, UploadValidationError> {
        let name = original_name.trim();
        if name.is_empty()
            || name.chars().count() > FILE_NAME_MAX
            || name.contains(['/', '\\'])
            || name.chars().any(char::is_control)
        {
            return Err(UploadValidationError::Name { max: FILE_NAME_MAX });
        }
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !ALLOWED_CONTENT_TYPES.contains(&essence.as_str()) {
            return Err(UploadValidationError::ContentType(essence));
        }
        if bytes.is_empty() {
            return Err(UploadValidationError::Empty);
        }
        if bytes.len() > max_bytes {
            return Err(UploadValidationError::TooLarge { max: max_bytes });
        }
        Ok(Self {
            original_name: name.to_owned(),
            content_type: essence,
            bytes,
        })
    }
}

/// What a download resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Bytes served by the portal.
    Bytes { file: StoredFile, bytes: Vec<u8> },
    /// The backend serves the file itself; redirect the client.
    Redirect { file: StoredFile, url: String },
}

impl FileContent {
    /// Metadata of the file being served.
    pub fn file(&self) -> &StoredFile {
        match self {
            Self::Bytes { file, .. } | Self::Redirect { file, .. } => file,
        }
    }
}

/// Storage key for a file: `<owner>/<file-id>`.
pub fn storage_key(owner_id: Uuid, file_id: Uuid) -> String {
    format!("{owner_id}/{file_id}")
}
