//! Time-limited public links to a set of files.
//!
//! The plaintext token is returned once at creation. Only its SHA-256 digest
//! is persisted, so lookups hash the presented token first.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Most files one link may expose.
pub const SHARE_FILES_MAX: usize = 20;
/// Shortest link lifetime in hours.
pub const SHARE_HOURS_MIN: u32 = 1;
/// Longest link lifetime in hours (7 days).
pub const SHARE_HOURS_MAX: u32 = 24 * 7;
const TOKEN_BYTES: usize = 32;

/// Persisted link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub token_hash: String,
    pub file_ids: Vec<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub max_accesses: Option<u32>,
    pub access_count: u32,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ShareLink {
    /// Whether the link may still be resolved at `now`.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none()
            && self.expires_at > now
            && self.max_accesses.is_none_or(|max| self.access_count < max)
    }
}

/// Reasons a share-link draft is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShareLinkValidationError {
    #[error("a link must expose between 1 and {max} files")]
    FileCount { max: usize },
    #[error("expiry must be between {min} and {max} hours")]
    Lifetime { min: u32, max: u32 },
    #[error("maxAccesses must be at least 1")]
    MaxAccesses,
}

/// Validated link request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinkDraft {
    pub file_ids: Vec<Uuid>,
    pub lifetime: Duration,
    pub max_accesses: Option<u32>,
}

impl ShareLinkDraft {
    /// Validate a draft.
    ///
    /// # Errors
    /// Returns [`ShareLinkValidationError`] for an empty or oversized file list,
    /// an out-of-range lifetime or a zero access cap.
    pub fn new(
        file_ids: Vec<Uuid>,
        expires_in_hours: u32,
        max_accesses: Option<u32>,
    ) -> Result<Self, ShareLinkValidationError> {
        let mut unique: Vec<Uuid> = Vec::with_capacity(file_ids.len());
        for id in file_ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() || unique.len() > SHARE_FILES_MAX {
            return Err(ShareLinkValidationError::FileCount {
                max: SHARE_FILES_MAX,
            });
        }
        if !(SHARE_HOURS_MIN..=SHARE_HOURS_MAX).contains(&expires_in_hours) {
            return Err(ShareLinkValidationError::Lifetime {
                min: SHARE_HOURS_MIN,
                max: SHARE_HOURS_MAX,
            });
        }
        if max_accesses == Some(0) {
            return Err(ShareLinkValidationError::MaxAccesses);
        }
        Ok(Self {
            file_ids: unique,
            lifetime: Duration::hours(i64::from(expires_in_hours)),
            max_accesses,
        })
    }
}

/// Newly created link with its one-time plaintext token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedShareLink {
    pub link: ShareLink,
    pub token: ShareToken,
    pub url: String,
}

/// Public view of a resolved link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedBundle {
    pub link: ShareLink,
    pub files: Vec<super::StoredFile>,
}

/// Plaintext share token. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct ShareToken(String);

impl ShareToken {
    /// 32 random bytes, hex encoded.
    pub fn generate() -> Self {
        let mut bytes = [0_u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a token presented by a client.
    pub fn presented(raw: &str) -> Self {
        Self(raw.trim().to_owned())
    }

    /// Plaintext token handed to the link owner once.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex SHA-256 digest stored in place of the token.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl std::fmt::Debug for ShareToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ShareToken(..)")
    }
}
