//! Opaque cursor and pagination envelope primitives.
//!
//! List endpoints page through rows ordered by a stable key (typically
//! `(created_at, id)`). The key of the last row on a page is serialised to
//! JSON and encoded as unpadded base64url so clients treat it as an opaque
//! token.
//!
//! ```
//! use pagination::{Cursor, PageRequest, Paginated};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Key {
//!     id: u32,
//! }
//!
//! let token = Cursor::new(Key { id: 7 }).encode().expect("encodes");
//! let request = PageRequest::<Key>::parse(Some(&token), Some(10)).expect("valid request");
//! assert_eq!(request.cursor().map(|key| key.id), Some(7));
//!
//! let page = Paginated::from_overfetched(vec![1, 2, 3], 2, |item| Key { id: *item });
//! assert_eq!(page.data, vec![1, 2]);
//! assert!(page.next_cursor.is_some());
//! ```

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default number of items per page when the client does not ask.
pub const DEFAULT_LIMIT: usize = 20;
/// Largest page size a client may request.
pub const MAX_LIMIT: usize = 100;

/// Errors raised while decoding cursors or validating page requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    /// The cursor is not valid base64url.
    #[error("cursor is not valid base64url")]
    InvalidEncoding,
    /// The cursor decoded but did not contain the expected key.
    #[error("cursor payload is malformed: {message}")]
    InvalidPayload {
        /// Decoder message.
        message: String,
    },
    /// The requested page size is outside `1..=MAX_LIMIT`.
    #[error("limit must be between 1 and {max}, got {requested}")]
    InvalidLimit {
        /// Requested limit.
        requested: usize,
        /// Upper bound.
        max: usize,
    },
}

/// Ordering key wrapped for transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor<K> {
    key: K,
}

impl<K> Cursor<K> {
    /// Wrap an ordering key.
    pub const fn new(key: K) -> Self {
        Self { key }
    }

    /// Borrow the ordering key.
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Unwrap the ordering key.
    pub fn into_key(self) -> K {
        self.key
    }
}

impl<K: Serialize> Cursor<K> {
    /// Encode the key as an opaque token.
    ///
    /// # Errors
    /// Returns [`PaginationError::InvalidPayload`] when the key cannot be
    /// serialised to JSON.
    pub fn encode(&self) -> Result<String, PaginationError> {
        let json = serde_json::to_vec(&self.key).map_err(|err| PaginationError::InvalidPayload {
            message: err.to_string(),
        })?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }
}

impl<K: DeserializeOwned> Cursor<K> {
    /// Decode an opaque token produced by [`Cursor::encode`].
    ///
    /// # Errors
    /// Returns [`PaginationError::InvalidEncoding`] for non-base64 input and
    /// [`PaginationError::InvalidPayload`] when the JSON does not match `K`.
    pub fn decode(token: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| PaginationError::InvalidEncoding)?;
        let key = serde_json::from_slice(&bytes).map_err(|err| PaginationError::InvalidPayload {
            message: err.to_string(),
        })?;
        Ok(Self { key })
    }
}

/// Validated page request: optional decoded cursor plus a bounded limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<K> {
    cursor: Option<K>,
    limit: usize,
}

impl<K> PageRequest<K> {
    /// First page with the default limit.
    pub const fn first() -> Self {
        Self {
            cursor: None,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Build a request from an already-decoded key.
    ///
    /// # Errors
    /// Returns [`PaginationError::InvalidLimit`] when `limit` is out of range.
    pub fn new(cursor: Option<K>, limit: usize) -> Result<Self, PaginationError> {
        if limit == 0 || limit > MAX_LIMIT {
            return Err(PaginationError::InvalidLimit {
                requested: limit,
                max: MAX_LIMIT,
            });
        }
        Ok(Self { cursor, limit })
    }

    /// Decoded ordering key of the last row already seen, if any.
    pub const fn cursor(&self) -> Option<&K> {
        self.cursor.as_ref()
    }

    /// Maximum number of rows to return.
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Number of rows adapters should fetch to detect a following page.
    pub const fn fetch_limit(&self) -> usize {
        self.limit.saturating_add(1)
    }
}

impl<K: DeserializeOwned> PageRequest<K> {
    /// Parse raw query parameters.
    ///
    /// # Errors
    /// Propagates cursor decoding failures and rejects out-of-range limits.
    pub fn parse(cursor: Option<&str>, limit: Option<usize>) -> Result<Self, PaginationError> {
        let key = cursor
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| Cursor::<K>::decode(raw).map(Cursor::into_key))
            .transpose()?;
        Self::new(key, limit.unwrap_or(DEFAULT_LIMIT))
    }
}

impl<K> Default for PageRequest<K> {
    fn default() -> Self {
        Self::first()
    }
}

/// Page envelope returned by list endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// Items on this page.
    pub data: Vec<T>,
    /// Token for the following page, absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_cursor: Option<String>,
}

impl<T> Paginated<T> {
    /// Page with no following page.
    pub const fn last(data: Vec<T>) -> Self {
        Self {
            data,
            next_cursor: None,
        }
    }

    /// Build a page from `limit + 1` fetched rows.
    ///
    /// When more than `limit` rows are supplied the surplus is dropped and the
    /// key of the last retained row becomes the next cursor. A key that fails
    /// to encode ends pagination rather than failing the request.
    pub fn from_overfetched<K, F>(mut rows: Vec<T>, limit: usize, key_of: F) -> Self
    where
        K: Serialize,
        F: Fn(&T) -> K,
    {
        if rows.len() <= limit {
            return Self::last(rows);
        }
        rows.truncate(limit);
        let next_cursor = rows
            .last()
            .and_then(|row| Cursor::new(key_of(row)).encode().ok());
        Self {
            data: rows,
            next_cursor,
        }
    }

    /// Convert the items while keeping the cursor.
    pub fn map<U, F>(self, f: F) -> Paginated<U>
    where
        F: FnMut(T) -> U,
    {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }

    /// Absolute link to the following page, preserving other query pairs.
    pub fn next_link(&self, current: &Url) -> Option<Url> {
        let cursor = self.next_cursor.as_deref()?;
        let retained: Vec<(String, String)> = current
            .query_pairs()
            .filter(|(name, _)| name != "cursor")
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        let mut next = current.clone();
        next.query_pairs_mut()
            .clear()
            .extend_pairs(retained)
            .append_pair("cursor", cursor);
        Some(next)
    }
}
