//! Keyset pagination key shared by every newest-first listing.

use chrono::{DateTime, Utc};
use pagination::{PageRequest, Paginated, PaginationError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::Error;

/// Ordering key `(timestamp, id)`; listings sort by both descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageKey {
    pub at: DateTime<Utc>,
    pub id: Uuid,
}

impl PageKey {
    /// Key for the row created at `at` with id `id`.
    pub fn new(at: DateTime<Utc>, id: Uuid) -> Self {
        Self { at, id }
    }

    /// Whether a row keyed `(at, id)` sorts after this cursor in a
    /// newest-first listing.
    pub fn precedes(&self, at: DateTime<Utc>, id: Uuid) -> bool {
        (at, id) < (self.at, self.id)
    }
}

/// Page request over [`PageKey`].
pub type PageQuery = PageRequest<PageKey>;

/// Trim rows fetched with [`PageRequest::fetch_limit`] into a page.
pub fn paginate<T>(rows: Vec<T>, page: &PageQuery, key_of: impl Fn(&T) -> PageKey) -> Paginated<T> {
    Paginated::from_overfetched(rows, page.limit(), key_of)
}

/// Parse raw `cursor`/`limit` query parameters.
pub fn page_query(cursor: Option<&str>, limit: Option<usize>) -> Result<PageQuery, Error> {
    PageQuery::parse(cursor, limit).map_err(|err| {
        let field = match err {
            PaginationError::InvalidLimit { .. } => "limit",
            PaginationError::InvalidEncoding | PaginationError::InvalidPayload { .. } => "cursor",
        };
        Error::invalid_request(err.to_string()).with_details(json!({
            "field": field,
            "code": format!("invalid_{field}"),
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    fn bad_limits_point_at_the_limit_field() {
        let err = page_query(None, Some(500)).expect_err("too large");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.details().and_then(|d| d.get("field")), Some(&json!("limit")));
    }

    #[rstest]
    fn bad_cursors_point_at_the_cursor_field() {
        let err = page_query(Some("!!"), None).expect_err("garbage");
        assert_eq!(err.details().and_then(|d| d.get("field")), Some(&json!("cursor")));
    }

    #[rstest]
    fn older_rows_follow_the_cursor() {
        let now = Utc::now();
        let key = PageKey::new(now, Uuid::from_u128(5));
        assert!(key.precedes(now, Uuid::from_u128(4)));
        assert!(!key.precedes(now, Uuid::from_u128(5)));
        assert!(key.precedes(now - chrono::Duration::seconds(1), Uuid::from_u128(9)));
    }
}
