//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every rejected field becomes `400 invalid_request` with
//! `details = { field, code, value? }` so clients can highlight the input.

use actix_web::{HttpRequest, error::JsonPayloadError, error::QueryPayloadError, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::domain::{Error, PageQuery, page_query};

/// `?cursor=&limit=` accepted by every paginated listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Opaque cursor from a previous page's `nextCursor`.
    pub cursor: Option<String>,
    /// Page size, 1..=100; defaults to 20.
    pub limit: Option<usize>,
}

impl PageParams {
    pub(crate) fn to_query(&self) -> Result<PageQuery, Error> {
        page_query(self.cursor.as_deref(), self.limit)
    }
}

/// Machine-readable codes placed in `details.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldCode {
    MissingField,
    InvalidUuid,
    InvalidTimestamp,
    InvalidValue,
    TooLong,
}

impl FieldCode {
    fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidUuid => "invalid_uuid",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::InvalidValue => "invalid_value",
            Self::TooLong => "too_long",
        }
    }
}

/// Request field name in its wire spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub(crate) fn as_str(self) -> &'static str {
        self.0
    }
}

/// `400` pointing at `field`.
pub(crate) fn field_error(field: FieldName, code: FieldCode, message: impl Into<String>) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "code": code.as_str(),
    }))
}

fn field_error_with_value(field: FieldName, code: FieldCode, message: String, value: &str) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "code": code.as_str(),
        "value": value,
    }))
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let name = field.as_str();
    field_error(field, FieldCode::MissingField, format!("missing required field: {name}"))
}

pub(crate) fn parse_uuid(value: &str, field: FieldName) -> Result<Uuid, Error> {
    Uuid::parse_str(value.trim()).map_err(|_| {
        let name = field.as_str();
        field_error_with_value(
            field,
            FieldCode::InvalidUuid,
            format!("{name} must be a valid UUID"),
            value,
        )
    })
}

pub(crate) fn parse_uuid_list(values: &[String], field: FieldName) -> Result<Vec<Uuid>, Error> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            Uuid::parse_str(value).map_err(|_| {
                let name = field.as_str();
                Error::invalid_request(format!("{name} must contain valid UUIDs")).with_details(
                    json!({
                        "field": name,
                        "code": FieldCode::InvalidUuid.as_str(),
                        "index": index,
                        "value": value,
                    }),
                )
            })
        })
        .collect()
}

pub(crate) fn parse_rfc3339_timestamp(
    value: &str,
    field: FieldName,
) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| {
            let name = field.as_str();
            field_error_with_value(
                field,
                FieldCode::InvalidTimestamp,
                format!("{name} must be an RFC 3339 timestamp"),
                value,
            )
        })
}

pub(crate) fn parse_optional_rfc3339_timestamp(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    value
        .map(|raw| parse_rfc3339_timestamp(raw, field))
        .transpose()
}

/// JSON extractor config turning malformed bodies into domain errors.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
            let error = match &err {
                JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
                    Error::payload_too_large("request body too large")
                }
                JsonPayloadError::ContentType => {
                    Error::invalid_request("expected an application/json body")
                }
                other => Error::invalid_request(format!("invalid JSON body: {other}")),
            };
            error.into()
        })
}

/// Query-string extractor config turning bad parameters into domain errors.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: QueryPayloadError, _req: &HttpRequest| {
        Error::invalid_request(format!("invalid query string: {err}")).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    const FILE_ID: FieldName = FieldName::new("fileId");

    #[rstest]
    fn uuids_are_trimmed_before_parsing() {
        let id = parse_uuid(" 3fa85f64-5717-4562-b3fc-2c963f66afa6 ", FILE_ID).expect("valid uuid");
        assert_eq!(id.to_string(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    }

    #[rstest]
    fn bad_uuids_name_the_field_and_value() {
        let err = parse_uuid("nope", FILE_ID).expect_err("invalid uuid");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(
            err.details(),
            Some(&json!({"field": "fileId", "code": "invalid_uuid", "value": "nope"}))
        );
    }

    #[rstest]
    fn uuid_lists_report_the_failing_index() {
        let values = vec![Uuid::nil().to_string(), "bad".to_owned()];
        let err = parse_uuid_list(&values, FieldName::new("fileIds")).expect_err("bad entry");
        assert_eq!(
            err.details().and_then(|d| d.get("index")),
            Some(&json!(1))
        );
    }

    #[rstest]
    #[case("2026-03-01T09:30:00Z", true)]
    #[case("2026-03-01T09:30:00-03:00", true)]
    #[case("yesterday", false)]
    fn timestamps_require_rfc3339(#[case] raw: &str, #[case] ok: bool) {
        let parsed = parse_rfc3339_timestamp(raw, FieldName::new("startsAt"));
        assert_eq!(parsed.is_ok(), ok);
    }

    #[rstest]
    fn missing_fields_use_their_own_code() {
        let err = missing_field_error(FieldName::new("title"));
        assert_eq!(
            err.details(),
            Some(&json!({"field": "title", "code": "missing_field"}))
        );
    }
}
