//! Construction and serialisation behaviour of the domain error.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn conflict() -> Error {
    Error::conflict("email already registered")
}

#[rstest]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::payload_too_large("big"), ErrorCode::PayloadTooLarge)]
#[case(Error::too_many_requests("slow down"), ErrorCode::TooManyRequests)]
#[case(Error::service_unavailable("down"), ErrorCode::ServiceUnavailable)]
fn constructors_set_codes(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn try_new_rejects_blank_messages() {
    let result = Error::try_new(ErrorCode::NotFound, "  ");
    assert_eq!(result, Err(ErrorValidationError::EmptyMessage));
}

#[rstest]
fn new_substitutes_blank_messages() {
    let error = Error::new(ErrorCode::NotFound, "");
    assert_eq!(error.message(), FALLBACK_MESSAGE);
}

#[rstest]
fn blank_trace_ids_are_rejected(conflict: Error) {
    let result = conflict.try_with_trace_id(" ");
    assert_eq!(result, Err(ErrorValidationError::EmptyTraceId));
}

#[rstest]
fn trace_id_is_absent_out_of_scope(conflict: Error) {
    assert!(conflict.trace_id().is_none());
}

#[tokio::test]
async fn trace_id_is_captured_in_scope() {
    let trace_id: TraceId = TRACE_ID.parse().expect("valid uuid");
    let error = TraceId::scope(trace_id, async { Error::forbidden("nope") }).await;
    assert_eq!(error.trace_id(), Some(TRACE_ID));
}

#[rstest]
fn serialises_camel_case_and_omits_empty_fields(conflict: Error) {
    let value = serde_json::to_value(conflict).expect("serialise");
    assert_eq!(
        value,
        json!({ "code": "conflict", "message": "email already registered" })
    );
}

#[rstest]
fn deserialises_legacy_snake_case_trace_id() {
    let error: Error = serde_json::from_value(json!({
        "code": "not_found",
        "message": "missing",
        "trace_id": TRACE_ID,
    }))
    .expect("deserialise");
    assert_eq!(error.trace_id(), Some(TRACE_ID));
}

#[rstest]
fn deserialisation_rejects_blank_message() {
    let result = serde_json::from_value::<Error>(json!({ "code": "conflict", "message": "" }));
    assert!(result.is_err());
}
