//! Health event calendar handlers.
//!
//! ```text
//! POST /api/v1/events {"title":"Cardiology follow-up","kind":"consultation","startsAt":"2026-03-01T09:30:00Z"}
//! GET /api/v1/events?from=2026-03-01T00:00:00Z&to=2026-03-31T23:59:59Z
//! GET|PUT|DELETE /api/v1/events/{id}
//! ```

use std::str::FromStr;

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::domain::{Error, EventDraft, EventKind, EventRange, EventValidationError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::EventResponse;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldCode, FieldName, field_error, parse_optional_rfc3339_timestamp, parse_rfc3339_timestamp,
    parse_uuid, parse_uuid_list,
};

const EVENT_ID: FieldName = FieldName::new("id");

/// Event fields shared by create and replace.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    #[schema(example = "Cardiology follow-up")]
    pub title: String,
    pub description: Option<String>,
    /// `consultation`, `exam`, `procedure`, `vaccination` or `other`.
    #[schema(example = "consultation")]
    pub kind: String,
    #[schema(example = "2026-03-01T09:30:00Z")]
    pub starts_at: String,
    pub ends_at: Option<String>,
    pub professional_id: Option<String>,
    #[serde(default)]
    pub file_ids: Vec<String>,
}

/// Body for `POST /api/v1/events`.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[serde(flatten)]
    pub event: EventRequest,
    /// Notification to archive; its report's file is attached to the event.
    pub notification_id: Option<String>,
}

/// Optional `from`/`to` bounds for listing events.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventRangeParams {
    /// Inclusive lower bound on `startsAt` (RFC 3339).
    pub from: Option<String>,
    /// Inclusive upper bound on `startsAt` (RFC 3339).
    pub to: Option<String>,
}

impl TryFrom<&EventRequest> for EventDraft {
    type Error = Error;

    fn try_from(value: &EventRequest) -> Result<Self, Self::Error> {
        let kind = EventKind::from_str(value.kind.trim()).map_err(|msg| {
            field_error(FieldName::new("kind"), FieldCode::InvalidValue, msg)
        })?;
        let starts_at = parse_rfc3339_timestamp(&value.starts_at, FieldName::new("startsAt"))?;
        let ends_at =
            parse_optional_rfc3339_timestamp(value.ends_at.as_deref(), FieldName::new("endsAt"))?;
        let professional_id = value
            .professional_id
            .as_deref()
            .map(|raw| parse_uuid(raw, FieldName::new("professionalId")))
            .transpose()?;
        let file_ids = parse_uuid_list(&value.file_ids, FieldName::new("fileIds"))?;
        EventDraft::new(
            &value.title,
            value.description.as_deref(),
            kind,
            starts_at,
            ends_at,
            professional_id,
            file_ids,
        )
        .map_err(map_event_error)
    }
}

fn map_event_error(err: EventValidationError) -> Error {
    let (field, code) = match &err {
        EventValidationError::Title { .. } => ("title", "invalid_length"),
        EventValidationError::Description { .. } => ("description", "too_long"),
        EventValidationError::EndsBeforeStart => ("endsAt", "ends_before_start"),
        EventValidationError::TooManyFiles { .. } => ("fileIds", "too_many"),
    };
    Error::invalid_request(err.to_string()).with_details(json!({ "field": field, "code": code }))
}

fn event_id(path: &str) -> Result<Uuid, Error> {
    parse_uuid(path, EVENT_ID)
}

/// Record a health event, optionally filing a notification into it.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Receptors only", body = Error),
        (status = 404, description = "Unknown professional, file or notification", body = Error)
    ),
    tags = ["events"],
    operation_id = "createEvent"
)]
#[post("/events")]
pub async fn create_event(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateEventRequest>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let draft = EventDraft::try_from(&payload.event)?;
    let notification_id = payload
        .notification_id
        .as_deref()
        .map(|raw| parse_uuid(raw, FieldName::new("notificationId")))
        .transpose()?;
    let event = state.events.create(&caller, draft, notification_id).await?;
    Ok(HttpResponse::Created().json(EventResponse::from(&event)))
}

/// The caller's events ordered by start time.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    params(EventRangeParams),
    responses(
        (status = 200, description = "Events", body = [EventResponse]),
        (status = 400, description = "Invalid range", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Receptors only", body = Error)
    ),
    tags = ["events"],
    operation_id = "listEvents"
)]
#[get("/events")]
pub async fn list_events(
    state: web::Data<HttpState>,
    session: SessionContext,
    params: web::Query<EventRangeParams>,
) -> ApiResult<web::Json<Vec<EventResponse>>> {
    let caller = session.require_caller()?;
    let range = EventRange {
        from: parse_optional_rfc3339_timestamp(params.from.as_deref(), FieldName::new("from"))?,
        to: parse_optional_rfc3339_timestamp(params.to.as_deref(), FieldName::new("to"))?,
    };
    if range.from.zip(range.to).is_some_and(|(from, to)| to < from) {
        return Err(field_error(
            FieldName::new("to"),
            FieldCode::InvalidValue,
            "to must not precede from",
        ));
    }
    let events = state.events.list(&caller, range).await?;
    Ok(web::Json(events.iter().map(EventResponse::from).collect()))
}

/// Fetch one event.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    params(("id" = uuid::Uuid, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event", body = EventResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["events"],
    operation_id = "getEvent"
)]
#[get("/events/{id}")]
pub async fn get_event(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<EventResponse>> {
    let caller = session.require_caller()?;
    let event = state.events.get(&caller, event_id(&path)?).await?;
    Ok(web::Json(EventResponse::from(&event)))
}

/// Replace every editable field of an event.
#[utoipa::path(
    put,
    path = "/api/v1/events/{id}",
    params(("id" = uuid::Uuid, Path, description = "Event id")),
    request_body = EventRequest,
    responses(
        (status = 200, description = "Updated event", body = EventResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["events"],
    operation_id = "updateEvent"
)]
#[put("/events/{id}")]
pub async fn update_event(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<EventRequest>,
) -> ApiResult<web::Json<EventResponse>> {
    let caller = session.require_caller()?;
    let id = event_id(&path)?;
    let draft = EventDraft::try_from(&payload.into_inner())?;
    let event = state.events.update(&caller, id, draft).await?;
    Ok(web::Json(EventResponse::from(&event)))
}

/// Delete an event.
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}",
    params(("id" = uuid::Uuid, Path, description = "Event id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["events"],
    operation_id = "deleteEvent"
)]
#[delete("/events/{id}")]
pub async fn delete_event(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    state.events.delete(&caller, event_id(&path)?).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
