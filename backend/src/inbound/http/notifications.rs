//! Notification inbox handlers.
//!
//! ```text
//! GET /api/v1/notifications?status=unread
//! POST /api/v1/notifications/{id}/archive
//! ```

use std::str::FromStr;

use actix_web::{get, post, web};
use pagination::Paginated;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::{Error, NotificationStatus, page_query};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{NotificationPage, NotificationResponse, page_of};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldCode, FieldName, field_error, parse_uuid};

const STATUS: FieldName = FieldName::new("status");

/// Status filter and page for the inbox.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NotificationParams {
    /// `unread` or `archived`; omit for both.
    pub status: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

/// List the caller's notifications.
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    params(NotificationParams),
    responses(
        (status = 200, description = "Notifications, newest first", body = NotificationPage),
        (status = 400, description = "Invalid filter, cursor or limit", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["notifications"],
    operation_id = "listNotifications"
)]
#[get("/notifications")]
pub async fn list_notifications(
    state: web::Data<HttpState>,
    session: SessionContext,
    params: web::Query<NotificationParams>,
) -> ApiResult<web::Json<Paginated<NotificationResponse>>> {
    let caller = session.require_caller()?;
    let status = params
        .status
        .as_deref()
        .map(|raw| {
            NotificationStatus::from_str(raw.trim())
                .map_err(|msg| field_error(STATUS, FieldCode::InvalidValue, msg))
        })
        .transpose()?;
    let page = page_query(params.cursor.as_deref(), params.limit)?;
    let notifications = state.notifications.list(&caller, status, page).await?;
    Ok(web::Json(page_of(&notifications)))
}

/// Archive a notification. Archiving twice is a no-op.
#[utoipa::path(
    post,
    path = "/api/v1/notifications/{id}/archive",
    params(("id" = uuid::Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Archived notification", body = NotificationResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["notifications"],
    operation_id = "archiveNotification"
)]
#[post("/notifications/{id}/archive")]
pub async fn archive_notification(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<NotificationResponse>> {
    let caller = session.require_caller()?;
    let id = parse_uuid(&path, FieldName::new("id"))?;
    let notification = state.notifications.archive(&caller, id).await?;
    Ok(web::Json(NotificationResponse::from(&notification)))
}
