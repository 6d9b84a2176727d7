//! Report dispatch and background job handlers.
//!
//! ```text
//! POST /api/v1/reports {"receptorEmail":"ana@example.com","fileId":"...","title":"CBC"}
//! POST /api/v1/reports/batch {"items":[...]}
//! GET /api/v1/reports/sent
//! GET /api/v1/reports/received
//! GET /api/v1/reports/{id}
//! GET /api/v1/jobs/{id}
//! ```

use actix_web::{HttpResponse, get, post, web};
use pagination::Paginated;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{BATCH_MAX, Error, JobStatus, ReportDraft, ReportValidationError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ReportPage, ReportResponse, page_of};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, PageParams, parse_uuid};

const FILE_ID: FieldName = FieldName::new("fileId");
const REPORT_ID: FieldName = FieldName::new("id");
const JOB_ID: FieldName = FieldName::new("id");

/// One report to send.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendReportRequest {
    #[schema(example = "ana@example.com")]
    pub receptor_email: String,
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub file_id: String,
    #[schema(example = "Complete blood count")]
    pub title: String,
    #[schema(example = "LAB-2026-0001")]
    pub protocol: Option<String>,
}

/// Body for `POST /api/v1/reports/batch`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchReportRequest {
    pub items: Vec<SendReportRequest>,
}

fn to_draft(request: &SendReportRequest) -> Result<ReportDraft, Error> {
    let file_id = parse_uuid(&request.file_id, FILE_ID)?;
    ReportDraft::new(
        &request.receptor_email,
        file_id,
        &request.title,
        request.protocol.as_deref(),
    )
    .map_err(map_report_error)
}

fn map_report_error(err: ReportValidationError) -> Error {
    let (field, code) = match &err {
        ReportValidationError::ReceptorEmail => ("receptorEmail", "missing_field"),
        ReportValidationError::Title { .. } => ("title", "invalid_length"),
        ReportValidationError::Protocol { .. } => ("protocol", "too_long"),
        ReportValidationError::BatchSize { .. } => ("items", "invalid_batch_size"),
    };
    Error::invalid_request(err.to_string()).with_details(json!({ "field": field, "code": code }))
}

/// Point a per-item error at its position in the batch.
fn at_index(err: Error, index: usize) -> Error {
    let mut details = err.details().cloned().unwrap_or_else(|| json!({}));
    if let Some(map) = details.as_object_mut() {
        map.insert("index".to_owned(), json!(index));
    }
    Error::invalid_request(err.message().to_owned()).with_details(details)
}

/// Send one report; the receptor gets an unread notification.
#[utoipa::path(
    post,
    path = "/api/v1/reports",
    request_body = SendReportRequest,
    responses(
        (status = 201, description = "Report sent", body = ReportResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Only emissors send reports", body = Error),
        (status = 404, description = "Unknown receptor or file", body = Error)
    ),
    tags = ["reports"],
    operation_id = "sendReport"
)]
#[post("/reports")]
pub async fn send_report(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SendReportRequest>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let draft = to_draft(&payload)?;
    let report = state.reports.send(&caller, draft).await?;
    Ok(HttpResponse::Created().json(ReportResponse::from(&report)))
}

/// Queue up to 100 reports for background delivery.
///
/// Every item is validated before anything is queued; the response is the
/// job's initial status, pollable at `/api/v1/jobs/{id}`.
#[utoipa::path(
    post,
    path = "/api/v1/reports/batch",
    request_body = BatchReportRequest,
    responses(
        (status = 202, description = "Batch queued", body = JobStatus),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Only emissors send reports", body = Error),
        (status = 503, description = "Queue unavailable", body = Error)
    ),
    tags = ["reports"],
    operation_id = "sendReportBatch"
)]
#[post("/reports/batch")]
pub async fn send_batch(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<BatchReportRequest>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let items = &payload.items;
    if items.is_empty() || items.len() > BATCH_MAX {
        return Err(map_report_error(ReportValidationError::BatchSize {
            max: BATCH_MAX,
        }));
    }
    let drafts = items
        .iter()
        .enumerate()
        .map(|(index, item)| to_draft(item).map_err(|err| at_index(err, index)))
        .collect::<Result<Vec<_>, _>>()?;
    let status = state.reports.enqueue_batch(&caller, drafts).await?;
    Ok(HttpResponse::Accepted().json(status))
}

/// Reports the calling emissor has sent, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/reports/sent",
    params(PageParams),
    responses(
        (status = 200, description = "Sent reports", body = ReportPage),
        (status = 400, description = "Invalid cursor or limit", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Emissors only", body = Error)
    ),
    tags = ["reports"],
    operation_id = "listSentReports"
)]
#[get("/reports/sent")]
pub async fn list_sent(
    state: web::Data<HttpState>,
    session: SessionContext,
    params: web::Query<PageParams>,
) -> ApiResult<web::Json<Paginated<ReportResponse>>> {
    let caller = session.require_caller()?;
    let page = state.reports.list_sent(&caller, params.to_query()?).await?;
    Ok(web::Json(page_of(&page)))
}

/// Reports addressed to the calling receptor, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/reports/received",
    params(PageParams),
    responses(
        (status = 200, description = "Received reports", body = ReportPage),
        (status = 400, description = "Invalid cursor or limit", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Receptors only", body = Error)
    ),
    tags = ["reports"],
    operation_id = "listReceivedReports"
)]
#[get("/reports/received")]
pub async fn list_received(
    state: web::Data<HttpState>,
    session: SessionContext,
    params: web::Query<PageParams>,
) -> ApiResult<web::Json<Paginated<ReportResponse>>> {
    let caller = session.require_caller()?;
    let page = state
        .reports
        .list_received(&caller, params.to_query()?)
        .await?;
    Ok(web::Json(page_of(&page)))
}

/// Fetch one report. The receptor's first read marks it viewed.
#[utoipa::path(
    get,
    path = "/api/v1/reports/{id}",
    params(("id" = uuid::Uuid, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report", body = ReportResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["reports"],
    operation_id = "getReport"
)]
#[get("/reports/{id}")]
pub async fn get_report(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ReportResponse>> {
    let caller = session.require_caller()?;
    let id = parse_uuid(&path, REPORT_ID)?;
    let report = state.reports.get(&caller, id).await?;
    Ok(web::Json(ReportResponse::from(&report)))
}

/// Progress of a background job owned by the caller.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    params(("id" = uuid::Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job status", body = JobStatus),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown or expired job", body = Error)
    ),
    tags = ["jobs"],
    operation_id = "getJobStatus"
)]
#[get("/jobs/{id}")]
pub async fn job_status(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<JobStatus>> {
    let caller = session.require_caller()?;
    let id = parse_uuid(&path, JOB_ID)?;
    Ok(web::Json(state.reports.job_status(&caller, id).await?))
}

#[cfg(test)]
#[path = "reports_tests.rs"]
mod tests;
