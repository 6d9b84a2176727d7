//! Share link management and the public endpoints that redeem them.
//!
//! ```text
//! POST /api/v1/share-links {"fileIds":["..."],"expiresInHours":24,"maxAccesses":3}
//! GET /api/v1/share-links
//! DELETE /api/v1/share-links/{id}
//! GET /api/v1/shared/{token}
//! GET /api/v1/shared/{token}/files/{fileId}
//! ```

use actix_web::{HttpResponse, Scope, delete, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{Error, ShareLinkDraft, ShareLinkValidationError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::files::file_response;
use crate::inbound::http::schemas::{
    CreatedShareLinkResponse, ShareLinkResponse, SharedBundleResponse,
};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_uuid, parse_uuid_list};

/// Public `/shared` routes, mounted under `/api/v1` behind the strict rate
/// limit.
pub fn shared_scope() -> Scope {
    web::scope("/shared")
        .service(download_shared)
        .service(resolve_shared)
}

/// Longest token accepted before hashing; real tokens are 64 hex chars.
const TOKEN_MAX: usize = 128;

/// Body for creating a share link.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareLinkRequest {
    pub file_ids: Vec<String>,
    /// Link lifetime, 1..=168 hours.
    #[schema(example = 24)]
    pub expires_in_hours: u32,
    /// Resolve limit; unlimited when absent.
    pub max_accesses: Option<u32>,
}

fn map_share_error(err: ShareLinkValidationError) -> Error {
    let (field, code) = match &err {
        ShareLinkValidationError::FileCount { .. } => ("fileIds", "invalid_length"),
        ShareLinkValidationError::Lifetime { .. } => ("expiresInHours", "out_of_range"),
        ShareLinkValidationError::MaxAccesses => ("maxAccesses", "out_of_range"),
    };
    Error::invalid_request(err.to_string()).with_details(json!({ "field": field, "code": code }))
}

/// Malformed tokens get the same answer as unknown ones.
fn checked_token(raw: &str) -> Result<&str, Error> {
    let token = raw.trim();
    if token.is_empty() || token.len() > TOKEN_MAX {
        return Err(Error::not_found("share link not found"));
    }
    Ok(token)
}

/// Create a link exposing some of the caller's files.
///
/// The plaintext token and URL are returned only in this response.
#[utoipa::path(
    post,
    path = "/api/v1/share-links",
    request_body = CreateShareLinkRequest,
    responses(
        (status = 201, description = "Link created", body = CreatedShareLinkResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["share-links"],
    operation_id = "createShareLink"
)]
#[post("/share-links")]
pub async fn create_share_link(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateShareLinkRequest>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let file_ids = parse_uuid_list(&payload.file_ids, FieldName::new("fileIds"))?;
    let draft = ShareLinkDraft::new(file_ids, payload.expires_in_hours, payload.max_accesses)
        .map_err(map_share_error)?;
    let created = state.share_links.create(&caller, draft).await?;
    Ok(HttpResponse::Created().json(CreatedShareLinkResponse::from(&created)))
}

/// List the caller's links.
#[utoipa::path(
    get,
    path = "/api/v1/share-links",
    responses(
        (status = 200, description = "The caller's links, newest first", body = [ShareLinkResponse]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["share-links"],
    operation_id = "listShareLinks"
)]
#[get("/share-links")]
pub async fn list_share_links(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<ShareLinkResponse>>> {
    let caller = session.require_caller()?;
    let links = state.share_links.list(&caller).await?;
    Ok(web::Json(links.iter().map(ShareLinkResponse::from).collect()))
}

/// Revoke a link immediately. Revoking twice keeps the first timestamp.
#[utoipa::path(
    delete,
    path = "/api/v1/share-links/{id}",
    params(("id" = uuid::Uuid, Path, description = "Share link id")),
    responses(
        (status = 200, description = "Revoked link", body = ShareLinkResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["share-links"],
    operation_id = "revokeShareLink"
)]
#[delete("/share-links/{id}")]
pub async fn revoke_share_link(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ShareLinkResponse>> {
    let caller = session.require_caller()?;
    let id = parse_uuid(&path, FieldName::new("id"))?;
    let link = state.share_links.revoke(&caller, id).await?;
    Ok(web::Json(ShareLinkResponse::from(&link)))
}

/// Redeem a share token. Each call counts one access.
///
/// Unknown, revoked, expired and exhausted links are indistinguishable.
#[utoipa::path(
    get,
    path = "/api/v1/shared/{token}",
    params(("token" = String, Path, description = "Share token")),
    responses(
        (status = 200, description = "Shared files", body = SharedBundleResponse),
        (status = 404, description = "Link unavailable", body = Error),
        (status = 429, description = "Too many requests", body = Error)
    ),
    tags = ["shared"],
    operation_id = "resolveShareLink",
    security([])
)]
#[get("/{token}")]
pub async fn resolve_shared(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<SharedBundleResponse>> {
    let caller = session.caller()?;
    let token = checked_token(&path)?;
    let bundle = state.share_links.resolve(&caller, token).await?;
    Ok(web::Json(SharedBundleResponse::from(&bundle)))
}

/// Download one file exposed by a share token.
#[utoipa::path(
    get,
    path = "/api/v1/shared/{token}/files/{fileId}",
    params(
        ("token" = String, Path, description = "Share token"),
        ("fileId" = uuid::Uuid, Path, description = "File id"),
    ),
    responses(
        (status = 200, description = "File bytes with the stored content type"),
        (status = 302, description = "Redirect to external storage"),
        (status = 404, description = "Link or file unavailable", body = Error),
        (status = 429, description = "Too many requests", body = Error)
    ),
    tags = ["shared"],
    operation_id = "downloadSharedFile",
    security([])
)]
#[get("/{token}/files/{file_id}")]
pub async fn download_shared(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let caller = session.caller()?;
    let (token, file_id) = path.into_inner();
    let token = checked_token(&token)?;
    let file_id = parse_uuid(&file_id, FieldName::new("fileId"))?;
    let content = state.share_links.download(&caller, token, file_id).await?;
    Ok(file_response(content))
}

#[cfg(test)]
#[path = "share_links_tests.rs"]
mod tests;
