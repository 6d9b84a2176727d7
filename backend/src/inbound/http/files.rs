//! File upload and download handlers.
//!
//! Uploads are raw request bodies: the `Content-Type` header carries the
//! media type and the original file name comes from `X-File-Name` (or the
//! `name` query parameter).
//!
//! ```text
//! POST /api/v1/files?name=hemograma.pdf   (body: file bytes)
//! GET /api/v1/files?cursor=...&limit=20
//! GET /api/v1/files/{id}
//! DELETE /api/v1/files/{id}
//! ```

use actix_web::http::header::{
    self, CacheControl, CacheDirective, ContentDisposition, DispositionParam, DispositionType,
};
use actix_web::{HttpRequest, HttpResponse, delete, get, post, web};
use futures_util::StreamExt;
use pagination::Paginated;
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::domain::{Error, FileContent, Upload, UploadValidationError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{FilePage, FileResponse, page_of};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, PageParams, parse_uuid};

/// Header naming the uploaded file.
pub const FILE_NAME_HEADER: &str = "x-file-name";

const FILE_ID: FieldName = FieldName::new("id");

/// Query fallback for the upload file name.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UploadParams {
    /// Original file name; used when `X-File-Name` is absent.
    pub name: Option<String>,
}

fn upload_name(req: &HttpRequest, params: &UploadParams) -> Result<String, Error> {
    let from_header = req
        .headers()
        .get(FILE_NAME_HEADER)
        .map(|value| {
            value.to_str().map(str::to_owned).map_err(|_| {
                Error::invalid_request("X-File-Name must be visible ASCII")
                    .with_details(json!({ "field": "name", "code": "invalid_name" }))
            })
        })
        .transpose()?;
    from_header
        .or_else(|| params.name.clone())
        .ok_or_else(|| {
            Error::invalid_request("a file name is required")
                .with_details(json!({ "field": "name", "code": "missing_field" }))
        })
}

fn upload_content_type(req: &HttpRequest) -> Result<String, Error> {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .ok_or_else(|| {
            Error::invalid_request("Content-Type header is required")
                .with_details(json!({ "field": "contentType", "code": "missing_field" }))
        })
}

/// Buffer the body, refusing it as soon as it grows past `max_bytes`.
async fn read_body(mut payload: web::Payload, max_bytes: usize) -> Result<Vec<u8>, Error> {
    let mut bytes = Vec::new();
    while let Some(chunk) = payload.next().await {
        let chunk =
            chunk.map_err(|err| Error::invalid_request(format!("failed to read upload: {err}")))?;
        if bytes.len() + chunk.len() > max_bytes {
            return Err(too_large(max_bytes));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

fn too_large(max_bytes: usize) -> Error {
    Error::payload_too_large(format!("file exceeds {max_bytes} bytes"))
        .with_details(json!({ "field": "file", "code": "too_large", "max": max_bytes }))
}

fn map_upload_error(err: UploadValidationError) -> Error {
    match &err {
        UploadValidationError::TooLarge { max } => too_large(*max),
        UploadValidationError::Empty => Error::invalid_request(err.to_string())
            .with_details(json!({ "field": "file", "code": "empty" })),
        UploadValidationError::ContentType(_) => Error::invalid_request(err.to_string())
            .with_details(json!({ "field": "contentType", "code": "unsupported_type" })),
        UploadValidationError::Name { .. } => Error::invalid_request(err.to_string())
            .with_details(json!({ "field": "name", "code": "invalid_name" })),
    }
}

/// Store a new file owned by the caller.
#[utoipa::path(
    post,
    path = "/api/v1/files",
    params(
        UploadParams,
        ("X-File-Name" = Option<String>, Header, description = "Original file name"),
    ),
    request_body(content = String, description = "Raw file bytes",
        content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "File stored", body = FileResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 413, description = "File too large", body = Error),
        (status = 503, description = "Storage unavailable", body = Error)
    ),
    tags = ["files"],
    operation_id = "uploadFile"
)]
#[post("/files")]
pub async fn upload_file(
    state: web::Data<HttpState>,
    session: SessionContext,
    req: HttpRequest,
    params: web::Query<UploadParams>,
    payload: web::Payload,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let name = upload_name(&req, &params)?;
    let content_type = upload_content_type(&req)?;
    let bytes = read_body(payload, state.max_upload_bytes).await?;
    let upload = Upload::validate(&name, &content_type, bytes, state.max_upload_bytes)
        .map_err(map_upload_error)?;
    let file = state.files.upload(&caller, upload).await?;
    Ok(HttpResponse::Created().json(FileResponse::from(&file)))
}

/// List the caller's files, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/files",
    params(PageParams),
    responses(
        (status = 200, description = "Files", body = FilePage),
        (status = 400, description = "Invalid cursor or limit", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["files"],
    operation_id = "listFiles"
)]
#[get("/files")]
pub async fn list_files(
    state: web::Data<HttpState>,
    session: SessionContext,
    params: web::Query<PageParams>,
) -> ApiResult<web::Json<Paginated<FileResponse>>> {
    let caller = session.require_caller()?;
    let page = state.files.list(&caller, params.to_query()?).await?;
    Ok(web::Json(page_of(&page)))
}

/// Download a file.
///
/// Locally stored files are streamed back; files held by Cloudinary answer
/// `302` with the stored URL.
#[utoipa::path(
    get,
    path = "/api/v1/files/{id}",
    params(("id" = uuid::Uuid, Path, description = "File id")),
    responses(
        (status = 200, description = "File bytes with the stored content type"),
        (status = 302, description = "Redirect to external storage",
            headers(("Location" = String, description = "File URL"))),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error),
        (status = 503, description = "Storage unavailable", body = Error)
    ),
    tags = ["files"],
    operation_id = "downloadFile"
)]
#[get("/files/{id}")]
pub async fn download_file(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let id = parse_uuid(&path, FILE_ID)?;
    let content = state.files.download(&caller, id).await?;
    Ok(file_response(content))
}

/// Remove a file. Files backing a sent report cannot be deleted.
#[utoipa::path(
    delete,
    path = "/api/v1/files/{id}",
    params(("id" = uuid::Uuid, Path, description = "File id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error),
        (status = 409, description = "File backs a sent report", body = Error)
    ),
    tags = ["files"],
    operation_id = "deleteFile"
)]
#[delete("/files/{id}")]
pub async fn delete_file(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let id = parse_uuid(&path, FILE_ID)?;
    state.files.delete(&caller, id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Render a download as an attachment or a redirect. Shared with the
/// public share-link download.
pub(crate) fn file_response(content: FileContent) -> HttpResponse {
    match content {
        FileContent::Bytes { file, bytes } => HttpResponse::Ok()
            .content_type(file.content_type.as_str())
            .insert_header(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(file.original_name)],
            })
            .insert_header(CacheControl(vec![
                CacheDirective::Private,
                CacheDirective::NoStore,
            ]))
            .body(bytes),
        FileContent::Redirect { url, .. } => HttpResponse::Found()
            .insert_header((header::LOCATION, url))
            .insert_header(CacheControl(vec![CacheDirective::NoStore]))
            .finish(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, StorageBackend};
    use crate::inbound::http::state::test_ports::MockPorts;
    use crate::inbound::http::state::{HttpState, HttpStatePorts};
    use crate::inbound::http::test_utils::{
        file_fixture, session_cookie, sign_in, test_app, user_fixture,
    };
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::Value;
    use uuid::Uuid;

    fn files_scope() -> actix_web::Scope {
        web::scope("/api/v1")
            .service(upload_file)
            .service(list_files)
            .service(download_file)
            .service(delete_file)
    }

    fn state_with_limit(ports: MockPorts, limit: usize) -> HttpState {
        let state = ports.into_state();
        HttpState::with_upload_limit(
            HttpStatePorts {
                accounts: state.accounts,
                admin: state.admin,
                files: state.files,
                reports: state.reports,
                notifications: state.notifications,
                events: state.events,
                professionals: state.professionals,
                share_links: state.share_links,
            },
            limit,
        )
    }

    #[actix_web::test]
    async fn uploads_use_header_name_and_content_type() {
        let owner = user_fixture(Role::Emissor);
        let stored = file_fixture(owner.id);
        let mut ports = MockPorts::default();
        let returned = stored.clone();
        ports
            .files
            .expect_upload()
            .withf(|_, upload| {
                upload.original_name == "hemograma.pdf"
                    && upload.content_type == "application/pdf"
                    && upload.bytes == b"%PDF".to_vec()
            })
            .times(1)
            .returning(move |_, _| Ok(returned.clone()));
        let app =
            actix_test::init_service(test_app(ports.into_state()).service(files_scope())).await;
        let login = actix_test::call_service(&app, sign_in(Role::Emissor, owner.id).to_request()).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/files")
                .cookie(session_cookie(&login))
                .insert_header((header::CONTENT_TYPE, "application/pdf"))
                .insert_header((FILE_NAME_HEADER, "hemograma.pdf"))
                .set_payload("%PDF")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["originalName"], "hemograma.pdf");
        assert_eq!(body["storageBackend"], "local");
        assert!(body.get("storageKey").is_none());
    }

    #[actix_web::test]
    async fn oversized_uploads_are_refused_before_storage() {
        let mut ports = MockPorts::default();
        ports.files.expect_upload().never();
        let app = actix_test::init_service(
            test_app(state_with_limit(ports, 8)).service(files_scope()),
        )
        .await;
        let login =
            actix_test::call_service(&app, sign_in(Role::Emissor, Uuid::new_v4()).to_request()).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/files?name=big.txt")
                .cookie(session_cookie(&login))
                .insert_header((header::CONTENT_TYPE, "text/plain"))
                .set_payload(vec![b'x'; 9])
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["code"], "payload_too_large");
    }

    #[rstest]
    #[case("application/zip", "a.zip", "contentType")]
    #[case("application/pdf", "../a.pdf", "name")]
    #[actix_web::test]
    async fn invalid_uploads_name_the_field(
        #[case] content_type: &str,
        #[case] name: &str,
        #[case] field: &str,
    ) {
        let app = actix_test::init_service(
            test_app(MockPorts::default().into_state()).service(files_scope()),
        )
        .await;
        let login =
            actix_test::call_service(&app, sign_in(Role::Emissor, Uuid::new_v4()).to_request()).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/files")
                .cookie(session_cookie(&login))
                .insert_header((header::CONTENT_TYPE, content_type))
                .insert_header((FILE_NAME_HEADER, name))
                .set_payload("data")
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["details"]["field"], field);
    }

    #[actix_web::test]
    async fn local_downloads_are_attachments() {
        let owner = Uuid::new_v4();
        let file = file_fixture(owner);
        let id = file.id;
        let mut ports = MockPorts::default();
        ports
            .files
            .expect_download()
            .withf(move |_, requested| *requested == id)
            .returning(move |_, _| {
                Ok(FileContent::Bytes {
                    file: file.clone(),
                    bytes: b"%PDF".to_vec(),
                })
            });
        let app =
            actix_test::init_service(test_app(ports.into_state()).service(files_scope())).await;
        let login = actix_test::call_service(&app, sign_in(Role::Receptor, owner).to_request()).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/files/{id}"))
                .cookie(session_cookie(&login))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let headers = res.headers();
        assert_eq!(
            headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/pdf")
        );
        let disposition = headers
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .expect("content disposition");
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("hemograma.pdf"));
        assert_eq!(actix_test::read_body(res).await, "%PDF");
    }

    #[actix_web::test]
    async fn cloudinary_downloads_redirect() {
        let owner = Uuid::new_v4();
        let mut file = file_fixture(owner);
        file.storage_backend = StorageBackend::Cloudinary;
        let mut ports = MockPorts::default();
        ports.files.expect_download().returning(move |_, _| {
            Ok(FileContent::Redirect {
                file: file.clone(),
                url: "https://res.cloudinary.com/demo/raw/upload/a.pdf".to_owned(),
            })
        });
        let app =
            actix_test::init_service(test_app(ports.into_state()).service(files_scope())).await;
        let login = actix_test::call_service(&app, sign_in(Role::Emissor, owner).to_request()).await;

        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/files/{}", Uuid::new_v4()))
                .cookie(session_cookie(&login))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(
            res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
            Some("https://res.cloudinary.com/demo/raw/upload/a.pdf")
        );
    }

    #[actix_web::test]
    async fn delete_surfaces_conflicts() {
        let mut ports = MockPorts::default();
        ports
            .files
            .expect_delete()
            .returning(|_, _| Err(Error::conflict("file backs a sent report")));
        let app =
            actix_test::init_service(test_app(ports.into_state()).service(files_scope())).await;
        let login =
            actix_test::call_service(&app, sign_in(Role::Emissor, Uuid::new_v4()).to_request()).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/v1/files/{}", Uuid::new_v4()))
                .cookie(session_cookie(&login))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[rstest]
    #[case("/api/v1/files/not-a-uuid", StatusCode::BAD_REQUEST)]
    #[case("/api/v1/files?limit=0", StatusCode::BAD_REQUEST)]
    #[case("/api/v1/files?cursor=%21%21", StatusCode::BAD_REQUEST)]
    #[actix_web::test]
    async fn malformed_requests_are_rejected(#[case] uri: &str, #[case] status: StatusCode) {
        let app = actix_test::init_service(
            test_app(MockPorts::default().into_state()).service(files_scope()),
        )
        .await;
        let login =
            actix_test::call_service(&app, sign_in(Role::Emissor, Uuid::new_v4()).to_request()).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(uri)
                .cookie(session_cookie(&login))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), status);
    }

    #[actix_web::test]
    async fn signed_out_callers_are_rejected() {
        let app = actix_test::init_service(
            test_app(MockPorts::default().into_state()).service(files_scope()),
        )
        .await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/api/v1/files").to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn listing_wraps_pages_in_the_envelope() {
        let owner = Uuid::new_v4();
        let file = file_fixture(owner);
        let mut ports = MockPorts::default();
        ports.files.expect_list().returning(move |_, _| {
            Ok(Paginated {
                data: vec![file.clone()],
                next_cursor: Some("abc".to_owned()),
            })
        });
        let app =
            actix_test::init_service(test_app(ports.into_state()).service(files_scope())).await;
        let login = actix_test::call_service(&app, sign_in(Role::Emissor, owner).to_request()).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/files?limit=5")
                .cookie(session_cookie(&login))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["nextCursor"], "abc");
    }
}
