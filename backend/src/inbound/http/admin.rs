//! Administrator handlers: accounts, audit trail and dashboard counts.
//!
//! ```text
//! GET /api/v1/admin/users?role=emissor
//! PATCH /api/v1/admin/users/{id} {"active":false}
//! GET /api/v1/admin/audit?action=login_failed&from=2026-03-01T00:00:00Z
//! GET /api/v1/admin/stats
//! ```

use std::str::FromStr;

use actix_web::{get, patch, web};
use pagination::Paginated;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::domain::{
    AuditAction, AuditFilter, DocumentFlowStats, Error, Role, page_query,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{
    AuditPage, AuditRecordResponse, UserPage, UserResponse, page_of,
};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldCode, FieldName, field_error, parse_optional_rfc3339_timestamp, parse_uuid,
};

/// Query for `GET /admin/users`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListParams {
    /// `receptor`, `emissor` or `admin`.
    pub role: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

/// Query for `GET /admin/audit`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct AuditParams {
    pub actor_id: Option<String>,
    /// Audit action in snake_case, e.g. `login_failed`.
    pub action: Option<String>,
    /// Inclusive lower bound (RFC 3339).
    pub from: Option<String>,
    /// Inclusive upper bound (RFC 3339).
    pub to: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

impl AuditParams {
    fn filter(&self) -> Result<AuditFilter, Error> {
        let action = self
            .action
            .as_deref()
            .map(|raw| {
                AuditAction::from_str(raw.trim()).map_err(|msg| {
                    field_error(FieldName::new("action"), FieldCode::InvalidValue, msg)
                })
            })
            .transpose()?;
        Ok(AuditFilter {
            actor_id: self
                .actor_id
                .as_deref()
                .map(|raw| parse_uuid(raw, FieldName::new("actorId")))
                .transpose()?,
            action,
            from: parse_optional_rfc3339_timestamp(self.from.as_deref(), FieldName::new("from"))?,
            to: parse_optional_rfc3339_timestamp(self.to.as_deref(), FieldName::new("to"))?,
        })
    }
}

/// Body for `PATCH /api/v1/admin/users/{id}`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub active: bool,
}

/// List accounts, optionally by role.
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(UserListParams),
    responses(
        (status = 200, description = "Accounts, newest first", body = UserPage),
        (status = 400, description = "Invalid filter, cursor or limit", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Admins only", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminListUsers"
)]
#[get("/admin/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    session: SessionContext,
    params: web::Query<UserListParams>,
) -> ApiResult<web::Json<Paginated<UserResponse>>> {
    let caller = session.require_caller()?;
    let role = params
        .role
        .as_deref()
        .map(|raw| {
            Role::from_str(raw.trim()).map_err(|err| {
                field_error(FieldName::new("role"), FieldCode::InvalidValue, err.to_string())
            })
        })
        .transpose()?;
    let page = page_query(params.cursor.as_deref(), params.limit)?;
    let users = state.admin.list_users(&caller, role, page).await?;
    Ok(web::Json(page_of(&users)))
}

/// Activate or deactivate an account. Admins cannot deactivate themselves.
#[utoipa::path(
    patch,
    path = "/api/v1/admin/users/{id}",
    params(("id" = uuid::Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Admins only, or self-deactivation", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminUpdateUser"
)]
#[patch("/admin/users/{id}")]
pub async fn update_user(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<UpdateUserRequest>,
) -> ApiResult<web::Json<UserResponse>> {
    let caller = session.require_caller()?;
    let id = parse_uuid(&path, FieldName::new("id"))?;
    let user = state.admin.set_active(&caller, id, payload.active).await?;
    Ok(web::Json(UserResponse::from(&user)))
}

/// Query the audit log, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/admin/audit",
    params(AuditParams),
    responses(
        (status = 200, description = "Audit records, newest first", body = AuditPage),
        (status = 400, description = "Invalid filter, cursor or limit", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Admins only", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminAuditLog"
)]
#[get("/admin/audit")]
pub async fn audit_log(
    state: web::Data<HttpState>,
    session: SessionContext,
    params: web::Query<AuditParams>,
) -> ApiResult<web::Json<Paginated<AuditRecordResponse>>> {
    let caller = session.require_caller()?;
    let filter = params.filter()?;
    let page = page_query(params.cursor.as_deref(), params.limit)?;
    let records = state.admin.audit_log(&caller, filter, page).await?;
    Ok(web::Json(page_of(&records)))
}

/// Report counts by status and account counts by role.
#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    responses(
        (status = 200, description = "Document flow statistics", body = DocumentFlowStats),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Admins only", body = Error)
    ),
    tags = ["admin"],
    operation_id = "adminStats"
)]
#[get("/admin/stats")]
pub async fn stats(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<DocumentFlowStats>> {
    let caller = session.require_caller()?;
    Ok(web::Json(state.admin.document_flow_stats(&caller).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AuditRecord;
    use crate::inbound::http::state::test_ports::MockPorts;
    use crate::inbound::http::test_utils::{
        fixed_time, session_cookie, sign_in, test_app, user_fixture,
    };
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::{Value, json};
    use uuid::Uuid;

    fn scope() -> actix_web::Scope {
        web::scope("/api/v1")
            .service(list_users)
            .service(update_user)
            .service(audit_log)
            .service(stats)
    }

    #[actix_web::test]
    async fn role_filter_reaches_the_port() {
        let emissor = user_fixture(Role::Emissor);
        let mut ports = MockPorts::default();
        ports
            .admin
            .expect_list_users()
            .withf(|_, role, page| *role == Some(Role::Emissor) && page.limit() == 10)
            .returning(move |_, _, _| {
                Ok(Paginated {
                    data: vec![emissor.clone()],
                    next_cursor: None,
                })
            });
        let app = actix_test::init_service(test_app(ports.into_state()).service(scope())).await;
        let login =
            actix_test::call_service(&app, sign_in(Role::Admin, Uuid::new_v4()).to_request()).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/admin/users?role=emissor&limit=10")
                .cookie(session_cookie(&login))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["data"][0]["role"], "emissor");
    }

    #[actix_web::test]
    async fn non_admins_are_forbidden() {
        let mut ports = MockPorts::default();
        ports
            .admin
            .expect_document_flow_stats()
            .returning(|_| Err(Error::forbidden("admins only")));
        let app = actix_test::init_service(test_app(ports.into_state()).service(scope())).await;
        let login =
            actix_test::call_service(&app, sign_in(Role::Receptor, Uuid::new_v4()).to_request())
                .await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/admin/stats")
                .cookie(session_cookie(&login))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn deactivation_returns_the_account() {
        let mut target = user_fixture(Role::Receptor);
        target.active = false;
        let id = target.id;
        let mut ports = MockPorts::default();
        ports
            .admin
            .expect_set_active()
            .withf(move |_, user_id, active| *user_id == id && !*active)
            .returning(move |_, _, _| Ok(target.clone()));
        let app = actix_test::init_service(test_app(ports.into_state()).service(scope())).await;
        let login =
            actix_test::call_service(&app, sign_in(Role::Admin, Uuid::new_v4()).to_request()).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::patch()
                .uri(&format!("/api/v1/admin/users/{id}"))
                .cookie(session_cookie(&login))
                .set_json(json!({ "active": false }))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["active"], false);
    }

    #[actix_web::test]
    async fn audit_filters_are_parsed() {
        let actor = Uuid::new_v4();
        let mut ports = MockPorts::default();
        ports
            .admin
            .expect_audit_log()
            .withf(move |_, filter, _| {
                filter.actor_id == Some(actor)
                    && filter.action == Some(AuditAction::LoginFailed)
                    && filter.from == Some(fixed_time())
                    && filter.to.is_none()
            })
            .returning(move |_, _, _| {
                Ok(Paginated {
                    data: vec![AuditRecord {
                        id: Uuid::new_v4(),
                        actor_id: Some(actor),
                        action: AuditAction::LoginFailed,
                        resource_type: "user".to_owned(),
                        resource_id: None,
                        ip: Some("203.0.113.9".to_owned()),
                        metadata: json!({ "email": "ana@example.com" }),
                        created_at: fixed_time(),
                    }],
                    next_cursor: None,
                })
            });
        let app = actix_test::init_service(test_app(ports.into_state()).service(scope())).await;
        let login =
            actix_test::call_service(&app, sign_in(Role::Admin, Uuid::new_v4()).to_request()).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!(
                    "/api/v1/admin/audit?actorId={actor}&action=login_failed&from=2026-03-01T09:30:00Z"
                ))
                .cookie(session_cookie(&login))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["data"][0]["action"], "login_failed");
        assert_eq!(body["data"][0]["metadata"]["email"], "ana@example.com");
    }

    #[rstest]
    #[case("/api/v1/admin/audit?action=hacked", "action")]
    #[case("/api/v1/admin/audit?actorId=nope", "actorId")]
    #[case("/api/v1/admin/audit?from=yesterday", "from")]
    #[case("/api/v1/admin/users?role=root", "role")]
    #[actix_web::test]
    async fn bad_filters_name_the_parameter(#[case] uri: &str, #[case] field: &str) {
        let app = actix_test::init_service(
            test_app(MockPorts::default().into_state()).service(scope()),
        )
        .await;
        let login =
            actix_test::call_service(&app, sign_in(Role::Admin, Uuid::new_v4()).to_request()).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(uri)
                .cookie(session_cookie(&login))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["details"]["field"], field);
    }

    #[actix_web::test]
    async fn stats_are_camel_cased() {
        let mut ports = MockPorts::default();
        ports.admin.expect_document_flow_stats().returning(|_| {
            Ok(DocumentFlowStats {
                reports_sent: 4,
                reports_viewed: 2,
                ..DocumentFlowStats::default()
            })
        });
        let app = actix_test::init_service(test_app(ports.into_state()).service(scope())).await;
        let login =
            actix_test::call_service(&app, sign_in(Role::Admin, Uuid::new_v4()).to_request()).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/admin/stats")
                .cookie(session_cookie(&login))
                .to_request(),
        )
        .await;
        let body: Value = actix_test::read_body_json(res).await;
        assert_eq!(body["reportsSent"], 4);
        assert_eq!(body["reportsViewed"], 2);
    }
}
