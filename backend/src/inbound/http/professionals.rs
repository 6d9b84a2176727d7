//! Handlers for a receptor's list of health professionals.
//!
//! ```text
//! POST /api/v1/professionals {"name":"Dr. Helena Prado","specialty":"Cardiology"}
//! GET /api/v1/professionals
//! DELETE /api/v1/professionals/{id}
//! ```

use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{Error, ProfessionalDraft, ProfessionalValidationError};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ProfessionalResponse;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_uuid};

/// Body for creating a professional.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalRequest {
    #[schema(example = "Dr. Helena Prado")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "Cardiology")]
    pub specialty: String,
    pub registry_number: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl TryFrom<&ProfessionalRequest> for ProfessionalDraft {
    type Error = Error;

    fn try_from(value: &ProfessionalRequest) -> Result<Self, Self::Error> {
        ProfessionalDraft::new(
            &value.name,
            &value.specialty,
            value.registry_number.as_deref(),
            value.phone.as_deref(),
            value.email.as_deref(),
        )
        .map_err(|err| {
            let (field, code) = match &err {
                ProfessionalValidationError::EmptyName => ("name", "missing_field"),
                ProfessionalValidationError::TooLong { field, .. } => (*field, "too_long"),
                ProfessionalValidationError::Email => ("email", "invalid_email"),
            };
            Error::invalid_request(err.to_string())
                .with_details(json!({ "field": field, "code": code }))
        })
    }
}

/// Add a professional.
#[utoipa::path(
    post,
    path = "/api/v1/professionals",
    request_body = ProfessionalRequest,
    responses(
        (status = 201, description = "Professional added", body = ProfessionalResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Receptors only", body = Error)
    ),
    tags = ["professionals"],
    operation_id = "createProfessional"
)]
#[post("/professionals")]
pub async fn create_professional(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ProfessionalRequest>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let draft = ProfessionalDraft::try_from(&payload.into_inner())?;
    let professional = state.professionals.create(&caller, draft).await?;
    Ok(HttpResponse::Created().json(ProfessionalResponse::from(&professional)))
}

/// List the caller's professionals.
#[utoipa::path(
    get,
    path = "/api/v1/professionals",
    responses(
        (status = 200, description = "Professionals by name", body = [ProfessionalResponse]),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Receptors only", body = Error)
    ),
    tags = ["professionals"],
    operation_id = "listProfessionals"
)]
#[get("/professionals")]
pub async fn list_professionals(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<ProfessionalResponse>>> {
    let caller = session.require_caller()?;
    let professionals = state.professionals.list(&caller).await?;
    Ok(web::Json(
        professionals.iter().map(ProfessionalResponse::from).collect(),
    ))
}

/// Remove a professional; events that referenced it keep no link.
#[utoipa::path(
    delete,
    path = "/api/v1/professionals/{id}",
    params(("id" = uuid::Uuid, Path, description = "Professional id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["professionals"],
    operation_id = "deleteProfessional"
)]
#[delete("/professionals/{id}")]
pub async fn delete_professional(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let caller = session.require_caller()?;
    let id = parse_uuid(&path, FieldName::new("id"))?;
    state.professionals.delete(&caller, id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Professional, Role};
    use crate::inbound::http::state::test_ports::MockPorts;
    use crate::inbound::http::test_utils::{fixed_time, session_cookie, sign_in, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::Value;
    use uuid::Uuid;

    fn scope() -> actix_web::Scope {
        web::scope("/api/v1")
            .service(create_professional)
            .service(list_professionals)
            .service(delete_professional)
    }

    fn body(name: &str, email: Option<&str>) -> ProfessionalRequest {
        ProfessionalRequest {
            name: name.into(),
            specialty: "Cardiology".into(),
            registry_number: Some("CRM-1234".into()),
            phone: None,
            email: email.map(Into::into),
        }
    }

    #[actix_web::test]
    async fn create_returns_the_contact_card() {
        let owner = Uuid::new_v4();
        let mut ports = MockPorts::default();
        ports
            .professionals
            .expect_create()
            .withf(|_, draft| draft.email.as_deref() == Some("helena@clinic.example"))
            .returning(move |_, draft| {
                Ok(Professional {
                    id: Uuid::new_v4(),
                    owner_id: owner,
                    name: draft.name,
                    specialty: draft.specialty,
                    registry_number: draft.registry_number,
                    phone: draft.phone,
                    email: draft.email,
                    created_at: fixed_time(),
                })
            });
        let app = actix_test::init_service(test_app(ports.into_state()).service(scope())).await;
        let login = actix_test::call_service(&app, sign_in(Role::Receptor, owner).to_request()).await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/professionals")
                .cookie(session_cookie(&login))
                .set_json(body("Dr. Helena Prado", Some("Helena@Clinic.example")))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let json: Value = actix_test::read_body_json(res).await;
        assert_eq!(json["registryNumber"], "CRM-1234");
        assert!(json.get("phone").is_none());
    }

    #[rstest]
    #[case(body("  ", None), "name")]
    #[case(body("Dr. Lima", Some("not-an-email")), "email")]
    #[actix_web::test]
    async fn create_rejects_invalid_cards(#[case] request: ProfessionalRequest, #[case] field: &str) {
        let app = actix_test::init_service(
            test_app(MockPorts::default().into_state()).service(scope()),
        )
        .await;
        let login =
            actix_test::call_service(&app, sign_in(Role::Receptor, Uuid::new_v4()).to_request())
                .await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/professionals")
                .cookie(session_cookie(&login))
                .set_json(request)
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json: Value = actix_test::read_body_json(res).await;
        assert_eq!(json["details"]["field"], field);
    }

    #[actix_web::test]
    async fn emissors_are_forbidden() {
        let mut ports = MockPorts::default();
        ports
            .professionals
            .expect_list()
            .returning(|_| Err(Error::forbidden("receptors only")));
        let app = actix_test::init_service(test_app(ports.into_state()).service(scope())).await;
        let login =
            actix_test::call_service(&app, sign_in(Role::Emissor, Uuid::new_v4()).to_request())
                .await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/professionals")
                .cookie(session_cookie(&login))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn delete_returns_no_content() {
        let id = Uuid::new_v4();
        let mut ports = MockPorts::default();
        ports
            .professionals
            .expect_delete()
            .withf(move |_, requested| *requested == id)
            .times(1)
            .returning(|_, _| Ok(()));
        let app = actix_test::init_service(test_app(ports.into_state()).service(scope())).await;
        let login =
            actix_test::call_service(&app, sign_in(Role::Receptor, Uuid::new_v4()).to_request())
                .await;
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri(&format!("/api/v1/professionals/{id}"))
                .cookie(session_cookie(&login))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }
}
