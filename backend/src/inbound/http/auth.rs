//! Account registration and session handlers.
//!
//! ```text
//! POST /api/v1/auth/register {"email":"ana@example.com","password":"s3cret-pass","displayName":"Ana","role":"receptor"}
//! POST /api/v1/auth/login {"email":"ana@example.com","password":"s3cret-pass"}
//! POST /api/v1/auth/logout
//! ```

use std::str::FromStr;

use actix_web::{HttpResponse, Scope, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{
    Error, Password, Registration, RegistrationError, Role, UserValidationError,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::UserResponse;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// `/auth` routes, mounted under `/api/v1` behind the strict rate limit.
pub fn scope() -> Scope {
    web::scope("/auth")
        .service(register)
        .service(login)
        .service(logout)
}

/// Registration body for `POST /api/v1/auth/register`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[schema(example = "ana@example.com")]
    pub email: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    #[schema(example = "Ana Souza")]
    pub display_name: String,
    /// `receptor` or `emissor`.
    #[schema(example = "receptor")]
    pub role: String,
}

/// Login body for `POST /api/v1/auth/login`.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[schema(example = "ana@example.com")]
    pub email: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
}

impl TryFrom<&RegisterRequest> for Registration {
    type Error = Error;

    fn try_from(value: &RegisterRequest) -> Result<Self, Self::Error> {
        let role = Role::from_str(value.role.trim()).map_err(map_registration_field)?;
        Registration::try_from_parts(&value.email, &value.password, &value.display_name, role)
            .map_err(map_registration_error)
    }
}

fn map_registration_error(err: RegistrationError) -> Error {
    match err {
        RegistrationError::Field(field) => map_registration_field(field),
        RegistrationError::AdminSelfRegistration => {
            Error::forbidden("admin accounts cannot self-register")
                .with_details(json!({ "field": "role", "code": "admin_not_allowed" }))
        }
    }
}

fn map_registration_field(err: UserValidationError) -> Error {
    let (field, code) = match &err {
        UserValidationError::InvalidEmail => ("email", "invalid_email"),
        UserValidationError::DisplayNameLength { .. } => ("displayName", "invalid_length"),
        UserValidationError::PasswordTooShort { .. } => ("password", "too_short"),
        UserValidationError::UnknownRole(_) => ("role", "invalid_role"),
    };
    Error::invalid_request(err.to_string()).with_details(json!({ "field": field, "code": code }))
}

/// Create a receptor or emissor account and sign it in.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = Error),
        (status = 403, description = "Admin self-registration", body = Error),
        (status = 409, description = "Email already registered", body = Error),
        (status = 429, description = "Too many requests", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["auth"],
    operation_id = "register",
    security([])
)]
#[post("/register")]
pub async fn register(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let registration = Registration::try_from(&payload.into_inner())?;
    let caller = session.caller()?;
    let user = state.accounts.register(&caller, registration).await?;
    session.persist_user(&user)?;
    Ok(HttpResponse::Created().json(UserResponse::from(&user)))
}

/// Authenticate with email and password and establish a session.
///
/// Unknown emails, wrong passwords and deactivated accounts all return the
/// same `401` so the response does not reveal which accounts exist.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = UserResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials", body = Error),
        (status = 429, description = "Too many requests", body = Error),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let LoginRequest { email, password } = payload.into_inner();
    if email.trim().is_empty() {
        return Err(Error::invalid_request("email must not be empty")
            .with_details(json!({ "field": "email", "code": "empty_email" })));
    }
    if password.is_empty() {
        return Err(Error::invalid_request("password must not be empty")
            .with_details(json!({ "field": "password", "code": "empty_password" })));
    }
    let caller = session.caller()?;
    let user = state
        .accounts
        .login(&caller, &email, Password::for_login(&password))
        .await?;
    session.persist_user(&user)?;
    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}

/// End the current session. Succeeds even when nobody is signed in.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tags = ["auth"],
    operation_id = "logout",
    security([])
)]
#[post("/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.clear();
    HttpResponse::NoContent().finish()
}
