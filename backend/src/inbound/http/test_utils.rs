//! Test helpers for inbound HTTP components.

use actix_session::{Session, SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key, SameSite};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, test, web};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use super::session::{ROLE_KEY, USER_ID_KEY};
use super::session_config::{SESSION_COOKIE_NAME, SessionSettings};
use super::state::HttpState;
use super::validation::{json_config, query_config};
use crate::domain::{
    DisplayName, Email, PasswordDigest, Report, ReportStatus, Role, StorageBackend, StoredFile,
    User,
};

/// Session middleware with a fresh key and an insecure cookie for plain
/// HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionSettings {
        key: Key::generate(),
        cookie_secure: false,
        same_site: SameSite::Lax,
    }
    .middleware()
}

/// Session cookie set by `res`.
///
/// # Panics
///
/// Panics when the response sets no session cookie.
pub fn session_cookie<B>(res: &ServiceResponse<B>) -> Cookie<'static> {
    res.response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(Cookie::into_owned)
        .expect("session cookie set")
}

/// Route registering `GET /test-login/{role}/{id}`, which signs the client
/// in without credentials.
pub fn sign_in_route(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/test-login/{role}/{id}",
        web::get().to(|session: Session, path: web::Path<(String, Uuid)>| async move {
            let (role, id) = path.into_inner();
            session.insert(USER_ID_KEY, id.to_string()).expect("store id");
            session.insert(ROLE_KEY, role).expect("store role");
            HttpResponse::Ok().finish()
        }),
    );
}

/// `GET` request hitting [`sign_in_route`] for `role` and `id`.
pub fn sign_in(role: Role, id: Uuid) -> test::TestRequest {
    test::TestRequest::get().uri(&format!("/test-login/{}/{id}", role.as_str()))
}

/// App wired like production minus rate limiting: session cookies,
/// extractor configs, [`sign_in_route`] and `state`. Tests add the
/// handlers under test with `.service(web::scope("/api/v1")...)`.
pub fn test_app(
    state: HttpState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(json_config(64 * 1024))
        .app_data(query_config())
        .app_data(web::Data::new(state))
        .wrap(test_session_middleware())
        .configure(sign_in_route)
}

/// Fixed instant used by fixtures.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
        .single()
        .expect("valid fixture time")
}

pub fn user_fixture(role: Role) -> User {
    User {
        id: Uuid::new_v4(),
        email: Email::parse(&format!("{}@example.com", role.as_str())).expect("email"),
        display_name: DisplayName::parse("Ana Souza").expect("display name"),
        role,
        active: true,
        password: PasswordDigest::from_stored("$argon2id$fixture"),
        created_at: fixed_time(),
    }
}

pub fn file_fixture(owner_id: Uuid) -> StoredFile {
    let id = Uuid::new_v4();
    StoredFile {
        id,
        owner_id,
        original_name: "hemograma.pdf".to_owned(),
        content_type: "application/pdf".to_owned(),
        size_bytes: 4,
        storage_backend: StorageBackend::Local,
        storage_key: crate::domain::storage_key(owner_id, id),
        public_url: None,
        created_at: fixed_time(),
    }
}

pub fn report_fixture(emissor_id: Uuid, receptor_id: Uuid) -> Report {
    Report {
        id: Uuid::new_v4(),
        emissor_id,
        receptor_id,
        file_id: Uuid::new_v4(),
        title: "Complete blood count".to_owned(),
        protocol: Some("LAB-1".to_owned()),
        status: ReportStatus::Sent,
        sent_at: fixed_time(),
        viewed_at: None,
    }
}
