//! Shared helpers for end-to-end portal tests.
//!
//! Integration tests compile as separate crates, so the request builders
//! every flow needs live here rather than being copied into each file.

#![allow(dead_code, reason = "each test crate uses a different subset")]

use actix_http::Request;
use actix_web::body::BoxBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use serde_json::{Value, json};

/// Session cookie name issued by the portal.
pub const SESSION_COOKIE: &str = "portal_session";

pub const PASSWORD: &str = "s3cret-pass";

/// Status and parsed JSON body of one response.
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
    pub cookie: Option<Cookie<'static>>,
}

impl Reply {
    pub fn str(&self, field: &str) -> &str {
        self.body[field]
            .as_str()
            .unwrap_or_else(|| panic!("field {field} missing from {}", self.body))
    }
}

async fn finish(res: ServiceResponse<BoxBody>) -> Reply {
    let status = res.status();
    let cookie = res
        .response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(Cookie::into_owned);
    let bytes = actix_test::read_body(res).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    Reply {
        status,
        body,
        cookie,
    }
}

/// Send `req` and capture the reply.
pub async fn send<S>(app: &S, req: Request) -> Reply
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    finish(actix_test::call_service(app, req).await).await
}

/// Register an account and return its session cookie and id.
pub async fn register<S>(app: &S, email: &str, role: &str) -> (Cookie<'static>, String)
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    let reply = send(
        app,
        actix_test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({
                "email": email,
                "password": PASSWORD,
                "displayName": "Test Person",
                "role": role,
            }))
            .to_request(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "register {email}: {}", reply.body);
    let id = reply.str("id").to_owned();
    (reply.cookie.expect("session cookie"), id)
}

/// Log in and return the session cookie.
pub async fn login<S>(app: &S, email: &str, password: &str) -> Reply
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    send(
        app,
        actix_test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "email": email, "password": password }))
            .to_request(),
    )
    .await
}

/// Upload `bytes` as a PDF owned by the cookie's user; returns the file id.
pub async fn upload_pdf<S>(app: &S, cookie: &Cookie<'static>, name: &str, bytes: &[u8]) -> String
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    let reply = send(
        app,
        actix_test::TestRequest::post()
            .uri("/api/v1/files")
            .cookie(cookie.clone())
            .insert_header(("Content-Type", "application/pdf"))
            .insert_header(("X-File-Name", name))
            .set_payload(bytes.to_vec())
            .to_request(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CREATED, "upload: {}", reply.body);
    reply.str("id").to_owned()
}

/// Authenticated GET.
pub async fn get<S>(app: &S, cookie: &Cookie<'static>, uri: &str) -> Reply
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    send(
        app,
        actix_test::TestRequest::get()
            .uri(uri)
            .cookie(cookie.clone())
            .to_request(),
    )
    .await
}

/// Authenticated JSON POST.
pub async fn post_json<S>(app: &S, cookie: &Cookie<'static>, uri: &str, body: Value) -> Reply
where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>,
{
    send(
        app,
        actix_test::TestRequest::post()
            .uri(uri)
            .cookie(cookie.clone())
            .set_json(body)
            .to_request(),
    )
    .await
}
