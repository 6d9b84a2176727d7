//! Tests for share link handlers.

use super::*;
use crate::domain::{
    CreatedShareLink, FileContent, Role, ShareLink, ShareToken, SharedBundle,
};
use crate::inbound::http::state::test_ports::MockPorts;
use crate::inbound::http::test_utils::{
    file_fixture, fixed_time, session_cookie, sign_in, test_app,
};
use actix_web::http::{StatusCode, header};
use actix_web::test as actix_test;
use chrono::Duration;
use rstest::rstest;
use serde_json::Value;
use uuid::Uuid;

const TOKEN: &str = "9f2c4e6a8b0d1f3e5a7c9e1b3d5f7a9c2e4f6a8b0c1d3e5f7a9b1c3d5e7f9a0b";

fn scope() -> actix_web::Scope {
    web::scope("/api/v1")
        .service(create_share_link)
        .service(list_share_links)
        .service(revoke_share_link)
        .service(shared_scope())
}

fn link(owner_id: Uuid, file_ids: Vec<Uuid>) -> ShareLink {
    ShareLink {
        id: Uuid::new_v4(),
        owner_id,
        token_hash: ShareToken::presented(TOKEN).digest(),
        file_ids,
        expires_at: fixed_time() + Duration::hours(24),
        max_accesses: Some(3),
        access_count: 0,
        revoked_at: None,
        created_at: fixed_time(),
    }
}

#[actix_web::test]
async fn create_returns_token_once() {
    let owner = Uuid::new_v4();
    let file = Uuid::new_v4();
    let mut ports = MockPorts::default();
    ports
        .share_links
        .expect_create()
        .withf(move |_, draft| draft.file_ids == vec![file] && draft.max_accesses == Some(3))
        .returning(move |_, draft| {
            Ok(CreatedShareLink {
                link: link(owner, draft.file_ids),
                token: ShareToken::presented(TOKEN),
                url: format!("https://portal.example/shared/{TOKEN}"),
            })
        });
    let created = link(owner, vec![file]);
    ports
        .share_links
        .expect_list()
        .returning(move |_| Ok(vec![created.clone()]));
    let app = actix_test::init_service(test_app(ports.into_state()).service(scope())).await;
    let login = actix_test::call_service(&app, sign_in(Role::Receptor, owner).to_request()).await;
    let cookie = session_cookie(&login);

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/share-links")
            .cookie(cookie.clone())
            .set_json(CreateShareLinkRequest {
                file_ids: vec![file.to_string()],
                expires_in_hours: 24,
                max_accesses: Some(3),
            })
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["token"], TOKEN);
    assert_eq!(body["link"]["maxAccesses"], 3);
    assert!(body["link"].get("tokenHash").is_none());

    let listed = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/share-links")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    let listed: Value = actix_test::read_body_json(listed).await;
    assert!(listed[0].get("token").is_none());
}

#[rstest]
#[case(Vec::new(), 24, None, "fileIds")]
#[case(vec![Uuid::nil().to_string()], 0, None, "expiresInHours")]
#[case(vec![Uuid::nil().to_string()], 169, None, "expiresInHours")]
#[case(vec![Uuid::nil().to_string()], 24, Some(0), "maxAccesses")]
#[actix_web::test]
async fn create_validates_the_draft(
    #[case] file_ids: Vec<String>,
    #[case] expires_in_hours: u32,
    #[case] max_accesses: Option<u32>,
    #[case] field: &str,
) {
    let mut ports = MockPorts::default();
    ports.share_links.expect_create().never();
    let app = actix_test::init_service(test_app(ports.into_state()).service(scope())).await;
    let login =
        actix_test::call_service(&app, sign_in(Role::Emissor, Uuid::new_v4()).to_request()).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/share-links")
            .cookie(session_cookie(&login))
            .set_json(CreateShareLinkRequest {
                file_ids,
                expires_in_hours,
                max_accesses,
            })
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["details"]["field"], field);
}

#[actix_web::test]
async fn anonymous_visitors_can_resolve_tokens() {
    let owner = Uuid::new_v4();
    let file = file_fixture(owner);
    let bundle = SharedBundle {
        link: link(owner, vec![file.id]),
        files: vec![file],
    };
    let mut ports = MockPorts::default();
    ports
        .share_links
        .expect_resolve()
        .withf(|caller, token| caller.access.user_id().is_none() && token == TOKEN)
        .times(1)
        .returning(move |_, _| Ok(bundle.clone()));
    let app = actix_test::init_service(test_app(ports.into_state()).service(scope())).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/shared/{TOKEN}"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["files"][0]["originalName"], "hemograma.pdf");
    assert!(body["files"][0].get("ownerId").is_none());
}

#[actix_web::test]
async fn oversized_tokens_look_unknown() {
    let mut ports = MockPorts::default();
    ports.share_links.expect_resolve().never();
    let app = actix_test::init_service(test_app(ports.into_state()).service(scope())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/shared/{}", "a".repeat(TOKEN_MAX + 1)))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn shared_downloads_stream_the_file() {
    let file = file_fixture(Uuid::new_v4());
    let file_id = file.id;
    let mut ports = MockPorts::default();
    ports
        .share_links
        .expect_download()
        .withf(move |_, token, id| token == TOKEN && *id == file_id)
        .returning(move |_, _, _| {
            Ok(FileContent::Bytes {
                file: file.clone(),
                bytes: b"%PDF".to_vec(),
            })
        });
    let app = actix_test::init_service(test_app(ports.into_state()).service(scope())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/shared/{TOKEN}/files/{file_id}"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key(header::CONTENT_DISPOSITION));
}

#[actix_web::test]
async fn revoke_returns_the_revoked_link() {
    let owner = Uuid::new_v4();
    let mut revoked = link(owner, vec![Uuid::new_v4()]);
    revoked.revoked_at = Some(fixed_time());
    let id = revoked.id;
    let mut ports = MockPorts::default();
    ports
        .share_links
        .expect_revoke()
        .withf(move |_, requested| *requested == id)
        .returning(move |_, _| Ok(revoked.clone()));
    let app = actix_test::init_service(test_app(ports.into_state()).service(scope())).await;
    let login = actix_test::call_service(&app, sign_in(Role::Receptor, owner).to_request()).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/share-links/{id}"))
            .cookie(session_cookie(&login))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert!(body.get("revokedAt").is_some());
}
