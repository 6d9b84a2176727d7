//! Administration endpoints, per-client rate limits and health checks on a
//! fully wired in-memory portal.

use actix_web::http::StatusCode;
use actix_web::http::header::RETRY_AFTER;
use actix_web::test as actix_test;
use portal::test_support::portal::TestPortal;
use serde_json::json;

mod support;

use support::{PASSWORD, get, login, post_json, register, send, upload_pdf};

const ADMIN_EMAIL: &str = "root@portal.example";

#[actix_web::test]
async fn admin_sees_flow_statistics_and_manages_accounts() {
    let portal = TestPortal::new();
    let admin = portal.seed_admin(ADMIN_EMAIL, PASSWORD).await;
    let app = actix_test::init_service(portal.app()).await;
    let (lab, _) = register(&app, "lab@example.com", "emissor").await;
    let (patient, patient_id) = register(&app, "patient@example.com", "receptor").await;
    let file_id = upload_pdf(&app, &lab, "tsh.pdf", b"%PDF tsh").await;
    post_json(
        &app,
        &lab,
        "/api/v1/reports",
        json!({ "receptorEmail": "patient@example.com", "fileId": file_id, "title": "TSH" }),
    )
    .await;

    let forbidden = get(&app, &patient, "/api/v1/admin/stats").await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let signed_in = login(&app, ADMIN_EMAIL, PASSWORD).await;
    assert_eq!(signed_in.status, StatusCode::OK);
    let root = signed_in.cookie.expect("admin session");

    let stats = get(&app, &root, "/api/v1/admin/stats").await;
    assert_eq!(stats.status, StatusCode::OK);
    assert_eq!(
        stats.body,
        json!({
            "reportsSent": 1,
            "reportsViewed": 0,
            "reportsArchived": 0,
            "receptors": 1,
            "emissors": 1,
            "admins": 1,
        })
    );

    let receptors = get(&app, &root, "/api/v1/admin/users?role=receptor").await;
    let rows = receptors.body["data"].as_array().expect("data array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], patient_id.as_str());

    let deactivated = send(
        &app,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/v1/admin/users/{patient_id}"))
            .cookie(root.clone())
            .set_json(json!({ "active": false }))
            .to_request(),
    )
    .await;
    assert_eq!(deactivated.status, StatusCode::OK);
    assert_eq!(deactivated.body["active"], false);

    let refused = login(&app, "patient@example.com", PASSWORD).await;
    assert_eq!(refused.status, StatusCode::UNAUTHORIZED);

    let self_lockout = send(
        &app,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/v1/admin/users/{}", admin.id))
            .cookie(root.clone())
            .set_json(json!({ "active": false }))
            .to_request(),
    )
    .await;
    assert_eq!(self_lockout.status, StatusCode::FORBIDDEN);

    let failures = get(&app, &root, "/api/v1/admin/audit?action=login_failed").await;
    assert_eq!(failures.status, StatusCode::OK);
    let records = failures.body["data"].as_array().expect("data array");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["resourceType"], "user");

    let sent = get(&app, &root, "/api/v1/admin/audit?action=report_sent").await;
    assert_eq!(sent.body["data"].as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn deactivation_ends_open_sessions() {
    let portal = TestPortal::new();
    portal.seed_admin(ADMIN_EMAIL, PASSWORD).await;
    let app = actix_test::init_service(portal.app()).await;
    let (patient, patient_id) = register(&app, "patient@example.com", "receptor").await;
    let root = login(&app, ADMIN_EMAIL, PASSWORD)
        .await
        .cookie
        .expect("admin session");

    let before = get(&app, &patient, "/api/v1/reports/received").await;
    assert_eq!(before.status, StatusCode::OK);

    let deactivated = send(
        &app,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/v1/admin/users/{patient_id}"))
            .cookie(root)
            .set_json(json!({ "active": false }))
            .to_request(),
    )
    .await;
    assert_eq!(deactivated.status, StatusCode::OK);

    let inbox = get(&app, &patient, "/api/v1/reports/received").await;
    assert_eq!(inbox.status, StatusCode::UNAUTHORIZED);
    let upload = send(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/files")
            .cookie(patient.clone())
            .insert_header(("Content-Type", "application/pdf"))
            .insert_header(("X-File-Name", "late.pdf"))
            .set_payload(b"%PDF late".to_vec())
            .to_request(),
    )
    .await;
    assert_eq!(upload.status, StatusCode::UNAUTHORIZED);
    let links = get(&app, &patient, "/api/v1/share-links").await;
    assert_eq!(links.status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn audit_filter_rejects_unknown_actions() {
    let portal = TestPortal::new();
    portal.seed_admin(ADMIN_EMAIL, PASSWORD).await;
    let app = actix_test::init_service(portal.app()).await;
    let root = login(&app, ADMIN_EMAIL, PASSWORD)
        .await
        .cookie
        .expect("admin session");

    let reply = get(&app, &root, "/api/v1/admin/audit?action=teleported").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.str("code"), "invalid_request");
}

#[actix_web::test]
async fn strict_limit_throttles_login_attempts_per_client() {
    let portal = TestPortal::rate_limited();
    let app = actix_test::init_service(portal.app()).await;
    let attempt = |ip: &'static str| {
        actix_test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .insert_header(("X-Forwarded-For", ip))
            .set_json(json!({ "email": "ghost@example.com", "password": "wrong-pass" }))
            .to_request()
    };

    for _ in 0..10 {
        let res = actix_test::call_service(&app, attempt("203.0.113.9")).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
    let limited = actix_test::call_service(&app, attempt("203.0.113.9")).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = limited
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .expect("retry-after header");
    assert!(retry_after >= 1);

    let other_client = actix_test::call_service(&app, attempt("198.51.100.4")).await;
    assert_eq!(other_client.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn strict_limit_leaves_authenticated_routes_alone() {
    let portal = TestPortal::rate_limited();
    let app = actix_test::init_service(portal.app()).await;
    let (cookie, _) = register(&app, "busy@example.com", "receptor").await;

    for _ in 0..15 {
        let reply = send(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/users/me")
                .insert_header(("X-Forwarded-For", "192.0.2.50"))
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(reply.status, StatusCode::OK);
    }
}

#[actix_web::test]
async fn health_checks_answer_outside_the_api_scope() {
    let portal = TestPortal::new();
    let app = actix_test::init_service(portal.app()).await;

    for uri in ["/health/ready", "/health/live"] {
        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request())
            .await;
        assert_eq!(res.status(), StatusCode::OK, "{uri}");
    }
}
