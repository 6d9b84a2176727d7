//! End-to-end coverage of the report lifecycle: an emissor uploads and
//! sends, the receptor reads and archives, and batches run on the worker.

use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use portal::test_support::portal::TestPortal;
use serde_json::json;

mod support;

use support::{PASSWORD, get, login, post_json, register, send, upload_pdf};

#[actix_web::test]
async fn registered_user_sees_own_profile_and_can_log_back_in() {
    let portal = TestPortal::new();
    let app = actix_test::init_service(portal.app()).await;

    let (cookie, id) = register(&app, "ana@example.com", "receptor").await;
    let me = get(&app, &cookie, "/api/v1/users/me").await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.str("id"), id);
    assert_eq!(me.str("role"), "receptor");
    assert!(me.body.get("password").is_none());

    let wrong = login(&app, "ana@example.com", "not-the-pass").await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    let ok = login(&app, "ANA@example.com", PASSWORD).await;
    assert_eq!(ok.status, StatusCode::OK);
    assert!(ok.cookie.is_some());

    let anonymous = send(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/users/me")
            .to_request(),
    )
    .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.str("code"), "unauthorized");
}

#[actix_web::test]
async fn duplicate_registration_conflicts() {
    let portal = TestPortal::new();
    let app = actix_test::init_service(portal.app()).await;
    register(&app, "dup@example.com", "emissor").await;

    let again = send(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({
                "email": "dup@example.com",
                "password": PASSWORD,
                "displayName": "Someone Else",
                "role": "receptor",
            }))
            .to_request(),
    )
    .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn report_travels_from_emissor_to_receptor_inbox() {
    let portal = TestPortal::new();
    let app = actix_test::init_service(portal.app()).await;
    let (lab, _) = register(&app, "lab@example.com", "emissor").await;
    let (patient, patient_id) = register(&app, "patient@example.com", "receptor").await;
    let (stranger, _) = register(&app, "stranger@example.com", "receptor").await;

    let file_id = upload_pdf(&app, &lab, "hemograma.pdf", b"%PDF-1.7 blood count").await;
    let sent = post_json(
        &app,
        &lab,
        "/api/v1/reports",
        json!({
            "receptorEmail": "patient@example.com",
            "fileId": file_id,
            "title": "Complete blood count",
            "protocol": "LAB-2026-0042",
        }),
    )
    .await;
    assert_eq!(sent.status, StatusCode::CREATED, "{}", sent.body);
    assert_eq!(sent.str("status"), "sent");
    assert_eq!(sent.str("receptorId"), patient_id);
    let report_id = sent.str("id").to_owned();

    let inbox = get(&app, &patient, "/api/v1/notifications").await;
    assert_eq!(inbox.status, StatusCode::OK);
    let notifications = inbox.body["data"].as_array().expect("data array");
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["reportId"], report_id.as_str());
    assert_eq!(notifications[0]["status"], "unread");
    let notification_id = notifications[0]["id"].as_str().expect("id").to_owned();

    let hidden = get(&app, &stranger, &format!("/api/v1/reports/{report_id}")).await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);

    let opened = get(&app, &patient, &format!("/api/v1/reports/{report_id}")).await;
    assert_eq!(opened.status, StatusCode::OK);
    assert_eq!(opened.str("status"), "viewed");
    assert!(opened.body.get("viewedAt").is_some());

    let outbox = get(&app, &lab, "/api/v1/reports/sent").await;
    assert_eq!(outbox.body["data"][0]["status"], "viewed");

    let archived = post_json(
        &app,
        &patient,
        &format!("/api/v1/notifications/{notification_id}/archive"),
        json!({}),
    )
    .await;
    assert_eq!(archived.status, StatusCode::OK);
    assert_eq!(archived.str("status"), "archived");

    let report = get(&app, &patient, &format!("/api/v1/reports/{report_id}")).await;
    assert_eq!(report.str("status"), "archived");

    let unread = get(&app, &patient, "/api/v1/notifications?status=unread").await;
    assert_eq!(unread.body["data"].as_array().map(Vec::len), Some(0));
}

#[actix_web::test]
async fn receptors_cannot_send_reports() {
    let portal = TestPortal::new();
    let app = actix_test::init_service(portal.app()).await;
    let (patient, _) = register(&app, "patient@example.com", "receptor").await;
    let file_id = upload_pdf(&app, &patient, "exam.pdf", b"%PDF-1.4").await;

    let attempt = post_json(
        &app,
        &patient,
        "/api/v1/reports",
        json!({
            "receptorEmail": "patient@example.com",
            "fileId": file_id,
            "title": "Self report",
        }),
    )
    .await;
    assert_eq!(attempt.status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn batch_is_dispatched_by_the_worker_and_reports_progress() {
    let portal = TestPortal::new();
    let app = actix_test::init_service(portal.app()).await;
    let (lab, _) = register(&app, "lab@example.com", "emissor").await;
    let (patient, _) = register(&app, "patient@example.com", "receptor").await;
    let first = upload_pdf(&app, &lab, "a.pdf", b"%PDF first").await;
    let second = upload_pdf(&app, &lab, "b.pdf", b"%PDF second").await;

    let queued = post_json(
        &app,
        &lab,
        "/api/v1/reports/batch",
        json!({ "items": [
            { "receptorEmail": "patient@example.com", "fileId": first, "title": "Lipids" },
            { "receptorEmail": "patient@example.com", "fileId": second, "title": "Glucose" },
            { "receptorEmail": "nobody@example.com", "fileId": second, "title": "Lost" },
        ]}),
    )
    .await;
    assert_eq!(queued.status, StatusCode::ACCEPTED, "{}", queued.body);
    assert_eq!(queued.str("state"), "queued");
    assert_eq!(queued.body["total"], 3);
    let job_id = queued.str("id").to_owned();

    assert!(portal.worker.run_once().await.expect("worker tick"));
    assert!(!portal.worker.run_once().await.expect("idle tick"));

    let status = get(&app, &lab, &format!("/api/v1/jobs/{job_id}")).await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.str("state"), "completed");
    assert_eq!(status.body["processed"], 3);
    assert!(status.str("message").contains("1 failed"));

    let received = get(&app, &patient, "/api/v1/reports/received").await;
    assert_eq!(received.body["data"].as_array().map(Vec::len), Some(2));

    let foreign = get(&app, &patient, &format!("/api/v1/jobs/{job_id}")).await;
    assert_eq!(foreign.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn oversized_batches_are_rejected_before_queueing() {
    let portal = TestPortal::new();
    let app = actix_test::init_service(portal.app()).await;
    let (lab, _) = register(&app, "lab@example.com", "emissor").await;

    let items: Vec<_> = (0..101)
        .map(|i| {
            json!({
                "receptorEmail": "patient@example.com",
                "fileId": "00000000-0000-4000-8000-000000000000",
                "title": format!("Report {i}"),
            })
        })
        .collect();
    let reply = post_json(&app, &lab, "/api/v1/reports/batch", json!({ "items": items })).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert!(!portal.worker.run_once().await.expect("idle tick"));
}

#[actix_web::test]
async fn files_backing_a_report_cannot_be_deleted() {
    let portal = TestPortal::new();
    let app = actix_test::init_service(portal.app()).await;
    let (lab, _) = register(&app, "lab@example.com", "emissor").await;
    register(&app, "patient@example.com", "receptor").await;
    let file_id = upload_pdf(&app, &lab, "mri.pdf", b"%PDF mri").await;
    let spare = upload_pdf(&app, &lab, "spare.pdf", b"%PDF spare").await;
    post_json(
        &app,
        &lab,
        "/api/v1/reports",
        json!({ "receptorEmail": "patient@example.com", "fileId": file_id, "title": "MRI" }),
    )
    .await;

    let blocked = send(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/files/{file_id}"))
            .cookie(lab.clone())
            .to_request(),
    )
    .await;
    assert_eq!(blocked.status, StatusCode::CONFLICT);

    let removed = send(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/files/{spare}"))
            .cookie(lab.clone())
            .to_request(),
    )
    .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);

    let download = send(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/files/{file_id}"))
            .cookie(lab)
            .to_request(),
    )
    .await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(download.body, "%PDF mri");
}
