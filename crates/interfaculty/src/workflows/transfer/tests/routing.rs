use super::common::*;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::transfer::domain::{TransferStatus, UserId};
use crate::workflows::transfer::machine::ReviewAction;
use crate::workflows::transfer::memory::{InMemoryDirectory, InMemoryNotifications};
use crate::workflows::transfer::repository::ApplicationRepository;
use crate::workflows::transfer::{transfer_router, TransferService, USER_HEADER};

fn get(uri: &str, user: Option<UserId>) -> Request<Body> {
    let mut request = Request::get(uri);
    if let Some(user) = user {
        request = request.header(USER_HEADER, user.to_string());
    }
    request.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, user: Option<UserId>, payload: &Value) -> Request<Body> {
    let mut request =
        Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        request = request.header(USER_HEADER, user.to_string());
    }
    request
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn requests_without_caller_are_unauthorized() {
    let campus = campus();
    let router = transfer_router(campus.service.clone());

    let response = router
        .oneshot(get("/api/v1/reviews/pending", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json_body(response).await;
    assert_eq!(body["redirect"], "/login");
}

#[tokio::test]
async fn register_then_submit_over_http() {
    let campus = campus();
    let router = transfer_router(campus.service.clone());

    let registration = json!({
        "username": "njeri",
        "password": "pass-1234",
        "confirm_password": "pass-1234",
        "first_name": "Njeri",
        "last_name": "Mwangi",
        "email": "njeri@students.example.edu",
        "admission_number": "SCT/0200/2025",
        "current_program": campus.computer_science.id,
        "current_year": 1,
        "phone": "0722000111"
    });
    let response = router
        .clone()
        .oneshot(post_json("/api/v1/students/register", None, &registration))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let student = read_json_body(response).await;
    let user = UserId(student["user_id"].as_u64().expect("user id"));

    let eligible = router
        .clone()
        .oneshot(get("/api/v1/programs/eligible", Some(user)))
        .await
        .unwrap();
    assert_eq!(eligible.status(), StatusCode::OK);
    let programs = read_json_body(eligible).await;
    assert_eq!(programs.as_array().map(Vec::len), Some(2));

    let submission = json!({
        "requested_program": campus.finance.id,
        "reason": "Interested in markets",
        "academic_year": "2025/2026",
        "semester": 2
    });
    let response = router
        .oneshot(post_json("/api/v1/transfers", Some(user), &submission))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let view = read_json_body(response).await;
    assert_eq!(view["status"], "pending_hod");
    assert_eq!(view["status_label"], "Pending HOD Review");
    assert_eq!(view["semester_label"], "Semester 2");
    assert_eq!(view["student_name"], "Njeri Mwangi");
}

#[tokio::test]
async fn registration_mismatch_is_unprocessable() {
    let campus = campus();
    let router = transfer_router(campus.service.clone());

    let registration = json!({
        "username": "njeri",
        "password": "pass-1234",
        "confirm_password": "pass-9999",
        "first_name": "Njeri",
        "last_name": "Mwangi",
        "email": "njeri@students.example.edu",
        "admission_number": "SCT/0200/2025",
        "current_program": campus.computer_science.id,
        "current_year": 1,
        "phone": "0722000111"
    });
    let response = router
        .oneshot(post_json("/api/v1/students/register", None, &registration))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["redirect"], "/");
}

#[tokio::test]
async fn review_route_maps_workflow_errors() {
    let campus = campus();
    let student = campus.cs_student();
    let application = campus.apply(&student, &campus.finance);
    let router = transfer_router(campus.service.clone());
    let uri = format!("/api/v1/transfers/{}/review", application.id);

    let blank_reject = json!({ "decision": "reject", "comment": "  " });
    let response = router
        .clone()
        .oneshot(post_json(&uri, Some(campus.hod()), &blank_reject))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let wrong_faculty = json!({ "decision": "approve" });
    let response = router
        .clone()
        .oneshot(post_json(&uri, Some(campus.sobe_hod), &wrong_faculty))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json_body(response).await;
    assert_eq!(body["redirect"], "/dashboard/hod");

    let approve = json!({ "decision": "approve", "comment": "ok" });
    let response = router
        .clone()
        .oneshot(post_json(&uri, Some(campus.hod()), &approve))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "hod_approved");
    assert_eq!(body["hod_comment"], "ok");

    let response = router
        .oneshot(post_json(&uri, Some(campus.scit_hod), &approve))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn malformed_submission_keeps_json_error_body() {
    let campus = campus();
    let student = campus.cs_student();
    let router = transfer_router(campus.service.clone());

    let submission = json!({
        "requested_program": campus.finance.id,
        "reason": "Interested in markets",
        "academic_year": "2025/2026",
        "semester": 3
    });
    let response = router
        .oneshot(post_json("/api/v1/transfers", Some(student.user_id), &submission))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    let body = read_json_body(response).await;
    assert_eq!(body["redirect"], "/dashboard/student");
    assert!(body["error"].as_str().is_some_and(|error| error.contains("semester")));
    assert!(campus.repository.list().expect("list").is_empty());
}

#[tokio::test]
async fn review_body_is_checked_after_the_caller() {
    let campus = campus();
    let student = campus.cs_student();
    let application = campus.apply(&student, &campus.finance);
    let router = transfer_router(campus.service.clone());
    let uri = format!("/api/v1/transfers/{}/review", application.id);
    let unknown_decision = json!({ "decision": "maybe" });

    let response = router
        .clone()
        .oneshot(post_json(&uri, None, &unknown_decision))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json_body(response).await;
    assert_eq!(body["redirect"], "/login");

    let response = router
        .oneshot(post_json(&uri, Some(campus.hod()), &unknown_decision))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["redirect"], "/dashboard/hod");
    assert_eq!(
        campus.stored(application.id).status,
        TransferStatus::PendingHod
    );
}

#[tokio::test]
async fn non_numeric_ids_are_validation_errors() {
    let campus = campus();
    let router = transfer_router(campus.service.clone());

    for uri in ["/api/v1/transfers/abc", "/api/v1/reports/students/abc"] {
        let response = router
            .clone()
            .oneshot(get(uri, Some(campus.registrar)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
        let body = read_json_body(response).await;
        assert_eq!(body["redirect"], "/dashboard/registrar");
    }
}

#[tokio::test]
async fn incomplete_registration_falls_back_to_home() {
    let campus = campus();
    let router = transfer_router(campus.service.clone());

    let response = router
        .oneshot(post_json(
            "/api/v1/students/register",
            None,
            &json!({ "username": "njeri" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["redirect"], "/");
}

#[tokio::test]
async fn unknown_application_is_not_found_with_dashboard_fallback() {
    let campus = campus();
    let router = transfer_router(campus.service.clone());

    let response = router
        .oneshot(get("/api/v1/transfers/404", Some(campus.registrar)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["redirect"], "/dashboard/registrar");
}

#[tokio::test]
async fn dashboard_route_tags_role() {
    let campus = campus();
    let student = campus.cs_student();
    let application = campus.apply(&student, &campus.finance);
    campus
        .service
        .hod_review(campus.hod(), application.id, ReviewAction::approve("ok"))
        .expect("hod approves");
    let router = transfer_router(campus.service.clone());

    let response = router
        .oneshot(get("/api/v1/dashboard", Some(campus.sobe_dean)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["role"], "dean");
    assert_eq!(body["pending_count"], 1);
    assert_eq!(body["faculty"]["code"], "SOBE");
}

#[tokio::test]
async fn faculty_report_route_reads_code_query() {
    let campus = campus();
    let student = campus.cs_student();
    campus.apply(&student, &campus.finance);
    let router = transfer_router(campus.service.clone());

    let response = router
        .clone()
        .oneshot(get(
            "/api/v1/reports/faculty?code=SOBE",
            Some(campus.registrar),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["counts"]["total"], 1);
    assert_eq!(body["faculty"]["name"], campus.sobe.name.as_str());

    let response = router
        .oneshot(get(
            "/api/v1/reports/faculty?code=NOPE",
            Some(campus.registrar),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn summary_route_flattens_counts() {
    let campus = campus();
    let student = campus.cs_student();
    campus.apply(&student, &campus.finance);
    let router = transfer_router(campus.service.clone());

    let response = router
        .oneshot(get("/api/v1/reports/summary", Some(campus.scit_hod)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["scope_label"], campus.scit.name.as_str());
    assert_eq!(body["total"], 1);
    assert_eq!(body["pending"], 1);
}

#[tokio::test]
async fn export_route_streams_csv_attachment() {
    let campus = campus();
    let student = campus.cs_student();
    campus.apply(&student, &campus.finance);
    let router = transfer_router(campus.service.clone());

    let response = router
        .oneshot(get("/api/v1/reports/export.csv", Some(campus.admin)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .expect("ascii header")
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"transfer_applications_"));

    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    let text = String::from_utf8(body.to_vec()).expect("utf8");
    let mut lines = text.lines();
    assert!(lines
        .next()
        .is_some_and(|header| header.starts_with("Application ID,Date,Student Name")));
    assert!(lines.next().is_some_and(|row| row.contains("Pending HOD Review")));
}

#[tokio::test]
async fn pending_handler_returns_internal_error_on_repository_failure() {
    let campus = campus();
    let service = Arc::new(TransferService::new(
        Arc::new(UnavailableRepository),
        campus.directory.clone(),
        campus.notifications.clone(),
    ));
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_HEADER,
        HeaderValue::from_str(&campus.hod().to_string()).expect("header value"),
    );

    let response = crate::workflows::transfer::router::pending_handler::<
        UnavailableRepository,
        InMemoryDirectory,
        InMemoryNotifications,
    >(State(service), headers)
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json_body(response).await;
    assert_eq!(body["redirect"], "/dashboard/hod");
}
