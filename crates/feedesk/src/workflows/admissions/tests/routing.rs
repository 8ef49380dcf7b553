use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::workflows::admissions::router::submit_handler;
use crate::workflows::admissions::AdmissionService;

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn submit_handler_returns_unprocessable_for_missing_fields() {
    let (service, _) = build_service();
    let mut incomplete = submission("Riya");
    incomplete.class = " ".to_string();

    let response = submit_handler(State(Arc::new(service)), axum::Json(incomplete)).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], json!("class is required"));
}

#[tokio::test]
async fn submit_handler_returns_internal_error_on_repository_failure() {
    let service = Arc::new(AdmissionService::new(Arc::new(UnavailableRepository)));
    let response = submit_handler(State(service), axum::Json(submission("Riya"))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn router_runs_submit_decide_and_roster() {
    let (service, _) = build_service();
    let router = admission_router_with_service(service);

    let payload = serde_json::to_value(submission("Riya")).expect("payload");
    let response = router
        .clone()
        .oneshot(json_request("/api/v1/admissions", payload))
        .await
        .expect("submit");
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], json!("Pending"));
    assert_eq!(body["id"], json!("adm-000001"));

    let response = router
        .clone()
        .oneshot(get_request("/api/v1/admissions/pending"))
        .await
        .expect("pending");
    let body = read_json_body(response).await;
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    let response = router
        .clone()
        .oneshot(json_request(
            "/api/v1/admissions/pending/0/decision",
            json!({ "action": "Approve", "comment": "documents verified" }),
        ))
        .await
        .expect("decide");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], json!("Approved"));
    assert_eq!(body["admin_comment"], json!("documents verified"));

    let response = router
        .clone()
        .oneshot(get_request("/api/v1/admissions/roster"))
        .await
        .expect("roster");
    let body = read_json_body(response).await;
    assert_eq!(body[0]["student_name"], json!("Riya"));

    let response = router
        .oneshot(get_request("/api/v1/admissions/roster.csv"))
        .await
        .expect("roster csv");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/csv")
    );
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("csv body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf8");
    assert!(text.starts_with("Timestamp,Student Name,"));
    assert!(text.contains("Riya"));
}

#[tokio::test]
async fn deciding_an_empty_queue_is_not_found() {
    let (service, _) = build_service();
    let router = admission_router_with_service(service);

    let response = router
        .oneshot(json_request(
            "/api/v1/admissions/pending/3/decision",
            json!({ "action": "Reject" }),
        ))
        .await
        .expect("decide");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], json!("no pending admission at position 3"));
}
