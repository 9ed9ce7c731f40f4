mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt; // for `oneshot`
use uuid::Uuid;

use common::{FailingStorage, FakeConverter, Harness};
use lessonpdf::api::{router, state::AppState};
use lessonpdf::config::PipelineConfig;

fn test_settings() -> PipelineConfig {
    let settings = r#"
batch_workers = 2
retry_workers = 1
cleanup_workers = 1
page_delete_workers = 2
page_save_workers = 2
pending_limit = 2
    "#;

    toml::from_str(settings).expect("Failed to parse test settings")
}

fn build_test_app(converter: FakeConverter) -> (Router, Harness) {
    let harness = Harness::with_settings(converter, FailingStorage::new([]), test_settings());
    let state = AppState::new(harness.processor.clone()).with_store(harness.store.clone());
    (router(state), harness)
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let (app, harness) = build_test_app(FakeConverter::with_pages(1));
    harness.add_pdf_lesson();

    let (status, body) = send(&app, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["lesson_count"], 1);
}

#[tokio::test]
async fn test_process_lesson_endpoint() {
    let (app, harness) = build_test_app(FakeConverter::with_pages(2));
    let lesson_id = harness.add_pdf_lesson();

    let (status, body) = send(&app, "POST", &format!("/lessons/{lesson_id}/pdf/process")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "done");
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["processed_pages"], 2);

    let (status, body) = send(&app, "GET", &format!("/lessons/{lesson_id}/pdf")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["asset"]["status"], "done");

    let (status, body) = send(&app, "GET", &format!("/lessons/{lesson_id}/pdf/pages")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["page_number"], 1);
}

#[tokio::test]
async fn test_error_mapping() {
    let (app, harness) = build_test_app(FakeConverter::failing());

    let (status, body) = send(&app, "POST", &format!("/lessons/{}/pdf/process", Uuid::now_v7())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let video = Uuid::now_v7();
    harness.add_lesson(video, Some("https://cdn.example.com/intro.mp4".into()));
    let (status, body) = send(&app, "POST", &format!("/lessons/{video}/pdf/process")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let lesson_id = harness.add_pdf_lesson();
    let (status, body) = send(&app, "POST", &format!("/lessons/{lesson_id}/pdf/process")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL_ERROR");

    let (status, body) = send(&app, "GET", "/lessons/not-a-uuid/pdf").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_pages_of_lesson_without_asset() {
    let (app, harness) = build_test_app(FakeConverter::with_pages(1));
    let lesson_id = harness.add_pdf_lesson();

    let (status, _) = send(&app, "GET", &format!("/lessons/{lesson_id}/pdf/pages")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pending_uses_configured_limit() {
    let (app, harness) = build_test_app(FakeConverter::with_pages(1));
    for _ in 0..3 {
        harness.add_pdf_lesson();
    }

    let (status, body) = send(&app, "POST", "/pdf/pending").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["processed"], 2);

    let (status, body) = send(&app, "POST", "/pdf/pending?limit=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, _) = send(&app, "POST", "/pdf/pending?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_regenerate_then_retry_and_cleanup() {
    let (app, harness) = build_test_app(FakeConverter::failing());
    let lesson_id = harness.add_pdf_lesson();

    let (status, body) = send(&app, "POST", &format!("/lessons/{lesson_id}/pdf/regenerate")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
    assert_eq!(
        harness.asset(lesson_id).await.unwrap().status.as_str(),
        "pending"
    );

    let (status, body) = send(&app, "POST", "/pdf/pending").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 0);

    let (status, body) = send(&app, "POST", "/pdf/cleanup").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assets_scanned"], 1);
    assert_eq!(body["pages_deleted"], 0);

    harness.converter.set_failing(false);
    harness.converter.set_pages(common::page_images(1));
    let (status, body) = send(&app, "POST", "/pdf/retry").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attempted"], 1);
    assert_eq!(body["succeeded"], 1);
}
