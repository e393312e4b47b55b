use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;

use watermarker_api::{server::app, AppState};
use watermarker_core::Result;
use watermarker_render::{FfmpegEngine, RenderConfig, RenderEngine, RenderSpec};
use watermarker_tasks::{HookDispatcher, SchedulerConfig, TaskScheduler};

struct EchoEngine;

#[async_trait]
impl RenderEngine for EchoEngine {
    async fn render(&self, input: &Path, _spec: &RenderSpec) -> Result<PathBuf> {
        Ok(PathBuf::from(format!("{}.watermarked", input.display())))
    }
}

fn test_app(api_key: Option<&str>) -> Router {
    let scheduler = Arc::new(TaskScheduler::new(
        SchedulerConfig::default(),
        Arc::new(EchoEngine),
        HookDispatcher::disabled(),
    ));
    app(AppState {
        scheduler,
        ffmpeg: Arc::new(FfmpegEngine::new()),
        render: RenderConfig::default(),
        upload_dir: std::env::temp_dir(),
        max_upload_size: 1024 * 1024,
        api_key: api_key.map(str::to_string),
    })
}

fn post_multipart(uri: &str, filename: &str, contents: &[u8]) -> Request<Body> {
    let boundary = "test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_open() {
    let app = test_app(Some("secret"));
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn submit_returns_accepted_with_task_id() {
    let app = test_app(None);
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/watermark",
            serde_json::json!({ "input": "/media/a.jpg", "text": "SAMPLE", "position": "center" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "pending");
    let task_id = body["task_id"].as_str().unwrap().to_string();
    assert_eq!(body["status_url"], format!("/api/v1/tasks/{task_id}"));

    // The record is immediately pollable and never terminal right away.
    let response = app
        .oneshot(
            Request::get(format!("/api/v1/tasks/{task_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let task = json_body(response).await;
    assert!(task["status"] == "pending" || task["status"] == "processing");
}

#[tokio::test]
async fn invalid_position_is_rejected_listing_the_valid_set() {
    let app = test_app(None);
    let response = app
        .oneshot(post_json(
            "/api/v1/watermark",
            serde_json::json!({ "input": "/media/a.jpg", "text": "SAMPLE", "position": "middle" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["details"].as_str().unwrap().contains("bottom-right"));
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let app = test_app(None);
    let response = app
        .oneshot(post_json(
            "/api/v1/watermark/batch",
            serde_json::json!({ "inputs": [], "text": "SAMPLE" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn batch_submission_is_accepted() {
    let app = test_app(None);
    let response = app
        .oneshot(post_json(
            "/api/v1/watermark/batch",
            serde_json::json!({
                "inputs": ["/media/a.jpg", "/media/b.mp4"],
                "text": "SAMPLE",
                "position": "bottom-right"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn upload_accepts_supported_files_and_schedules_a_task() {
    let app = test_app(None);
    let response = app
        .oneshot(post_multipart(
            "/api/v1/watermark/upload?text=SAMPLE&position=center",
            "cat.jpg",
            b"not really a jpg",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn upload_rejects_unsupported_extensions() {
    let app = test_app(None);
    let response = app
        .oneshot(post_multipart(
            "/api/v1/watermark/upload",
            "notes.txt",
            b"hello",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn video_sample_rejects_non_video_files() {
    let app = test_app(None);
    let response = app
        .oneshot(post_multipart(
            "/api/v1/watermark/sample",
            "cat.jpg",
            b"not a video",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["details"].as_str().unwrap().contains("video"));
}

#[tokio::test]
async fn unknown_task_id_is_not_found() {
    let app = test_app(None);
    let response = app
        .oneshot(
            Request::get(format!("/api/v1/tasks/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_api_key_is_unauthorized() {
    let app = test_app(Some("secret"));
    let response = app
        .oneshot(post_json(
            "/api/v1/watermark",
            serde_json::json!({ "input": "/media/a.jpg", "text": "SAMPLE" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn api_key_accepted_via_header_or_query() {
    let app = test_app(Some("secret"));

    let mut request = post_json(
        "/api/v1/watermark",
        serde_json::json!({ "input": "/media/a.jpg", "text": "SAMPLE" }),
    );
    request
        .headers_mut()
        .insert("x-api-key", "secret".parse().unwrap());
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app
        .oneshot(post_json(
            "/api/v1/watermark?authkey=secret",
            serde_json::json!({ "input": "/media/a.jpg", "text": "SAMPLE" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}
