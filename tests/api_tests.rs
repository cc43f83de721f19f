#![cfg(feature = "api")]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use synth_studio::api::{build_router, ApiServer, AppState};
use synth_studio::media::{
    ContentPart, ContentResponse, GenerationRequest, InlineData, Result, VideoOperation,
};
use synth_studio::{Config, ConfigBuilder, MediaClient, MediaService, PollPolicy, StudioRunner};

struct StubService;

#[async_trait]
impl MediaService for StubService {
    async fn generate_content(&self, request: &GenerationRequest) -> Result<ContentResponse> {
        if request.prompt.contains("refuse") {
            return Ok(ContentResponse {
                parts: vec![ContentPart::Text("No.".to_string())],
            });
        }
        Ok(ContentResponse {
            parts: vec![ContentPart::InlineData(InlineData::new("image/png", vec![1, 2, 3]))],
        })
    }

    async fn submit_video(&self, _request: &GenerationRequest) -> Result<VideoOperation> {
        Ok(VideoOperation::pending("operations/stub"))
    }

    async fn fetch_operation(&self, operation: &VideoOperation) -> Result<VideoOperation> {
        Ok(VideoOperation::completed(
            operation.name.clone(),
            Some("https://videos.example/stub.mp4".to_string()),
        ))
    }
}

fn app_with_media(media: Option<MediaClient>) -> Router {
    let state = AppState {
        studio: Arc::new(StudioRunner::new(Duration::from_millis(100)).with_seed(1)),
        media: media.map(Arc::new),
        config: Arc::new(Config::default()),
    };
    build_router(state)
}

fn app() -> Router {
    let client = MediaClient::new(Arc::new(StubService)).with_poll_policy(PollPolicy {
        interval: Duration::from_millis(10),
        max_polls: Some(3),
    });
    app_with_media(Some(client))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[test]
fn test_api_server_wires_config_into_state() {
    let config = ConfigBuilder::new()
        .with_api_key("test-key".to_string())
        .with_tick_interval_ms(50)
        .with_max_polls(Some(3))
        .build();
    let server = ApiServer::new(config);
    let state = server.state();

    assert_eq!(state.studio.tick_interval(), Duration::from_millis(50));
    let media = state.media.as_ref().unwrap();
    assert_eq!(media.poll_policy().max_polls, Some(3));

    let mut config = Config::default();
    config.media.api_key = None;
    assert!(ApiServer::new(config).state().media.is_none());
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["media_configured"], true);
}

#[tokio::test]
async fn test_studio_flow() {
    let app = app();
    let temp_dir = TempDir::new().unwrap();
    let face = temp_dir.path().join("face.png");
    let clip = temp_dir.path().join("clip.mp4");
    tokio::fs::write(&face, b"png").await.unwrap();
    tokio::fs::write(&clip, b"mp4").await.unwrap();

    let (status, body) = send(&app, "GET", "/api/studio", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phase"], "IDLE");
    assert_eq!(body["data"]["can_start"], false);

    let (status, body) = send(&app, "POST", "/api/studio/start", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &app,
        "POST",
        "/api/studio/target",
        Some(json!({ "path": face.to_string_lossy() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/studio/source",
        Some(json!({ "path": face.to_string_lossy() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        "/api/studio/target",
        Some(json!({ "path": clip.to_string_lossy() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["can_start"], true);

    let (status, body) = send(&app, "POST", "/api/studio/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phase"], "PROCESSING");
    assert_eq!(body["data"]["logs"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["logs"][1]["message"], "Allocating GPU resources (Tesla T4)...");

    let (status, _) = send(&app, "POST", "/api/studio/start", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "POST", "/api/studio/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phase"], "IDLE");
    assert_eq!(body["data"]["progress"], 0);
    assert!(body["data"]["logs"].as_array().unwrap().is_empty());
    assert!(body["data"]["source"].is_null());
}

#[tokio::test]
async fn test_attach_missing_file() {
    let (status, body) = send(
        &app(),
        "POST",
        "/api/studio/source",
        Some(json!({ "path": "/definitely/not/here.png" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("IO error"));
}

#[tokio::test]
async fn test_edit_image_endpoint() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/tools/edit-image",
        Some(json!({ "image_base64": "data:image/jpeg;base64,cG5n", "prompt": "add glasses" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["image"], "data:image/png;base64,AQID");

    let (status, body) = send(
        &app,
        "POST",
        "/api/tools/edit-image",
        Some(json!({ "image_base64": "cG5n", "prompt": "please refuse" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().starts_with("Generation failed"));

    let (status, _) = send(
        &app,
        "POST",
        "/api/tools/edit-image",
        Some(json!({ "image_base64": "cG5n", "prompt": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generate_video_endpoint() {
    let (status, body) = send(
        &app(),
        "POST",
        "/api/tools/generate-video",
        Some(json!({ "prompt": "a neon city at night", "aspect_ratio": "9:16" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["video_url"], "https://videos.example/stub.mp4");

    let (status, _) = send(
        &app(),
        "POST",
        "/api/tools/generate-video",
        Some(json!({ "prompt": "a tall waterfall", "aspect_ratio": "portrait" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_tools_unavailable_without_media_client() {
    let app = app_with_media(None);
    let (status, body) = send(
        &app,
        "POST",
        "/api/tools/generate-video",
        Some(json!({ "prompt": "anything" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("not configured"));
}
