//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::handlers::{self, StudioSlot};
use super::models::{
    ApiResponse, AttachAssetRequest, EditImageRequest, GenerateVideoRequest, StudioSnapshot,
};
use crate::config::Config;
use crate::media::MediaClient;
use crate::studio::StudioRunner;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub studio: Arc<StudioRunner>,
    /// Absent when no API key is configured
    pub media: Option<Arc<MediaClient>>,
    pub config: Arc<Config>,
}

/// Build the application router with all routes and middleware
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))

        // Face-swap studio
        .route("/api/studio", get(studio_handler))
        .route("/api/studio/source", post(attach_source_handler))
        .route("/api/studio/target", post(attach_target_handler))
        .route("/api/studio/start", post(start_handler))
        .route("/api/studio/reset", post(reset_handler))

        // AI tools
        .route("/api/tools/edit-image", post(edit_image_handler))
        .route("/api/tools/generate-video", post(generate_video_handler))

        // Live studio updates
        .route("/ws", get(websocket_handler))

        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(app_state: AppState, host: &str, port: u16) -> Result<()> {
    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    info!("🌐 API server listening on http://{}:{}", host, port);
    info!("🔗 WebSocket endpoint available at ws://{}:{}/ws", host, port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn ok<T: serde::Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

fn respond<T: serde::Serialize>(result: Result<T, super::models::ApiError>) -> Response {
    match result {
        Ok(data) => ok(data),
        Err(e) => e.into_response(),
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::health_check(&state).await))
}

async fn studio_handler(State(state): State<AppState>) -> Response {
    ok(handlers::studio_snapshot(&state).await)
}

async fn attach_source_handler(
    State(state): State<AppState>,
    Json(request): Json<AttachAssetRequest>,
) -> Response {
    respond(handlers::attach_asset(&state, StudioSlot::Source, request).await)
}

async fn attach_target_handler(
    State(state): State<AppState>,
    Json(request): Json<AttachAssetRequest>,
) -> Response {
    respond(handlers::attach_asset(&state, StudioSlot::Target, request).await)
}

async fn start_handler(State(state): State<AppState>) -> Response {
    respond(handlers::start_studio(&state).await)
}

async fn reset_handler(State(state): State<AppState>) -> Response {
    ok(handlers::reset_studio(&state).await)
}

async fn edit_image_handler(
    State(state): State<AppState>,
    Json(request): Json<EditImageRequest>,
) -> Response {
    respond(handlers::edit_image(&state, request).await)
}

async fn generate_video_handler(
    State(state): State<AppState>,
    Json(request): Json<GenerateVideoRequest>,
) -> Response {
    respond(handlers::generate_video(&state, request).await)
}

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| websocket_connection(socket, state))
}

fn snapshot_message(snapshot: &StudioSnapshot) -> Option<Message> {
    let message = serde_json::json!({
        "type": "StudioStatus",
        "status": snapshot,
    });
    serde_json::to_string(&message).ok().map(Message::Text)
}

/// Push a studio snapshot on connect and after every change
async fn websocket_connection(mut socket: WebSocket, state: AppState) {
    info!("🔌 New WebSocket connection established");
    let mut updates = state.studio.subscribe();

    let initial = handlers::studio_snapshot(&state).await;
    if let Some(message) = snapshot_message(&initial) {
        if socket.send(message).await.is_err() {
            warn!("Failed to send initial studio status");
            return;
        }
    }

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text == "ping" && socket.send(Message::Text("pong".to_string())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("🔌 WebSocket connection closed by client");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }

            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = StudioSnapshot::from(&*updates.borrow_and_update());
                if let Some(message) = snapshot_message(&snapshot) {
                    if socket.send(message).await.is_err() {
                        info!("🔌 WebSocket connection closed during status update");
                        break;
                    }
                }
            }
        }
    }

    info!("🔌 WebSocket connection ended");
}
