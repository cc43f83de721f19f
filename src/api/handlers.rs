//! API request handlers

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use tracing::{info, warn};

use super::models::{
    ApiError, AttachAssetRequest, EditImageRequest, EditImageResponse, GenerateVideoRequest,
    GenerateVideoResponse, StudioSnapshot,
};
use super::server::AppState;
use crate::assets::UploadedAsset;
use crate::media::MediaClient;

/// Which studio input a file is attached to
#[derive(Debug, Clone, Copy)]
pub enum StudioSlot {
    Source,
    Target,
}

/// Handle health check requests
pub async fn health_check(state: &AppState) -> Value {
    serde_json::json!({
        "status": "healthy",
        "service": "synth-studio",
        "version": env!("CARGO_PKG_VERSION"),
        "media_configured": state.media.is_some(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })
}

pub async fn studio_snapshot(state: &AppState) -> StudioSnapshot {
    StudioSnapshot::from(&state.studio.snapshot().await)
}

pub async fn attach_asset(
    state: &AppState,
    slot: StudioSlot,
    request: AttachAssetRequest,
) -> Result<StudioSnapshot, ApiError> {
    let asset = UploadedAsset::open(&request.path)
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    info!("📎 Attaching {:?}: {}", slot, asset.name);
    match slot {
        StudioSlot::Source => state.studio.attach_source(asset).await?,
        StudioSlot::Target => state.studio.attach_target(asset).await?,
    }

    Ok(studio_snapshot(state).await)
}

pub async fn start_studio(state: &AppState) -> Result<StudioSnapshot, ApiError> {
    if !state.studio.start().await {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "Upload a source face and a target video, and reset any finished job, before starting",
        ));
    }
    Ok(studio_snapshot(state).await)
}

pub async fn reset_studio(state: &AppState) -> StudioSnapshot {
    state.studio.reset().await;
    studio_snapshot(state).await
}

fn media_client(state: &AppState) -> Result<&MediaClient, ApiError> {
    state.media.as_deref().ok_or_else(|| {
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Media service not configured: set SYNTH_STUDIO_API_KEY",
        )
    })
}

/// Accept either bare base64 or a `data:<mime>;base64,<payload>` URL
fn decode_image_payload(payload: &str) -> Result<(Option<String>, Vec<u8>), ApiError> {
    let (mime_type, encoded) = match payload.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| ApiError::bad_request("Malformed data URL"))?;
            let mime = header.trim_end_matches(";base64");
            (Some(mime.to_string()).filter(|m| !m.is_empty()), data)
        }
        None => (None, payload),
    };

    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ApiError::bad_request(format!("Image is not valid base64: {}", e)))?;
    Ok((mime_type, bytes))
}

pub async fn edit_image(state: &AppState, request: EditImageRequest) -> Result<EditImageResponse, ApiError> {
    let client = media_client(state)?;
    let (embedded_mime, bytes) = decode_image_payload(&request.image_base64)?;
    let mime_type = request.mime_type.or(embedded_mime);

    let reference = client
        .edit_image(&bytes, mime_type.as_deref(), &request.prompt)
        .await
        .map_err(|e| {
            warn!("Image edit failed: {}", e);
            ApiError::from(e)
        })?;

    Ok(EditImageResponse {
        image: reference.to_string(),
    })
}

pub async fn generate_video(
    state: &AppState,
    request: GenerateVideoRequest,
) -> Result<GenerateVideoResponse, ApiError> {
    let client = media_client(state)?;
    let aspect_ratio = request
        .aspect_ratio
        .unwrap_or(state.config.media.default_aspect_ratio);

    let reference = client
        .generate_video(&request.prompt, aspect_ratio)
        .await
        .map_err(|e| {
            warn!("Video generation failed: {}", e);
            ApiError::from(e)
        })?;

    Ok(GenerateVideoResponse {
        video_url: reference.to_string(),
    })
}
