//! API data models

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::assets::UploadedAsset;
use crate::media::{AspectRatio, MediaError};
use crate::studio::{JobPhase, JobState, LogLevel, StudioError};

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Failure surfaced to the caller as a user-visible message
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        let status = match &err {
            MediaError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            MediaError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            MediaError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            MediaError::GenerationFailed(_)
            | MediaError::Api { .. }
            | MediaError::Http(_)
            | MediaError::Json(_) => StatusCode::BAD_GATEWAY,
            MediaError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<StudioError> for ApiError {
    fn from(err: StudioError) -> Self {
        let status = match err {
            StudioError::NotIdle(_) => StatusCode::CONFLICT,
            StudioError::TargetNotVideo(_) => StatusCode::BAD_REQUEST,
        };
        Self::new(status, err.to_string())
    }
}

/// Select a local file as studio input
#[derive(Debug, Serialize, Deserialize)]
pub struct AttachAssetRequest {
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EditImageRequest {
    /// Base64 image, optionally as a full `data:` URL
    pub image_base64: String,
    pub mime_type: Option<String>,
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EditImageResponse {
    /// `data:` URL of the edited image
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateVideoRequest {
    pub prompt: String,
    pub aspect_ratio: Option<AspectRatio>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateVideoResponse {
    pub video_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogLine {
    pub time: String,
    pub level: LogLevel,
    pub message: String,
}

/// What the studio page renders
#[derive(Debug, Serialize, Deserialize)]
pub struct StudioSnapshot {
    pub phase: JobPhase,
    pub progress: u8,
    pub status_label: String,
    pub session_id: Option<String>,
    pub can_start: bool,
    pub source: Option<UploadedAsset>,
    pub target: Option<UploadedAsset>,
    pub result: Option<String>,
    pub logs: Vec<LogLine>,
}

impl From<&JobState> for StudioSnapshot {
    fn from(state: &JobState) -> Self {
        Self {
            phase: state.phase(),
            progress: state.progress_percent(),
            status_label: state.status_label().to_string(),
            session_id: state.session_id().map(str::to_string),
            can_start: state.can_start(),
            source: state.source().cloned(),
            target: state.target().cloned(),
            result: state.result(),
            logs: state
                .logs()
                .iter()
                .map(|entry| LogLine {
                    time: entry.local_time(),
                    level: entry.level,
                    message: entry.message.clone(),
                })
                .collect(),
        }
    }
}
