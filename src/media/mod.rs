//! Generative media integration.
//!
//! The remote service is reached through the [`MediaService`] trait, which
//! exposes only what the tools need: an immediate content request and a
//! submit/fetch pair for long-running video operations. [`MediaClient`]
//! turns those into the two user-facing operations, `edit_image` and
//! `generate_video`.

pub mod client;
pub mod gemini;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use client::{MediaClient, PollPolicy};
pub use gemini::GeminiMediaService;

/// Result type for media operations
pub type Result<T> = std::result::Result<T, MediaError>;

/// Error types for media operations
#[derive(thiserror::Error, Debug)]
pub enum MediaError {
    /// The call succeeded but carried no usable media.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Media API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Video generation did not finish after {polls} status checks")]
    Timeout { polls: u32 },

    #[error("Video generation cancelled")]
    Cancelled,
}

/// Output aspect ratio for generated video
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9", alias = "widescreen", alias = "landscape")]
    Widescreen,
    #[serde(rename = "9:16", alias = "portrait")]
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Widescreen => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "16:9" | "widescreen" | "landscape" => Ok(AspectRatio::Widescreen),
            "9:16" | "portrait" => Ok(AspectRatio::Portrait),
            other => Err(MediaError::InvalidRequest(format!(
                "Unsupported aspect ratio '{}', expected 16:9 or 9:16",
                other
            ))),
        }
    }
}

/// What a generation request should produce
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Raw media bytes with their mime type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineData {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineData {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

/// A pending call to the remote media service
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub source_image: Option<InlineData>,
    pub kind: MediaKind,
    pub aspect_ratio: Option<AspectRatio>,
    pub resolution: Option<String>,
}

impl GenerationRequest {
    pub fn image_edit(prompt: impl Into<String>, source_image: InlineData) -> Self {
        Self {
            prompt: prompt.into(),
            source_image: Some(source_image),
            kind: MediaKind::Image,
            aspect_ratio: None,
            resolution: None,
        }
    }

    pub fn video(prompt: impl Into<String>, aspect_ratio: AspectRatio, resolution: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            source_image: None,
            kind: MediaKind::Video,
            aspect_ratio: Some(aspect_ratio),
            resolution: Some(resolution.into()),
        }
    }
}

/// One part of an immediate content response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    InlineData(InlineData),
    Text(String),
}

/// Immediate response to a content request
#[derive(Debug, Clone, Default)]
pub struct ContentResponse {
    pub parts: Vec<ContentPart>,
}

impl ContentResponse {
    /// First inline media payload, if any
    pub fn first_inline_data(&self) -> Option<&InlineData> {
        self.parts.iter().find_map(|part| match part {
            ContentPart::InlineData(data) => Some(data),
            ContentPart::Text(_) => None,
        })
    }
}

/// Handle for an in-flight video generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoOperation {
    pub name: String,
    pub done: bool,
    pub video_uri: Option<String>,
    /// Error message reported by the service for a finished operation
    pub error: Option<String>,
}

impl VideoOperation {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            video_uri: None,
            error: None,
        }
    }

    pub fn completed(name: impl Into<String>, video_uri: Option<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            video_uri,
            error: None,
        }
    }
}

/// Locator usable to render or download generated content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaReference {
    /// Embedded payload, rendered as a `data:` URL
    Embedded(InlineData),
    /// Remote locator, already carrying any access token
    Uri(String),
}

impl MediaReference {
    pub fn as_inline_data(&self) -> Option<&InlineData> {
        match self {
            MediaReference::Embedded(data) => Some(data),
            MediaReference::Uri(_) => None,
        }
    }

    pub fn as_uri(&self) -> Option<&str> {
        match self {
            MediaReference::Uri(uri) => Some(uri),
            MediaReference::Embedded(_) => None,
        }
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaReference::Embedded(data) => {
                write!(f, "data:{};base64,{}", data.mime_type, data.to_base64())
            }
            MediaReference::Uri(uri) => f.write_str(uri),
        }
    }
}

/// The remote generative media service
#[async_trait]
pub trait MediaService: Send + Sync {
    /// Submit a request that is answered immediately
    async fn generate_content(&self, request: &GenerationRequest) -> Result<ContentResponse>;

    /// Submit a long-running video request
    async fn submit_video(&self, request: &GenerationRequest) -> Result<VideoOperation>;

    /// Fetch the current status of an operation
    async fn fetch_operation(&self, operation: &VideoOperation) -> Result<VideoOperation>;

    /// Decorate a result locator with whatever the caller needs to fetch it
    fn authorize_uri(&self, uri: &str) -> Result<String> {
        Ok(uri.to_string())
    }
}
