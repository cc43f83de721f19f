use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{
    AspectRatio, GeminiMediaService, GenerationRequest, InlineData, MediaError, MediaReference,
    MediaService, Result,
};
use crate::config::MediaConfig;

const DEFAULT_IMAGE_MIME: &str = "image/png";
/// The only resolution tier ever requested for video
pub const VIDEO_RESOLUTION: &str = "720p";

/// How the video path waits for a remote operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between status checks
    pub interval: Duration,
    /// Status checks allowed before giving up (None = unbounded)
    pub max_polls: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_polls: None,
        }
    }
}

/// Image editing and text-to-video on top of a [`MediaService`]
#[derive(Clone)]
pub struct MediaClient {
    service: Arc<dyn MediaService>,
    poll: PollPolicy,
}

impl MediaClient {
    pub fn new(service: Arc<dyn MediaService>) -> Self {
        Self {
            service,
            poll: PollPolicy::default(),
        }
    }

    /// Build a client backed by the Gemini REST API
    pub fn from_config(config: &MediaConfig) -> Result<Self> {
        let service = GeminiMediaService::new(config.clone())?;
        Ok(Self::new(Arc::new(service)).with_poll_policy(PollPolicy {
            interval: config.poll_interval(),
            max_polls: config.max_polls,
        }))
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    /// Edit a still image according to a text instruction.
    ///
    /// The first inline image in the response becomes an embedded
    /// reference. A response without one fails with
    /// [`MediaError::GenerationFailed`]; transport errors pass through.
    pub async fn edit_image(
        &self,
        image: &[u8],
        mime_type: Option<&str>,
        prompt: &str,
    ) -> Result<MediaReference> {
        if image.is_empty() {
            return Err(MediaError::InvalidRequest("source image is empty".to_string()));
        }
        let prompt = non_empty_prompt(prompt)?;

        let mime_type = mime_type.unwrap_or(DEFAULT_IMAGE_MIME);
        let request = GenerationRequest::image_edit(prompt, InlineData::new(mime_type, image.to_vec()));

        info!("🎨 Editing {} byte image ({})", image.len(), mime_type);
        let response = self.service.generate_content(&request).await?;

        let edited = response.first_inline_data().cloned().ok_or_else(|| {
            warn!("Image edit returned {} parts but no image", response.parts.len());
            MediaError::GenerationFailed("No image generated from edit request".to_string())
        })?;

        info!("✅ Image edit produced {} bytes", edited.data.len());
        Ok(MediaReference::Embedded(edited))
    }

    /// Generate a video from a text instruction, waiting for completion.
    pub async fn generate_video(&self, prompt: &str, aspect_ratio: AspectRatio) -> Result<MediaReference> {
        self.generate_video_with_cancel(prompt, aspect_ratio, &CancellationToken::new())
            .await
    }

    /// Like [`generate_video`](Self::generate_video), but abandons the wait
    /// as soon as `cancel` fires.
    pub async fn generate_video_with_cancel(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        cancel: &CancellationToken,
    ) -> Result<MediaReference> {
        let prompt = non_empty_prompt(prompt)?;
        let request = GenerationRequest::video(prompt, aspect_ratio, VIDEO_RESOLUTION);

        info!("🎬 Submitting video generation ({}, {})", aspect_ratio, VIDEO_RESOLUTION);
        let mut operation = self.service.submit_video(&request).await?;
        let mut polls = 0u32;

        while !operation.done {
            if let Some(max_polls) = self.poll.max_polls {
                if polls >= max_polls {
                    warn!("Operation {} still running after {} checks", operation.name, polls);
                    return Err(MediaError::Timeout { polls });
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Video generation {} cancelled after {} checks", operation.name, polls);
                    return Err(MediaError::Cancelled);
                }
                _ = tokio::time::sleep(self.poll.interval) => {}
            }

            operation = self.service.fetch_operation(&operation).await?;
            polls += 1;
            debug!("Operation {} check #{}: done={}", operation.name, polls, operation.done);
        }

        if let Some(error) = operation.error {
            return Err(MediaError::GenerationFailed(error));
        }

        let uri = operation
            .video_uri
            .ok_or_else(|| MediaError::GenerationFailed("No video generated".to_string()))?;

        info!("✅ Video ready after {} status checks", polls);
        Ok(MediaReference::Uri(self.service.authorize_uri(&uri)?))
    }
}

fn non_empty_prompt(prompt: &str) -> Result<&str> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(MediaError::InvalidRequest("prompt must not be empty".to_string()));
    }
    Ok(prompt)
}
