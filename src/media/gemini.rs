use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::client::VIDEO_RESOLUTION;
use super::{
    ContentPart, ContentResponse, GenerationRequest, InlineData, MediaError, MediaService, Result,
    VideoOperation,
};
use crate::config::MediaConfig;

/// Gemini / Veo implementation of [`MediaService`] over the REST API
pub struct GeminiMediaService {
    config: MediaConfig,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum RequestPart {
    InlineData(WireInlineData),
    Text(String),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<WireInlineData>,
}

#[derive(Debug, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    aspect_ratio: String,
    resolution: String,
    sample_count: u32,
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    name: String,
    #[serde(default)]
    done: bool,
    response: Option<OperationResult>,
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResult {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    video: Option<VideoLocator>,
}

#[derive(Debug, Deserialize)]
struct VideoLocator {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    code: Option<i32>,
    message: Option<String>,
}

impl GeminiMediaService {
    pub fn new(config: MediaConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| MediaError::Configuration("Gemini API key required".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    async fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

fn build_content_request(request: &GenerationRequest) -> GenerateContentRequest {
    let mut parts = Vec::with_capacity(2);
    if let Some(image) = &request.source_image {
        parts.push(RequestPart::InlineData(WireInlineData {
            mime_type: image.mime_type.clone(),
            data: image.to_base64(),
        }));
    }
    parts.push(RequestPart::Text(request.prompt.clone()));

    GenerateContentRequest {
        contents: vec![RequestContent { parts }],
    }
}

fn build_predict_request(request: &GenerationRequest) -> PredictRequest {
    PredictRequest {
        instances: vec![PredictInstance {
            prompt: request.prompt.clone(),
        }],
        parameters: PredictParameters {
            aspect_ratio: request.aspect_ratio.unwrap_or_default().as_str().to_string(),
            resolution: request
                .resolution
                .clone()
                .unwrap_or_else(|| VIDEO_RESOLUTION.to_string()),
            sample_count: 1,
        },
    }
}

fn into_content_response(response: GenerateContentResponse) -> Result<ContentResponse> {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default();

    let mut converted = Vec::with_capacity(parts.len());
    for part in parts {
        if let Some(inline) = part.inline_data {
            let data = STANDARD.decode(inline.data.as_bytes()).map_err(|e| {
                MediaError::GenerationFailed(format!("Malformed image payload: {}", e))
            })?;
            converted.push(ContentPart::InlineData(InlineData::new(inline.mime_type, data)));
        } else if let Some(text) = part.text {
            converted.push(ContentPart::Text(text));
        }
    }

    Ok(ContentResponse { parts: converted })
}

fn into_video_operation(response: OperationResponse) -> VideoOperation {
    let video_uri = response
        .response
        .and_then(|result| result.generate_video_response)
        .and_then(|video| video.generated_samples.into_iter().next())
        .and_then(|sample| sample.video)
        .and_then(|video| video.uri);

    let error = response.error.map(|e| match (e.code, e.message) {
        (Some(code), Some(message)) => format!("{} (code {})", message, code),
        (_, Some(message)) => message,
        (Some(code), None) => format!("operation failed with code {}", code),
        (None, None) => "operation failed".to_string(),
    });

    VideoOperation {
        name: response.name,
        done: response.done,
        video_uri,
        error,
    }
}

/// Append the API key as a `key` query parameter
fn append_api_key(uri: &str, api_key: &str) -> Result<String> {
    let mut url = url::Url::parse(uri)
        .map_err(|e| MediaError::GenerationFailed(format!("Invalid video locator '{}': {}", uri, e)))?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url.into())
}

#[async_trait]
impl MediaService for GeminiMediaService {
    async fn generate_content(&self, request: &GenerationRequest) -> Result<ContentResponse> {
        let url = self.model_url(&self.config.image_model, "generateContent");
        debug!("Sending content request to {}", url);

        let response: GenerateContentResponse = self.post_json(&url, &build_content_request(request)).await?;
        into_content_response(response)
    }

    async fn submit_video(&self, request: &GenerationRequest) -> Result<VideoOperation> {
        let url = self.model_url(&self.config.video_model, "predictLongRunning");
        debug!("Submitting video request to {}", url);

        let body = build_predict_request(request);
        let response: OperationResponse = self.post_json(&url, &body).await?;
        Ok(into_video_operation(response))
    }

    async fn fetch_operation(&self, operation: &VideoOperation) -> Result<VideoOperation> {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            operation.name.trim_start_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        let response: OperationResponse = Self::parse_response(response).await?;
        Ok(into_video_operation(response))
    }

    fn authorize_uri(&self, uri: &str) -> Result<String> {
        append_api_key(uri, &self.api_key)
    }
}
