use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use synth_studio::media::{
    ContentPart, ContentResponse, GenerationRequest, InlineData, MediaKind, Result,
    VideoOperation,
};
use synth_studio::{AspectRatio, MediaClient, MediaError, MediaReference, MediaService, PollPolicy};

/// Scripted stand-in for the remote service
#[derive(Default)]
struct FakeService {
    content: Mutex<Option<ContentResponse>>,
    pending_polls: usize,
    video_uri: Option<String>,
    failure: Option<String>,
    fetches: AtomicUsize,
    fetch_times: Mutex<Vec<Instant>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeService {
    fn with_content(parts: Vec<ContentPart>) -> Self {
        Self {
            content: Mutex::new(Some(ContentResponse { parts })),
            ..Self::default()
        }
    }

    fn with_video(pending_polls: usize, video_uri: Option<&str>) -> Self {
        Self {
            pending_polls,
            video_uri: video_uri.map(str::to_string),
            ..Self::default()
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaService for FakeService {
    async fn generate_content(&self, request: &GenerationRequest) -> Result<ContentResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.content
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| MediaError::Api {
                status: 500,
                body: "backend exploded".to_string(),
            })
    }

    async fn submit_video(&self, request: &GenerationRequest) -> Result<VideoOperation> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(VideoOperation::pending("operations/fake"))
    }

    async fn fetch_operation(&self, operation: &VideoOperation) -> Result<VideoOperation> {
        let seen = self.fetches.fetch_add(1, Ordering::SeqCst);
        self.fetch_times.lock().unwrap().push(Instant::now());

        if seen < self.pending_polls {
            Ok(VideoOperation::pending(operation.name.clone()))
        } else {
            Ok(VideoOperation {
                error: self.failure.clone(),
                ..VideoOperation::completed(operation.name.clone(), self.video_uri.clone())
            })
        }
    }

    fn authorize_uri(&self, uri: &str) -> Result<String> {
        Ok(format!("{}&key=test-key", uri))
    }
}

/// Reports done straight from submission
struct InstantVideo;

#[async_trait]
impl MediaService for InstantVideo {
    async fn generate_content(&self, _request: &GenerationRequest) -> Result<ContentResponse> {
        Ok(ContentResponse::default())
    }

    async fn submit_video(&self, _request: &GenerationRequest) -> Result<VideoOperation> {
        Ok(VideoOperation::completed(
            "operations/instant",
            Some("https://videos.example/out.mp4?alt=media".to_string()),
        ))
    }

    async fn fetch_operation(&self, _operation: &VideoOperation) -> Result<VideoOperation> {
        panic!("completed operations are never polled");
    }
}

fn client(service: Arc<FakeService>) -> MediaClient {
    MediaClient::new(service)
}

#[tokio::test]
async fn test_edit_image_wraps_returned_bytes() {
    let edited = vec![0x89, b'P', b'N', b'G', 1, 2, 3];
    let service = Arc::new(FakeService::with_content(vec![
        ContentPart::Text("Here you go".to_string()),
        ContentPart::InlineData(InlineData::new("image/png", edited.clone())),
    ]));

    let reference = client(service.clone())
        .edit_image(b"original", Some("image/jpeg"), "make the person smile")
        .await
        .unwrap();

    let data = reference.as_inline_data().unwrap();
    assert_eq!(data.data, edited);
    assert!(reference.to_string().starts_with("data:image/png;base64,"));

    let requests = service.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].kind, MediaKind::Image);
    assert_eq!(requests[0].prompt, "make the person smile");
    let source = requests[0].source_image.as_ref().unwrap();
    assert_eq!(source.mime_type, "image/jpeg");
    assert_eq!(source.data, b"original");
}

#[tokio::test]
async fn test_edit_image_without_image_part_fails() {
    let service = Arc::new(FakeService::with_content(vec![ContentPart::Text(
        "I can't do that".to_string(),
    )]));

    let err = client(service)
        .edit_image(b"original", None, "add glasses")
        .await
        .unwrap_err();
    assert!(matches!(err, MediaError::GenerationFailed(_)));
}

#[tokio::test]
async fn test_edit_image_surfaces_transport_errors_unchanged() {
    let service = Arc::new(FakeService::default());

    let err = client(service)
        .edit_image(b"original", None, "add glasses")
        .await
        .unwrap_err();
    match err {
        MediaError::Api { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "backend exploded");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_immediately_complete_video() {
    let reference = MediaClient::new(Arc::new(InstantVideo))
        .generate_video("a drone shot of a neon city", AspectRatio::Widescreen)
        .await
        .unwrap();

    assert_eq!(
        reference,
        MediaReference::Uri("https://videos.example/out.mp4?alt=media".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_video_polls_n_plus_one_times_at_fixed_interval() {
    let pending = 3;
    let service = Arc::new(FakeService::with_video(
        pending,
        Some("https://videos.example/v.mp4?alt=media"),
    ));
    let started = Instant::now();

    let reference = client(service.clone())
        .generate_video("a cat surfing", AspectRatio::Portrait)
        .await
        .unwrap();

    assert_eq!(service.fetches(), pending + 1);
    assert_eq!(
        reference.as_uri(),
        Some("https://videos.example/v.mp4?alt=media&key=test-key")
    );

    let times = service.fetch_times.lock().unwrap();
    let mut previous = started;
    for time in times.iter() {
        assert_eq!(*time - previous, Duration::from_secs(5));
        previous = *time;
    }

    let requests = service.requests.lock().unwrap();
    assert_eq!(requests[0].kind, MediaKind::Video);
    assert_eq!(requests[0].aspect_ratio, Some(AspectRatio::Portrait));
    assert_eq!(requests[0].resolution.as_deref(), Some("720p"));
}

#[tokio::test(start_paused = true)]
async fn test_completed_without_video_fails() {
    let service = Arc::new(FakeService::with_video(1, None));

    let err = client(service.clone())
        .generate_video("empty", AspectRatio::Widescreen)
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::GenerationFailed(_)));
    assert_eq!(service.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_operation_error_becomes_generation_failure() {
    let service = Arc::new(FakeService {
        failure: Some("Prompt was blocked by safety filters (code 3)".to_string()),
        ..FakeService::with_video(2, Some("https://videos.example/ignored.mp4"))
    });

    let err = client(service.clone())
        .generate_video("something forbidden", AspectRatio::Widescreen)
        .await
        .unwrap_err();

    match err {
        MediaError::GenerationFailed(message) => {
            assert_eq!(message, "Prompt was blocked by safety filters (code 3)");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(service.fetches(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_poll_limit_times_out() {
    let service = Arc::new(FakeService::with_video(usize::MAX, None));
    let client = client(service.clone()).with_poll_policy(PollPolicy {
        interval: Duration::from_secs(5),
        max_polls: Some(4),
    });

    let err = client
        .generate_video("never finishes", AspectRatio::Widescreen)
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::Timeout { polls: 4 }));
    assert_eq!(service.fetches(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_abandons_wait() {
    let service = Arc::new(FakeService::with_video(usize::MAX, None));
    let client = client(service.clone());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        trigger.cancel();
    });

    let err = client
        .generate_video_with_cancel("stuck", AspectRatio::Widescreen, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::Cancelled));
    assert_eq!(service.fetches(), 2);
}
