/// Synth Studio
///
/// Back-end for the Synth Studio demo: a simulated face-swap job with live
/// progress and logs, and a client for generative image editing and
/// text-to-video.

pub mod assets;
pub mod config;
pub mod media;
pub mod studio;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::assets::{AssetKind, UploadedAsset};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::media::{AspectRatio, MediaClient, MediaError, MediaReference, MediaService, PollPolicy};
pub use crate::studio::{JobPhase, JobState, LogEntry, LogLevel, StudioRunner};
