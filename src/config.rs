use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::media::AspectRatio;

/// Configuration for Synth Studio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Face-swap studio simulation settings
    pub studio: StudioConfig,

    /// Generative media service settings
    pub media: MediaConfig,

    /// HTTP server and logging settings
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Milliseconds between simulation ticks
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// API key for the generative media service
    pub api_key: Option<String>,

    /// Base URL of the REST API
    pub base_url: String,

    /// Model used for image edits
    pub image_model: String,

    /// Model used for text-to-video
    pub video_model: String,

    /// Aspect ratio used when a request does not specify one
    pub default_aspect_ratio: AspectRatio,

    /// Seconds between operation status checks
    pub poll_interval_seconds: u64,

    /// Maximum status checks before giving up (None = wait forever)
    pub max_polls: Option<u32>,

    /// Per-request HTTP timeout in seconds
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Log level filter
    pub log_level: String,
}

impl StudioConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl ServerConfig {
    /// Tracing filter directives for the binary; `verbose` forces debug
    pub fn log_filter(&self, verbose: bool) -> String {
        let level = if verbose { "debug" } else { self.log_level.as_str() };
        format!("synth_studio={},tower_http={},warn", level, level)
    }
}

impl MediaConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_paths = [
            "synth-studio.toml",
            "config/synth-studio.toml",
            "/etc/synth-studio/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&config_str) {
                    Ok(mut config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        config.apply_env();
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Override settings with environment variables
    fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    /// Override settings from a variable lookup. Empty values count as unset.
    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = ["SYNTH_STUDIO_API_KEY", "GEMINI_API_KEY", "API_KEY"]
            .into_iter()
            .find_map(|name| var(name));
        if api_key.is_some() {
            self.media.api_key = api_key;
        }

        if let Some(port) = var("SYNTH_STUDIO_PORT") {
            self.server.port = port.parse().unwrap_or(self.server.port);
        }

        if let Some(log_level) = var("SYNTH_STUDIO_LOG_LEVEL") {
            self.server.log_level = log_level;
        }

        if let Some(base_url) = var("SYNTH_STUDIO_BASE_URL") {
            self.media.base_url = base_url;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.studio.tick_interval_ms == 0 {
            return Err(anyhow!("tick_interval_ms must be greater than 0"));
        }

        if self.media.poll_interval_seconds == 0 {
            return Err(anyhow!("poll_interval_seconds must be greater than 0"));
        }

        if self.media.max_polls == Some(0) {
            return Err(anyhow!("max_polls must be greater than 0 when set"));
        }

        if url::Url::parse(&self.media.base_url).is_err() {
            return Err(anyhow!("Invalid media base_url: {}", self.media.base_url));
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Synth Studio Configuration:\n\
            - Tick Interval: {}ms x {} ticks\n\
            - Image Model: {}\n\
            - Video Model: {} ({})\n\
            - Poll Interval: {}s (max polls: {})\n\
            - API Key: {}\n\
            - Server: {}:{}",
            self.studio.tick_interval_ms,
            crate::studio::script::FINAL_TICK,
            self.media.image_model,
            self.media.video_model,
            crate::media::client::VIDEO_RESOLUTION,
            self.media.poll_interval_seconds,
            self.media
                .max_polls
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unbounded".to_string()),
            if self.media.api_key.is_some() { "configured" } else { "missing" },
            self.server.host,
            self.server.port,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            studio: StudioConfig {
                tick_interval_ms: 100,
            },
            media: MediaConfig {
                api_key: None,
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                image_model: "gemini-2.5-flash-image".to_string(),
                video_model: "veo-3.1-fast-generate-preview".to_string(),
                default_aspect_ratio: AspectRatio::Widescreen,
                poll_interval_seconds: 5,
                max_polls: Some(120), // 10 minutes at 5s
                timeout_seconds: 120,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                log_level: "info".to_string(),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.config.media.api_key = Some(api_key);
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.config.media.base_url = base_url;
        self
    }

    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.config.studio.tick_interval_ms = ms;
        self
    }

    pub fn with_poll_interval_seconds(mut self, seconds: u64) -> Self {
        self.config.media.poll_interval_seconds = seconds;
        self
    }

    pub fn with_max_polls(mut self, max_polls: Option<u32>) -> Self {
        self.config.media.max_polls = max_polls;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
