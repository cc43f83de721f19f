//! API module for Synth Studio
//!
//! Exposes the studio simulation and the AI tools over REST, plus a
//! WebSocket stream of studio progress for the web front-end.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::media::MediaClient;
use crate::studio::StudioRunner;

pub mod handlers;
pub mod models;
pub mod server;

pub use server::{build_router, AppState};

/// API Server for handling REST requests and WebSocket connections
pub struct ApiServer {
    state: AppState,
    host: String,
    port: u16,
}

impl ApiServer {
    /// Create a new API server from configuration
    pub fn new(config: Config) -> Self {
        let studio = Arc::new(StudioRunner::from_config(&config.studio));

        let media = match MediaClient::from_config(&config.media) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("AI tools disabled: {}", e);
                None
            }
        };

        let host = config.server.host.clone();
        let port = config.server.port;

        Self {
            state: AppState {
                studio,
                media,
                config: Arc::new(config),
            },
            host,
            port,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting API server on port {}", self.port);
        server::start_http_server(self.state, &self.host, self.port).await
    }
}
