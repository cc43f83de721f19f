use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{JobState, StudioError, TickOutcome};
use crate::assets::UploadedAsset;
use crate::config::StudioConfig;

/// A running tick loop and the token that stops it
struct TickLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives a [`JobState`] on a fixed tick interval
pub struct StudioRunner {
    state: Arc<RwLock<JobState>>,
    snapshots: Arc<watch::Sender<JobState>>,
    tick_loop: Mutex<Option<TickLoop>>,
    tick_interval: Duration,
    seed: Option<u64>,
}

impl StudioRunner {
    pub fn new(tick_interval: Duration) -> Self {
        let (snapshots, _) = watch::channel(JobState::new());
        Self {
            state: Arc::new(RwLock::new(JobState::new())),
            snapshots: Arc::new(snapshots),
            tick_loop: Mutex::new(None),
            tick_interval,
            seed: None,
        }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new(config.tick_interval())
    }

    /// Use a fixed random seed for every job
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub async fn snapshot(&self) -> JobState {
        self.state.read().await.clone()
    }

    /// Receive a fresh snapshot after every change
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.snapshots.subscribe()
    }

    pub async fn attach_source(&self, asset: UploadedAsset) -> Result<(), StudioError> {
        let mut state = self.state.write().await;
        state.attach_source(asset)?;
        self.snapshots.send_replace(state.clone());
        Ok(())
    }

    pub async fn attach_target(&self, asset: UploadedAsset) -> Result<(), StudioError> {
        let mut state = self.state.write().await;
        state.attach_target(asset)?;
        self.snapshots.send_replace(state.clone());
        Ok(())
    }

    /// Start a job and its tick loop. Returns `false` when the state
    /// refused to start; no loop is spawned in that case.
    pub async fn start(&self) -> bool {
        let mut tick_loop = self.tick_loop.lock().await;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        {
            let mut state = self.state.write().await;
            if !state.start(&mut rng, Utc::now()) {
                return false;
            }
            self.snapshots.send_replace(state.clone());
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_ticks(
            self.state.clone(),
            self.snapshots.clone(),
            self.tick_interval,
            rng,
            cancel.clone(),
        ));

        *tick_loop = Some(TickLoop { cancel, handle });
        true
    }

    /// Stop any running loop and return to a fresh idle studio.
    pub async fn reset(&self) {
        let mut tick_loop = self.tick_loop.lock().await;

        if let Some(TickLoop { cancel, handle }) = tick_loop.take() {
            cancel.cancel();
            // The loop only exits between ticks, so no tick lands after this.
            let _ = handle.await;
        }

        let mut state = self.state.write().await;
        state.reset();
        self.snapshots.send_replace(state.clone());
        info!("🔄 Studio reset");
    }

    /// Whether a tick loop is currently alive
    pub async fn is_ticking(&self) -> bool {
        self.tick_loop
            .lock()
            .await
            .as_ref()
            .map_or(false, |tick_loop| !tick_loop.handle.is_finished())
    }
}

async fn run_ticks(
    state: Arc<RwLock<JobState>>,
    snapshots: Arc<watch::Sender<JobState>>,
    tick_interval: Duration,
    mut rng: StdRng,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    // The first tick of an interval fires immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Tick loop cancelled");
                break;
            }
            _ = ticker.tick() => {
                let mut state = state.write().await;
                let outcome = state.tick(&mut rng, Utc::now());
                snapshots.send_replace(state.clone());

                if outcome != TickOutcome::Advanced {
                    debug!("Tick loop finished after {} ticks", state.ticks());
                    break;
                }
            }
        }
    }
}
