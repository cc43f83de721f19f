//! Face-swap studio simulation.
//!
//! [`JobState`] is the whole job: phase, progress, log and inputs. All
//! mutation goes through its transition methods, which take the random
//! source and the clock as arguments so a host can drive them however it
//! likes. [`StudioRunner`] is the tokio host used by the CLI and server.

pub mod runner;
pub mod script;

use chrono::{DateTime, Local, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::assets::{AssetKind, UploadedAsset};
use script::{FINAL_TICK, MAX_STEP, PROGRESS_CAP};

pub use runner::StudioRunner;

/// Phases of the simulated job, in the only order they can occur
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPhase {
    #[default]
    Idle,
    Processing,
    Training,
    Generating,
    Completed,
    /// Modelled for hosts that run real jobs; the simulation never fails.
    Failed,
}

impl JobPhase {
    /// Ticks apply only in these phases
    pub fn is_running(self) -> bool {
        matches!(self, JobPhase::Processing | JobPhase::Training | JobPhase::Generating)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            JobPhase::Idle => 0,
            JobPhase::Processing => 1,
            JobPhase::Training => 2,
            JobPhase::Generating => 3,
            JobPhase::Completed | JobPhase::Failed => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Success,
}

/// One status line in the studio terminal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    /// Wall-clock time in the viewer's zone, e.g. `14:03:27`
    pub fn local_time(&self) -> String {
        self.timestamp.with_timezone(&Local).format("%H:%M:%S").to_string()
    }
}

/// Errors when choosing studio inputs
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum StudioError {
    #[error("inputs can only be changed while the studio is idle (currently {0:?})")]
    NotIdle(JobPhase),

    #[error("target media must be a video, got {0:?}")]
    TargetNotVideo(AssetKind),
}

/// Result of applying one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The job moved forward and keeps running
    Advanced,
    /// This tick finished the job
    Completed,
    /// Nothing is running; the tick was ignored
    Inactive,
}

/// Complete state of the simulated job
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobState {
    phase: JobPhase,
    progress: f32,
    tick: u32,
    session_id: Option<String>,
    logs: Vec<LogEntry>,
    source: Option<UploadedAsset>,
    target: Option<UploadedAsset>,
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Progress in percent, 0.0–100.0
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Rounded progress for display
    pub fn progress_percent(&self) -> u8 {
        self.progress.round().clamp(0.0, 100.0) as u8
    }

    pub fn ticks(&self) -> u32 {
        self.tick
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn source(&self) -> Option<&UploadedAsset> {
        self.source.as_ref()
    }

    pub fn target(&self) -> Option<&UploadedAsset> {
        self.target.as_ref()
    }

    /// Both inputs present and nothing running
    pub fn can_start(&self) -> bool {
        self.phase == JobPhase::Idle && self.source.is_some() && self.target.is_some()
    }

    /// Caption shown above the progress bar
    pub fn status_label(&self) -> &'static str {
        match self.phase {
            JobPhase::Training => "Training Model...",
            _ => "Processing...",
        }
    }

    /// The face to swap in; image or video
    pub fn attach_source(&mut self, asset: UploadedAsset) -> Result<(), StudioError> {
        self.ensure_idle()?;
        debug!("Source attached: {}", asset.name);
        self.source = Some(asset);
        Ok(())
    }

    /// The video to modify
    pub fn attach_target(&mut self, asset: UploadedAsset) -> Result<(), StudioError> {
        self.ensure_idle()?;
        if asset.kind != AssetKind::Video {
            return Err(StudioError::TargetNotVideo(asset.kind));
        }
        debug!("Target attached: {}", asset.name);
        self.target = Some(asset);
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), StudioError> {
        if self.phase != JobPhase::Idle {
            return Err(StudioError::NotIdle(self.phase));
        }
        Ok(())
    }

    /// Begin a job. Returns `false`, leaving the state untouched, unless
    /// both inputs are attached and the studio is idle.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R, now: DateTime<Utc>) -> bool {
        if !self.can_start() {
            debug!(
                "Start ignored: phase={:?} source={} target={}",
                self.phase,
                self.source.is_some(),
                self.target.is_some()
            );
            return false;
        }

        let session_id = script::session_id(rng);
        self.progress = 0.0;
        self.tick = 0;
        self.logs.clear();
        for (level, message) in script::opening_lines(&session_id) {
            self.push_log(now, level, message);
        }
        self.session_id = Some(session_id);
        self.advance_to(JobPhase::Processing);

        info!("🎭 Studio job {} started", self.session_id.as_deref().unwrap_or_default());
        true
    }

    /// Apply one step of the simulation timeline.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R, now: DateTime<Utc>) -> TickOutcome {
        if !self.phase.is_running() {
            return TickOutcome::Inactive;
        }

        self.tick += 1;
        let increment = rng.gen_range(0.0..MAX_STEP);
        self.progress = (self.progress + increment).min(PROGRESS_CAP).max(self.progress);

        let step = script::step(self.tick, rng);
        for (level, message) in step.logs {
            self.push_log(now, level, message);
        }
        if let Some(phase) = step.phase {
            self.advance_to(phase);
        }

        if self.tick >= FINAL_TICK {
            self.progress = 100.0;
            info!("✅ Studio job {} completed", self.session_id.as_deref().unwrap_or_default());
            return TickOutcome::Completed;
        }

        TickOutcome::Advanced
    }

    /// Back to a fresh idle studio, inputs included.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The produced media once the job has completed.
    ///
    /// The simulation does no real work, so the result is the target video.
    pub fn result(&self) -> Option<String> {
        if self.phase != JobPhase::Completed {
            return None;
        }
        self.target.as_ref().map(UploadedAsset::reference)
    }

    fn advance_to(&mut self, next: JobPhase) {
        if next.rank() > self.phase.rank() {
            debug!("Phase {:?} -> {:?}", self.phase, next);
            self.phase = next;
        }
    }

    fn push_log(&mut self, now: DateTime<Utc>, level: LogLevel, message: String) {
        self.logs.push(LogEntry {
            timestamp: now,
            level,
            message,
        });
    }
}
