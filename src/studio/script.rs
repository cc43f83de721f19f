//! Canned timeline of the face-swap simulation.

use rand::distributions::Alphanumeric;
use rand::Rng;

use super::{JobPhase, LogLevel};

/// Tick at which the job completes
pub const FINAL_TICK: u32 = 200;

/// Progress never exceeds this before the final tick
pub const PROGRESS_CAP: f32 = 99.0;

/// Largest random progress increment per tick
pub const MAX_STEP: f32 = 2.0;

/// What a single tick adds to the job
#[derive(Debug, Default, PartialEq)]
pub struct ScriptStep {
    pub logs: Vec<(LogLevel, String)>,
    pub phase: Option<JobPhase>,
}

impl ScriptStep {
    fn log(mut self, level: LogLevel, message: impl Into<String>) -> Self {
        self.logs.push((level, message.into()));
        self
    }

    fn enter(mut self, phase: JobPhase) -> Self {
        self.phase = Some(phase);
        self
    }
}

/// Short random session tag, e.g. `k3f9q2`
pub fn session_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..6)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
        .collect()
}

/// Log lines emitted when a job starts
pub fn opening_lines(session_id: &str) -> Vec<(LogLevel, String)> {
    vec![
        (LogLevel::Info, format!("Initialized session {}", session_id)),
        (LogLevel::Info, "Allocating GPU resources (Tesla T4)...".to_string()),
    ]
}

/// Logs and phase change scheduled for `tick`
pub fn step<R: Rng + ?Sized>(tick: u32, rng: &mut R) -> ScriptStep {
    let step = ScriptStep::default();

    match tick {
        5 => step
            .log(LogLevel::Success, "Resource allocation complete.")
            .log(LogLevel::Info, "Analyzing Source Face...")
            .enter(JobPhase::Training),
        15 => step
            .log(LogLevel::Info, "Detected 1 face in source image.")
            .log(LogLevel::Info, "Extracting landmarks (68 points)..."),
        30 => step.log(LogLevel::Info, "Analyzing Target Video frames..."),
        45 => step.log(LogLevel::Info, "Starting Model Training (10,000 iterations)..."),
        t if t > 50 && t < 150 && t % 10 == 0 => {
            let loss: f64 = rng.gen_range(0.0..0.5);
            step.log(
                LogLevel::Info,
                format!("Training... Iteration {} | Loss: {:.4}", t * 100, loss),
            )
        }
        150 => step
            .log(LogLevel::Success, "Training converged.")
            .log(LogLevel::Info, "Starting Face Swap Generation...")
            .enter(JobPhase::Generating),
        180 => step
            .log(LogLevel::Info, "Rendering final frames...")
            .log(LogLevel::Info, "Applying color correction..."),
        t if t >= FINAL_TICK => step
            .log(
                LogLevel::Success,
                "Job Completed Successfully. Video ready for download.",
            )
            .enter(JobPhase::Completed),
        _ => step,
    }
}
