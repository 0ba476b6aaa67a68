//! Progress reporting service
//!
//! Lets frontends observe pipeline stages without the pipeline knowing how
//! they are rendered (spinner, log lines, nothing).

use crate::types::ProcessingTimings;
use instant::Instant;
use log::Level;

/// Pipeline stages, in the order a successful run reports them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProcessingStage {
    /// Run accepted, nothing computed yet
    Initialization,
    /// sRGB to L\*a\*b\*, resize to the network size, tensor construction
    Preprocessing,
    /// Forward pass
    Inference,
    /// Chroma decoding through the lookup table and upsampling
    Postprocessing,
    /// L\*a\*b\* back to 8-bit sRGB
    ColorConversion,
    Completed,
}

impl ProcessingStage {
    pub const ALL: [ProcessingStage; 6] = [
        Self::Initialization,
        Self::Preprocessing,
        Self::Inference,
        Self::Postprocessing,
        Self::ColorConversion,
        Self::Completed,
    ];

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Initialization => "Starting colorization",
            Self::Preprocessing => "Extracting lightness",
            Self::Inference => "Predicting colours",
            Self::Postprocessing => "Upsampling chroma",
            Self::ColorConversion => "Converting back to RGB",
            Self::Completed => "Colorization completed",
        }
    }

    /// Rough share of the work done once this stage starts
    ///
    /// The forward pass dominates, so most of the range sits after it.
    #[must_use]
    pub fn progress_percentage(self) -> u8 {
        match self {
            Self::Initialization => 0,
            Self::Preprocessing => 5,
            Self::Inference => 15,
            Self::Postprocessing => 85,
            Self::ColorConversion => 92,
            Self::Completed => 100,
        }
    }
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Snapshot sent to a reporter when a stage starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub stage: ProcessingStage,
    /// 0-100
    pub progress: u8,
    /// Milliseconds since the run started
    pub elapsed_ms: u64,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(stage: ProcessingStage, start_time: Instant) -> Self {
        Self {
            stage,
            progress: stage.progress_percentage(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
        }
    }
}

/// Receives stage changes from one or more pipeline runs
pub trait ProgressReporter: Send + Sync {
    fn report_progress(&self, update: ProgressUpdate);

    /// Called once after [`ProcessingStage::Completed`]
    fn report_completion(&self, timings: ProcessingTimings);

    /// Called instead of completion when the run fails in `stage`
    fn report_error(&self, stage: ProcessingStage, error: &str);
}

/// Discards everything
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn report_progress(&self, _update: ProgressUpdate) {}

    fn report_completion(&self, _timings: ProcessingTimings) {}

    fn report_error(&self, _stage: ProcessingStage, _error: &str) {}
}

/// Writes stages and the timing breakdown through `log`
///
/// Stage lines go out at `level`; failures are always logged as errors.
pub struct ConsoleProgressReporter {
    level: Level,
}

impl ConsoleProgressReporter {
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

impl Default for ConsoleProgressReporter {
    fn default() -> Self {
        Self::new(Level::Debug)
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        log::log!(
            self.level,
            "[{:>3}%] {} (+{}ms)",
            update.progress,
            update.stage,
            update.elapsed_ms
        );
    }

    fn report_completion(&self, timings: ProcessingTimings) {
        log::log!(
            self.level,
            "🎨 Done in {}ms: preprocess {}ms, network {}ms ({:.0}%), postprocess {}ms",
            timings.total_ms,
            timings.preprocessing_ms,
            timings.inference_ms,
            timings.inference_ratio() * 100.0,
            timings.postprocessing_ms
        );
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        log::error!("❌ {} failed: {}", stage, error);
    }
}

/// Stage bookkeeping for a single pipeline run
pub struct ProgressTracker<'a> {
    reporter: &'a dyn ProgressReporter,
    start_time: Instant,
    current_stage: Option<ProcessingStage>,
}

impl<'a> ProgressTracker<'a> {
    #[must_use]
    pub fn new(reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            reporter,
            start_time: Instant::now(),
            current_stage: None,
        }
    }

    pub fn report_stage(&mut self, stage: ProcessingStage) {
        self.current_stage = Some(stage);
        self.reporter
            .report_progress(ProgressUpdate::new(stage, self.start_time));
    }

    pub fn report_completion(&self, timings: ProcessingTimings) {
        self.reporter.report_completion(timings);
    }

    /// Blame the stage in progress, or initialization if none started
    pub fn report_error(&self, error: &str) {
        let stage = self.current_stage.unwrap_or(ProcessingStage::Initialization);
        self.reporter.report_error(stage, error);
    }

    #[must_use]
    pub fn current_stage(&self) -> Option<ProcessingStage> {
        self.current_stage
    }
}
