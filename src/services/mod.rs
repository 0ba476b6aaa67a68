//! Frontend-agnostic services: image I/O, output formats, progress

pub mod format;
pub mod io;
pub mod progress;

pub use format::{OutputFormatHandler, OUTPUT_PREFIX};
pub use io::ImageIOService;
pub use progress::{
    ConsoleProgressReporter, NoOpProgressReporter, ProcessingStage, ProgressReporter,
    ProgressTracker, ProgressUpdate,
};
