#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Colorit
//!
//! Automatic colorization of black-and-white photographs with a pretrained
//! convolutional network, running on ONNX Runtime or Tract.
//!
//! The network sees only the lightness of an image. It predicts the two
//! chrominance channels of CIE L\*a\*b\* at a reduced resolution, either
//! directly or as scores over a fixed table of 313 quantized ab bins; those
//! are upsampled and recombined with the untouched full-resolution
//! lightness, so detail always comes from the input.
//!
//! ## Features
//!
//! - **Two Backends**: ONNX Runtime (CPU, CUDA, `CoreML`) and Tract (pure Rust)
//! - **Load Once**: an immutable [`ModelState`] shared by any number of callers
//! - **Background Jobs**: [`ColorizeWorker`] runs the pipeline off the async runtime
//! - **Format Support**: reads JPEG, PNG, BMP, TIFF (and WebP); writes JPEG or PNG
//! - **CLI Integration**: the `colorit` binary (enable with the `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use colorit::{colorize_file, ColorizerConfig, ModelState};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = ColorizerConfig::builder()
//!     .model_dir("/opt/colorit/models")
//!     .build()?;
//! let state = ModelState::load(&config)?;
//!
//! let result = colorize_file(&state, "grandparents.jpg")?;
//! result.save("colorized_grandparents.jpg")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Background Processing
//!
//! ```rust,no_run
//! use colorit::{ColorizeWorker, ColorizerConfig, ModelState};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let state = Arc::new(ModelState::load(&ColorizerConfig::resolve(None)?)?);
//! let worker = ColorizeWorker::new(state, 1)?;
//!
//! let handle = worker.submit_file("scan.png");
//! // ... show a spinner ...
//! let result = handle.await??;
//! result.save("colorized_scan.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `onnx` (default): ONNX Runtime backend with GPU acceleration support
//! - `tract` (default): Pure Rust backend
//! - `cli` (default): Command-line interface and tracing set-up
//! - `webp-support` (default): WebP input decoding
//!
//! ### Library-Only Usage
//!
//! ```toml
//! [dependencies]
//! colorit = { version = "0.1", default-features = false, features = ["tract"] }
//! ```

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod colorspace;
pub mod config;
pub mod error;
pub mod inference;
pub mod lut;
pub mod models;
pub mod processor;
pub mod services;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;
pub mod worker;

use tokio::io::AsyncRead;

// Public API exports
pub use backends::*;
pub use colorspace::LabImage;
pub use config::{ColorizerConfig, ColorizerConfigBuilder, ExecutionProvider, OutputFormat};
pub use error::{ColorizeError, Result};
pub use inference::InferenceBackend;
pub use lut::ChromaLut;
pub use models::{ModelArtifacts, ModelInfo, ModelManager};
pub use processor::{
    colorize, colorize_bytes, colorize_file, colorize_with_progress, BackendFactory, BackendType,
    DefaultBackendFactory, ModelState,
};
pub use services::{
    ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, OutputFormatHandler,
    ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use types::{ColorizationResult, ProcessingMetadata, ProcessingTimings};
pub use utils::{ExecutionProviderManager, LabPreprocessor, ProviderInfo, TensorValidator};
pub use worker::ColorizeWorker;

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat, TracingOutput};

/// Colorize an image read from an async stream
///
/// The stream is read to the end and decoded in memory. The pipeline itself
/// runs on the calling task; use [`ColorizeWorker`] to keep it off the runtime.
///
/// # Examples
/// ```rust,no_run
/// use colorit::{colorize_from_reader, ColorizerConfig, ModelState};
/// use tokio::fs::File;
///
/// # async fn example() -> anyhow::Result<()> {
/// let state = ModelState::load(&ColorizerConfig::default())?;
/// let file = File::open("old_photo.png").await?;
/// let result = colorize_from_reader(file, &state).await?;
/// result.save("colorized_old_photo.png")?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// - `Io` when the stream cannot be read
/// - `Decode` when the data is not a supported image
/// - otherwise as [`colorize`]
pub async fn colorize_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    state: &ModelState,
) -> Result<ColorizationResult> {
    let image = ImageIOService::load_from_reader(&mut reader).await?;
    colorize(state, &image)
}
