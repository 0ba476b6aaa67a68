//! Model state and the colorization pipeline
//!
//! [`ModelState`] is built once from a [`ColorizerConfig`] and holds
//! everything a forward pass needs: the initialized backend, the chrominance
//! lookup table and the configuration they were built from. It is immutable
//! afterwards, so one state can be shared through an `Arc` by any number of
//! callers.
//!
//! The pipeline converts the image to L\*a\*b\*, feeds a resized and
//! mean-centred L plane to the network, decodes and upsamples the predicted
//! chrominance, and recombines it with the untouched full-resolution L.

use crate::{
    colorspace::{resize_chroma, LabImage},
    config::ColorizerConfig,
    error::{ColorizeError, Result},
    inference::InferenceBackend,
    lut::ChromaLut,
    models::{ModelInfo, ModelManager},
    services::{ImageIOService, ProcessingStage, ProgressReporter, ProgressTracker},
    types::{ColorizationResult, ProcessingMetadata, ProcessingTimings},
    utils::{LabPreprocessor, TensorValidator},
};
use image::{DynamicImage, GenericImageView};
use instant::Instant;
use log::{debug, info, warn};
use ndarray::Array4;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info as trace_info, instrument, span, Level};

/// Backend type enumeration for runtime selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// ONNX Runtime backend (supports GPU acceleration)
    #[default]
    Onnx,
    /// Tract backend (pure Rust, no external dependencies)
    Tract,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Onnx => write!(f, "onnx"),
            Self::Tract => write!(f, "tract"),
        }
    }
}

/// Factory trait for creating inference backends
pub trait BackendFactory: Send + Sync {
    /// Create an uninitialized backend of the specified type
    ///
    /// # Errors
    ///
    /// Returns `ColorizeError::InvalidConfig` when the backend is not
    /// compiled into this build.
    fn create_backend(
        &self,
        backend_type: BackendType,
        model_manager: ModelManager,
    ) -> Result<Box<dyn InferenceBackend>>;

    /// List available backend types
    fn available_backends(&self) -> Vec<BackendType>;
}

/// Builds whichever backends are enabled through cargo features
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn create_backend(
        &self,
        backend_type: BackendType,
        model_manager: ModelManager,
    ) -> Result<Box<dyn InferenceBackend>> {
        match backend_type {
            #[cfg(feature = "onnx")]
            BackendType::Onnx => Ok(Box::new(crate::backends::OnnxBackend::with_model_manager(
                model_manager,
            ))),
            #[cfg(feature = "tract")]
            BackendType::Tract => Ok(Box::new(
                crate::backends::TractBackend::with_model_manager(model_manager),
            )),
            #[allow(unreachable_patterns)]
            other => {
                drop(model_manager);
                Err(ColorizeError::invalid_config(format!(
                    "Backend '{}' is not enabled in this build. Enable the '{}' feature",
                    other, other
                )))
            },
        }
    }

    fn available_backends(&self) -> Vec<BackendType> {
        let mut backends = Vec::new();
        if cfg!(feature = "onnx") {
            backends.push(BackendType::Onnx);
        }
        if cfg!(feature = "tract") {
            backends.push(BackendType::Tract);
        }
        backends
    }
}

/// Everything needed to colorize images, loaded once
pub struct ModelState {
    backend: Box<dyn InferenceBackend>,
    lut: ChromaLut,
    config: ColorizerConfig,
    model_info: ModelInfo,
    preprocessor: LabPreprocessor,
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelState")
            .field("backend", &self.backend.name())
            .field("lut_bins", &self.lut.len())
            .field("model_info", &self.model_info)
            .finish_non_exhaustive()
    }
}

impl ModelState {
    /// Load the network and lookup table described by `config`
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` for out-of-range values or a disabled backend
    /// - `Initialization` when an artifact is missing or cannot be loaded;
    ///   the message lists every expected artifact path
    pub fn load(config: &ColorizerConfig) -> Result<Self> {
        Self::load_with_factory(config, &DefaultBackendFactory)
    }

    /// Same as [`ModelState::load`] with a custom backend factory
    #[instrument(skip(config, factory), fields(backend = %config.backend_type))]
    pub fn load_with_factory(config: &ColorizerConfig, factory: &dyn BackendFactory) -> Result<Self> {
        config.validate()?;
        let load_start = Instant::now();
        let artifacts = &config.artifacts;

        info!(
            "Loading colorization model: {} (lookup table {})",
            artifacts.model.display(),
            artifacts.points.display()
        );
        debug!("Backend: {}, provider: {}", config.backend_type, config.execution_provider);

        artifacts.validate()?;
        let lut = ChromaLut::from_file(&artifacts.points, config.lut_bins)?;
        let model_manager = ModelManager::from_config(config)?;

        let mut backend = factory.create_backend(config.backend_type, model_manager)?;
        let model_load_time = backend.initialize(config).map_err(|e| match e {
            ColorizeError::Initialization(_) | ColorizeError::InvalidConfig(_) => e,
            other => ColorizeError::initialization_with_artifacts(
                &other.to_string(),
                &artifacts.paths(),
            ),
        })?;

        let state = Self::with_backend(backend, lut, config.clone())?;
        info!(
            "Model ready in {}ms ({} backend, network load {}ms)",
            load_start.elapsed().as_millis(),
            state.backend_name(),
            model_load_time.map_or(0, |d| d.as_millis())
        );
        Ok(state)
    }

    /// Assemble a state from an already initialized backend
    ///
    /// # Errors
    ///
    /// - `Initialization` when the backend is not initialized or expects a
    ///   different input size than `config.input_size`
    pub fn with_backend(
        backend: Box<dyn InferenceBackend>,
        lut: ChromaLut,
        config: ColorizerConfig,
    ) -> Result<Self> {
        if !backend.is_initialized() {
            return Err(ColorizeError::initialization(format!(
                "Backend '{}' must be initialized before use",
                backend.name()
            )));
        }

        let size = config.input_size as usize;
        let expected = (1, 1, size, size);
        if backend.input_shape() != expected {
            return Err(ColorizeError::initialization(format!(
                "Backend expects input {:?} but the configured input is {:?}",
                backend.input_shape(),
                expected
            )));
        }

        let model_info = backend.get_model_info()?;
        let preprocessor = LabPreprocessor::new(config.input_size, config.lightness_offset);

        Ok(Self {
            backend,
            lut,
            config,
            model_info,
            preprocessor,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ColorizerConfig {
        &self.config
    }

    #[must_use]
    pub fn lut(&self) -> &ChromaLut {
        &self.lut
    }

    #[must_use]
    pub fn model_info(&self) -> &ModelInfo {
        &self.model_info
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}

/// Colorize an in-memory image
///
/// The result has the same width and height as `image`. The state is not
/// modified, and any error leaves it usable for the next call.
///
/// # Errors
///
/// - `InvalidInput` for an image with a zero dimension
/// - `Inference` when the forward pass fails or returns an unexpected tensor
pub fn colorize(state: &ModelState, image: &DynamicImage) -> Result<ColorizationResult> {
    run_pipeline(state, image, None)
}

/// Colorize an image, reporting each stage to `reporter`
pub fn colorize_with_progress(
    state: &ModelState,
    image: &DynamicImage,
    reporter: &dyn ProgressReporter,
) -> Result<ColorizationResult> {
    let mut tracker = ProgressTracker::new(reporter);
    tracker.report_stage(ProcessingStage::Initialization);

    match run_pipeline(state, image, Some(&mut tracker)) {
        Ok(result) => {
            tracker.report_stage(ProcessingStage::Completed);
            tracker.report_completion(result.metadata.timings.clone());
            Ok(result)
        },
        Err(e) => {
            tracker.report_error(&e.to_string());
            Err(e)
        },
    }
}

/// Decode and colorize an encoded image buffer
///
/// # Errors
///
/// - `Decode` when `bytes` is not a supported image
/// - otherwise as [`colorize`]
pub fn colorize_bytes(state: &ModelState, bytes: &[u8]) -> Result<ColorizationResult> {
    let decode_start = Instant::now();
    let image = ImageIOService::decode(bytes)?;
    let decode_ms = decode_start.elapsed().as_millis() as u64;

    let mut result = colorize(state, &image)?;
    add_decode_time(&mut result, decode_ms);
    Ok(result)
}

/// Load and colorize an image file
///
/// # Errors
///
/// - `Io` when the file does not exist or cannot be read
/// - `Decode` when the file is not a supported image
/// - otherwise as [`colorize`]
pub fn colorize_file<P: AsRef<Path>>(state: &ModelState, path: P) -> Result<ColorizationResult> {
    let path = path.as_ref();
    let decode_start = Instant::now();
    let image = ImageIOService::load_image(path)?;
    let decode_ms = decode_start.elapsed().as_millis() as u64;

    let mut result = colorize(state, &image)?;
    add_decode_time(&mut result, decode_ms);
    Ok(result.with_input_path(path.display().to_string()))
}

fn add_decode_time(result: &mut ColorizationResult, decode_ms: u64) {
    let timings = &mut result.metadata.timings;
    timings.image_decode_ms = decode_ms;
    timings.total_ms += decode_ms;
}

fn report(tracker: &mut Option<&mut ProgressTracker<'_>>, stage: ProcessingStage) {
    if let Some(tracker) = tracker.as_deref_mut() {
        tracker.report_stage(stage);
    }
}

#[instrument(
    skip(state, image, tracker),
    fields(
        backend = %state.backend_name(),
        dimensions = %format!("{}x{}", image.width(), image.height())
    )
)]
fn run_pipeline(
    state: &ModelState,
    image: &DynamicImage,
    mut tracker: Option<&mut ProgressTracker<'_>>,
) -> Result<ColorizationResult> {
    let total_start = Instant::now();
    let mut timings = ProcessingTimings::default();
    let (width, height) = image.dimensions();
    TensorValidator::validate_image_dimensions(width, height)?;

    trace_info!(backend = %state.backend_name(), "🎨 Starting colorization");

    report(&mut tracker, ProcessingStage::Preprocessing);
    let preprocess_start = Instant::now();
    let (lab, input_tensor) = {
        let _span = span!(Level::DEBUG, "preprocessing", width = %width, height = %height).entered();
        let lab = LabImage::from_rgb(&image.to_rgb8());
        let tensor = state.preprocessor.to_tensor(&lab)?;
        (lab, tensor)
    };
    timings.preprocessing_ms = preprocess_start.elapsed().as_millis() as u64;

    report(&mut tracker, ProcessingStage::Inference);
    let inference_start = Instant::now();
    let output = {
        let _span = span!(Level::INFO, "inference", backend = %state.backend_name()).entered();
        state.backend.infer(&input_tensor)?
    };
    timings.inference_ms = inference_start.elapsed().as_millis() as u64;
    let output_shape = output.dim();
    debug!("Network output shape: {:?}", output_shape);

    report(&mut tracker, ProcessingStage::Postprocessing);
    let postprocess_start = Instant::now();
    let colorized = {
        let _span = span!(Level::DEBUG, "postprocessing").entered();
        postprocess(state, &output, &lab, &mut tracker)?
    };
    timings.postprocessing_ms = postprocess_start.elapsed().as_millis() as u64;
    timings.total_ms = total_start.elapsed().as_millis() as u64;

    let mut metadata = ProcessingMetadata::new(state.model_info.name.clone(), state.backend_name());
    metadata.network_output_shape = output_shape;
    metadata.timings = timings;

    Ok(ColorizationResult::new(colorized, (width, height), metadata))
}

/// Decode the network output and recombine it with the original lightness
fn postprocess(
    state: &ModelState,
    output: &Array4<f32>,
    lab: &LabImage,
    tracker: &mut Option<&mut ProgressTracker<'_>>,
) -> Result<image::RgbImage> {
    if state.config.debug {
        let non_finite = TensorValidator::count_non_finite(output);
        if non_finite > 0 {
            warn!("Network output contains {} non-finite values", non_finite);
        }
    }

    let ab = state.lut.decode(output, state.config.annealing_scale)?;
    let ab = resize_chroma(ab.view(), lab.width(), lab.height());
    let colorized = LabImage::from_planes(lab.lightness().to_owned(), ab)?;

    report(tracker, ProcessingStage::ColorConversion);
    Ok(colorized.to_rgb())
}
