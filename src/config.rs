//! Configuration types for colorization operations
//!
//! Configuration is layered: built-in defaults, then an optional JSON config
//! file, then `COLORIT_*` environment variables, and finally whatever the
//! caller (usually the CLI) sets through the builder.

use crate::error::{ColorizeError, Result};
use crate::models::ModelArtifacts;
use crate::processor::BackendType;
use crate::utils::ExecutionProviderManager;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a directory holding both model artifacts
pub const ENV_MODEL_DIR: &str = "COLORIT_MODEL_DIR";
/// Environment variable naming the ONNX network file
pub const ENV_MODEL: &str = "COLORIT_MODEL";
/// Environment variable naming the chrominance lookup table file
pub const ENV_POINTS: &str = "COLORIT_POINTS";
/// Environment variable holding a `backend:provider` string
pub const ENV_BACKEND: &str = "COLORIT_BACKEND";
/// Environment variable naming a JSON config file
pub const ENV_CONFIG: &str = "COLORIT_CONFIG";

/// Spatial size the reference network was trained on
pub const DEFAULT_INPUT_SIZE: u32 = 224;
/// Mean-centering offset subtracted from L before inference
pub const DEFAULT_LIGHTNESS_OFFSET: f32 = 50.0;
/// Class-confidence scaling applied to bin scores before the softmax
pub const DEFAULT_ANNEALING_SCALE: f32 = 2.606;
/// Number of quantized ab bins in the reference lookup table
pub const DEFAULT_LUT_BINS: usize = 313;
/// JPEG quality used when none is configured
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Execution provider options for ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// Auto-detect best available provider (CUDA > `CoreML` > CPU)
    #[default]
    Auto,
    /// CPU execution (always available)
    Cpu,
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon acceleration
    CoreMl,
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
        }
    }
}

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossy JPEG, the default save format
    #[default]
    Jpeg,
    /// Lossless PNG
    Png,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jpeg => write!(f, "jpeg"),
            Self::Png => write!(f, "png"),
        }
    }
}

/// Configuration for the colorization model state and pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorizerConfig {
    /// Locations of the network and lookup table artifacts
    pub artifacts: ModelArtifacts,

    /// Inference engine
    pub backend_type: BackendType,

    /// Execution provider for ONNX Runtime
    pub execution_provider: ExecutionProvider,

    /// Square working resolution fed to the network
    pub input_size: u32,

    /// Offset subtracted from L before inference
    pub lightness_offset: f32,

    /// Scale applied to bin scores before the softmax
    pub annealing_scale: f32,

    /// Expected number of lookup table entries
    pub lut_bins: usize,

    /// Format used when a save path carries no usable extension
    pub output_format: OutputFormat,

    /// JPEG quality (0-100, only used for JPEG output)
    pub jpeg_quality: u8,

    /// Number of intra-op threads for inference (0 = auto)
    pub intra_threads: usize,

    /// Number of inter-op threads for inference (0 = auto)
    pub inter_threads: usize,

    /// Enable debug mode (additional logging and validation)
    pub debug: bool,
}

impl Default for ColorizerConfig {
    fn default() -> Self {
        Self {
            artifacts: ModelArtifacts::default(),
            backend_type: BackendType::default(),
            execution_provider: ExecutionProvider::default(),
            input_size: DEFAULT_INPUT_SIZE,
            lightness_offset: DEFAULT_LIGHTNESS_OFFSET,
            annealing_scale: DEFAULT_ANNEALING_SCALE,
            lut_bins: DEFAULT_LUT_BINS,
            output_format: OutputFormat::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            intra_threads: 0,
            inter_threads: 0,
            debug: false,
        }
    }
}

impl ColorizerConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use colorit::{ColorizerConfig, ExecutionProvider};
    ///
    /// let config = ColorizerConfig::builder()
    ///     .model_dir("/opt/colorit/models")
    ///     .execution_provider(ExecutionProvider::Cpu)
    ///     .jpeg_quality(90)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.jpeg_quality, 90);
    /// ```
    #[must_use]
    pub fn builder() -> ColorizerConfigBuilder {
        ColorizerConfigBuilder::new()
    }

    /// Resolve configuration from defaults, a config file and the environment
    ///
    /// The config file is `config_file` when given, otherwise the path in
    /// `COLORIT_CONFIG` when set. Environment variables are applied last.
    pub fn resolve(config_file: Option<&Path>) -> Result<Self> {
        Self::resolve_with(config_file, |key| std::env::var(key).ok())
    }

    /// Same as [`ColorizerConfig::resolve`] with an explicit variable lookup
    pub fn resolve_with<F>(config_file: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = config_file
            .map(Path::to_path_buf)
            .or_else(|| lookup(ENV_CONFIG).map(PathBuf::from));

        let base = match file {
            Some(path) => Self::from_json_file(&path)?,
            None => Self::default(),
        };

        let config = base.apply_env_with(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a (possibly partial) configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ColorizeError::file_io_error("read config file", path, &e))?;

        serde_json::from_str(&content).map_err(|e| {
            ColorizeError::invalid_config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Overlay `COLORIT_*` environment variables
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlay variables obtained through `lookup`
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_MODEL_DIR) {
            self.artifacts = ModelArtifacts::in_dir(dir);
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.artifacts.model = PathBuf::from(model);
        }
        if let Some(points) = lookup(ENV_POINTS) {
            self.artifacts.points = PathBuf::from(points);
        }
        if let Some(provider) = lookup(ENV_BACKEND) {
            let (backend_type, execution_provider) =
                ExecutionProviderManager::parse_provider_string(&provider)?;
            self.backend_type = backend_type;
            self.execution_provider = execution_provider;
        }
        Ok(self)
    }

    /// Validate the configuration values
    pub fn validate(&self) -> Result<()> {
        if self.jpeg_quality > 100 {
            return Err(ColorizeError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "0-100",
                Some(DEFAULT_JPEG_QUALITY),
            ));
        }
        if self.input_size == 0 {
            return Err(ColorizeError::config_value_error(
                "input size",
                self.input_size,
                "1-4096",
                Some(DEFAULT_INPUT_SIZE),
            ));
        }
        if self.input_size > 4096 {
            return Err(ColorizeError::config_value_error(
                "input size",
                self.input_size,
                "1-4096",
                Some(DEFAULT_INPUT_SIZE),
            ));
        }
        if !self.lightness_offset.is_finite() {
            return Err(ColorizeError::invalid_config(
                "Lightness offset must be a finite number",
            ));
        }
        if !self.annealing_scale.is_finite() || self.annealing_scale <= 0.0 {
            return Err(ColorizeError::config_value_error(
                "annealing scale",
                self.annealing_scale,
                "> 0",
                Some(DEFAULT_ANNEALING_SCALE),
            ));
        }
        if self.lut_bins < 2 {
            return Err(ColorizeError::config_value_error(
                "lookup table bins",
                self.lut_bins,
                ">= 2",
                Some(DEFAULT_LUT_BINS),
            ));
        }
        // Tract always runs on the CPU, so `auto` resolves to it
        if self.backend_type == BackendType::Tract
            && matches!(
                self.execution_provider,
                ExecutionProvider::Cuda | ExecutionProvider::CoreMl
            )
        {
            return Err(ColorizeError::invalid_config(format!(
                "Tract backend only supports the cpu provider, got '{}'",
                self.execution_provider
            )));
        }
        Ok(())
    }
}

/// Builder for `ColorizerConfig`
pub struct ColorizerConfigBuilder {
    config: ColorizerConfig,
}

impl ColorizerConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ColorizerConfig::default(),
        }
    }

    /// Start from an existing configuration (e.g. one resolved from the environment)
    #[must_use]
    pub fn from_config(config: ColorizerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn artifacts(mut self, artifacts: ModelArtifacts) -> Self {
        self.config.artifacts = artifacts;
        self
    }

    /// Use the conventional artifact file names inside `dir`
    #[must_use]
    pub fn model_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.artifacts = ModelArtifacts::in_dir(dir);
        self
    }

    #[must_use]
    pub fn model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.artifacts.model = path.into();
        self
    }

    #[must_use]
    pub fn points_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.artifacts.points = path.into();
        self
    }

    #[must_use]
    pub fn backend_type(mut self, backend_type: BackendType) -> Self {
        self.config.backend_type = backend_type;
        self
    }

    #[must_use]
    pub fn execution_provider(mut self, provider: ExecutionProvider) -> Self {
        self.config.execution_provider = provider;
        self
    }

    #[must_use]
    pub fn input_size(mut self, size: u32) -> Self {
        self.config.input_size = size;
        self
    }

    #[must_use]
    pub fn lightness_offset(mut self, offset: f32) -> Self {
        self.config.lightness_offset = offset;
        self
    }

    #[must_use]
    pub fn annealing_scale(mut self, scale: f32) -> Self {
        self.config.annealing_scale = scale;
        self
    }

    #[must_use]
    pub fn lut_bins(mut self, bins: usize) -> Self {
        self.config.lut_bins = bins;
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(0, 100);
        self
    }

    #[must_use]
    pub fn intra_threads(mut self, threads: usize) -> Self {
        self.config.intra_threads = threads;
        self
    }

    #[must_use]
    pub fn inter_threads(mut self, threads: usize) -> Self {
        self.config.inter_threads = threads;
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `ColorizeError::InvalidConfig` when any value is out of range.
    pub fn build(self) -> Result<ColorizerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ColorizerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
