//! Model artifact resolution and loading
//!
//! A colorization model is two files: the ONNX network (graph and weights)
//! and the chrominance lookup table. Both are resolved from configuration
//! at start-up and read exactly once.

use crate::error::{ColorizeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Conventional file name of the colorization network
pub const DEFAULT_MODEL_FILE: &str = "colorization_release_v2.onnx";
/// Conventional file name of the quantized ab lookup table
pub const DEFAULT_POINTS_FILE: &str = "pts_in_hull.npy";

/// Paths of the artifacts that make up a colorization model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArtifacts {
    /// ONNX network file
    pub model: PathBuf,
    /// Lookup table file (`.npy` or `.json`)
    pub points: PathBuf,
}

impl ModelArtifacts {
    /// Artifacts with explicit paths
    pub fn new<M: Into<PathBuf>, P: Into<PathBuf>>(model: M, points: P) -> Self {
        Self {
            model: model.into(),
            points: points.into(),
        }
    }

    /// Artifacts with the conventional file names inside `dir`
    pub fn in_dir<P: Into<PathBuf>>(dir: P) -> Self {
        let dir = dir.into();
        Self {
            model: dir.join(DEFAULT_MODEL_FILE),
            points: dir.join(DEFAULT_POINTS_FILE),
        }
    }

    /// Platform data directory used when nothing else is configured
    ///
    /// `<data dir>/colorit/models`, falling back to `./models` on platforms
    /// without a data directory.
    #[must_use]
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .map_or_else(|| PathBuf::from("models"), |dir| dir.join("colorit").join("models"))
    }

    /// All artifact paths, in load order
    #[must_use]
    pub fn paths(&self) -> [&Path; 2] {
        [self.model.as_path(), self.points.as_path()]
    }

    /// Check that every artifact exists and is a regular file
    pub fn validate(&self) -> Result<()> {
        for path in self.paths() {
            if !path.exists() {
                return Err(ColorizeError::initialization_with_artifacts(
                    &format!("'{}' does not exist", path.display()),
                    &self.paths(),
                ));
            }
            if !path.is_file() {
                return Err(ColorizeError::initialization_with_artifacts(
                    &format!("'{}' is not a file", path.display()),
                    &self.paths(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for ModelArtifacts {
    fn default() -> Self {
        Self::in_dir(Self::default_dir())
    }
}

/// Model information and metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub size_bytes: usize,
    pub input_shape: (usize, usize, usize, usize), // NCHW format
    pub lut_bins: usize,
}

/// Resolves artifacts and hands their contents to backends
#[derive(Debug, Clone)]
pub struct ModelManager {
    artifacts: ModelArtifacts,
    input_size: usize,
    lut_bins: usize,
}

impl ModelManager {
    /// Create a manager, failing with `Initialization` if any artifact is missing
    pub fn new(artifacts: ModelArtifacts, input_size: u32, lut_bins: usize) -> Result<Self> {
        artifacts.validate()?;
        Ok(Self {
            artifacts,
            input_size: input_size as usize,
            lut_bins,
        })
    }

    /// Create a manager from a configuration
    pub fn from_config(config: &crate::config::ColorizerConfig) -> Result<Self> {
        Self::new(config.artifacts.clone(), config.input_size, config.lut_bins)
    }

    #[must_use]
    pub fn artifacts(&self) -> &ModelArtifacts {
        &self.artifacts
    }

    /// Read the ONNX network bytes
    pub fn load_model(&self) -> Result<Vec<u8>> {
        let data = fs::read(&self.artifacts.model).map_err(|e| {
            ColorizeError::initialization_with_artifacts(
                &format!("failed to read network: {}", e),
                &self.artifacts.paths(),
            )
        })?;

        if data.is_empty() {
            return Err(ColorizeError::initialization_with_artifacts(
                "network file is empty",
                &self.artifacts.paths(),
            ));
        }

        log::debug!(
            "Loaded network from {} ({} bytes)",
            self.artifacts.model.display(),
            data.len()
        );
        Ok(data)
    }

    /// Describe the configured model
    pub fn get_info(&self) -> Result<ModelInfo> {
        let metadata = fs::metadata(&self.artifacts.model)
            .map_err(|e| ColorizeError::file_io_error("stat model", &self.artifacts.model, &e))?;

        let name = self
            .artifacts
            .model
            .file_stem()
            .map_or_else(|| "unknown".to_string(), |s| s.to_string_lossy().to_string());

        Ok(ModelInfo {
            name,
            size_bytes: usize::try_from(metadata.len()).unwrap_or(usize::MAX),
            input_shape: (1, 1, self.input_size, self.input_size),
            lut_bins: self.lut_bins,
        })
    }
}
