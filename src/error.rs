//! Error types for colorization operations

use thiserror::Error;

/// Result type alias for colorization operations
pub type Result<T> = std::result::Result<T, ColorizeError>;

/// Error taxonomy for the colorization pipeline
///
/// Only [`ColorizeError::Initialization`] is fatal: it means the model state
/// could not be built and no request can be served. Every other variant is
/// scoped to a single call and leaves the loaded model state usable.
#[derive(Error, Debug)]
pub enum ColorizeError {
    /// Network, weights or lookup table missing or malformed at start-up
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Input could not be parsed as a raster image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Forward pass failed or produced an unexpected tensor
    #[error("Inference error: {0}")]
    Inference(String),

    /// Output could not be serialized to the requested format or path
    #[error("Encode error: {0}")]
    Encode(String),

    /// Decoded image cannot be processed (e.g. zero-sized)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ColorizeError {
    /// Create a new initialization error
    pub fn initialization<S: Into<String>>(msg: S) -> Self {
        Self::Initialization(msg.into())
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error prevents any further colorization in this process
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Initialization(_))
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create an initialization error that names every expected artifact
    pub fn initialization_with_artifacts<P: AsRef<std::path::Path>>(
        error: &str,
        artifacts: &[P],
    ) -> Self {
        let listing = artifacts
            .iter()
            .map(|p| format!("  - {}", p.as_ref().display()))
            .collect::<Vec<_>>()
            .join("\n");

        Self::Initialization(format!(
            "Failed to load model files: {}\nPlease ensure these files exist:\n{}",
            error, listing
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create inference error with backend context
    pub fn inference_error_with_backend(backend: &str, operation: &str, error: &str) -> Self {
        Self::Inference(format!(
            "{} failed using '{}' backend: {}",
            operation, backend, error
        ))
    }
}
