//! Inference backend abstraction

use crate::{config::ColorizerConfig, error::Result, models::ModelInfo};
use ndarray::Array4;

// Use instant crate for cross-platform time compatibility
use instant::Duration;

/// Trait for inference backends
///
/// `infer` takes `&self` so a single initialized backend can be shared by
/// concurrent pipelines. Engines whose sessions need exclusive access must
/// serialize internally.
pub trait InferenceBackend: Send + Sync {
    /// Initialize the backend with the given configuration
    ///
    /// Returns the time spent loading the model, if the backend measured it.
    ///
    /// # Errors
    /// - Model artifacts missing or unreadable
    /// - Model graph cannot be loaded by the engine
    fn initialize(&mut self, config: &ColorizerConfig) -> Result<Option<Duration>>;

    /// Run a forward pass on a `(1, 1, S, S)` lightness tensor
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Engine failures
    /// - Output is not a 4-D tensor
    fn infer(&self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Expected input shape (NCHW)
    fn input_shape(&self) -> (usize, usize, usize, usize);

    /// Get model information for this backend
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Model metadata unavailable
    fn get_model_info(&self) -> Result<ModelInfo>;

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;

    /// Short engine name used in logs and result metadata
    fn name(&self) -> &'static str;
}
