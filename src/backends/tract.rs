//! Tract backend for the colorization network
//!
//! Pure Rust inference with no native dependencies. The ONNX graph is
//! loaded with its input pinned to `(1, 1, S, S)` so Tract can fully type and
//! optimize it. A runnable Tract plan is immutable, so `infer` is re-entrant.

use crate::config::ColorizerConfig;
use crate::error::{ColorizeError, Result};
use crate::inference::InferenceBackend;
use crate::models::{ModelInfo, ModelManager};
use ndarray::{Array4, Ix4};
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

// Use instant crate for cross-platform time compatibility
use instant::{Duration, Instant};

/// Tract backend for running the colorization network in pure Rust
#[derive(Debug, Default)]
pub struct TractBackend {
    model: Option<TractModel>,
    model_manager: Option<ModelManager>,
    input_size: usize,
}

impl TractBackend {
    /// List Tract execution providers with availability status and descriptions
    ///
    /// # Examples
    /// ```rust
    /// use colorit::backends::TractBackend;
    ///
    /// let providers = TractBackend::list_providers();
    /// assert_eq!(providers[0].0, "CPU");
    /// ```
    #[must_use]
    pub fn list_providers() -> Vec<(String, bool, String)> {
        let cpu_count = std::thread::available_parallelism()
            .map(std::num::NonZero::get)
            .unwrap_or(1);
        log::debug!("🔍 Tract backend: {} cores available", cpu_count);

        vec![(
            "CPU".to_string(),
            true,
            "Pure Rust CPU inference with no external dependencies".to_string(),
        )]
    }

    /// Create a new uninitialized Tract backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a Tract backend with a pre-configured model manager
    #[must_use]
    pub fn with_model_manager(model_manager: ModelManager) -> Self {
        Self {
            model: None,
            model_manager: Some(model_manager),
            input_size: 0,
        }
    }

    fn load_model(&mut self, config: &ColorizerConfig) -> Result<Duration> {
        let model_load_start = Instant::now();

        let Some(ref model_manager) = self.model_manager else {
            return Err(ColorizeError::internal(
                "No model manager available for Tract backend",
            ));
        };

        let model_data = model_manager.load_model()?;
        let model_info = model_manager.get_info()?;
        let size = config.input_size as usize;

        log::info!("🚀 Initializing Tract backend");
        log::info!("🧠 Model: {}", model_info.name);
        let size_mb = model_info.size_bytes as f64 / (1024.0 * 1024.0);
        log::info!("📏 Model size: {size_mb:.2} MB");

        let rejected = |step: &str, e: &dyn std::fmt::Display| {
            ColorizeError::initialization_with_artifacts(
                &format!("{step}: {e}"),
                &model_manager.artifacts().paths(),
            )
        };

        let model = onnx()
            .model_for_read(&mut std::io::Cursor::new(model_data))
            .map_err(|e| rejected("Failed to load ONNX model", &e))?
            .with_input_fact(0, f32::fact([1, 1, size, size]).into())
            .map_err(|e| rejected("Failed to set input shape", &e))?
            .into_optimized()
            .map_err(|e| rejected("Failed to optimize model", &e))?
            .into_runnable()
            .map_err(|e| rejected("Failed to create runnable model", &e))?;

        self.model = Some(model);
        self.input_size = size;

        let model_load_time = model_load_start.elapsed();
        log::info!(
            "✅ Tract backend initialized in {}ms",
            model_load_time.as_millis()
        );

        Ok(model_load_time)
    }
}

impl InferenceBackend for TractBackend {
    fn initialize(&mut self, config: &ColorizerConfig) -> Result<Option<Duration>> {
        if self.is_initialized() {
            return Ok(None);
        }
        if self.model_manager.is_none() {
            self.model_manager = Some(ModelManager::from_config(config)?);
        }

        self.load_model(config).map(Some)
    }

    fn infer(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| ColorizeError::inference("Tract model not initialized"))?;

        log::debug!("🔮 Running Tract inference on {:?}", input.shape());
        let inference_start = Instant::now();

        let input_tensor = Tensor::from(input.clone());
        let outputs = model.run(tvec![input_tensor.into()]).map_err(|e| {
            ColorizeError::inference_error_with_backend("tract", "Forward pass", &e.to_string())
        })?;

        let output_tensor = outputs
            .into_iter()
            .next()
            .ok_or_else(|| ColorizeError::inference("No output tensor found"))?
            .into_arc_tensor();

        let output_data = output_tensor.to_array_view::<f32>().map_err(|e| {
            ColorizeError::inference(format!("Failed to convert output tensor: {e}"))
        })?;

        let output_array = output_data
            .to_owned()
            .into_dimensionality::<Ix4>()
            .map_err(|_| {
                ColorizeError::inference(format!(
                    "Expected 4D output tensor, got {}D",
                    output_data.ndim()
                ))
            })?;

        log::debug!(
            "✅ Tract inference completed in {}ms, output {:?}",
            inference_start.elapsed().as_millis(),
            output_array.shape()
        );
        Ok(output_array)
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 1, self.input_size, self.input_size)
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        self.model_manager
            .as_ref()
            .ok_or_else(|| ColorizeError::internal("Model manager not initialized"))?
            .get_info()
    }

    fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    fn name(&self) -> &'static str {
        "tract"
    }
}
