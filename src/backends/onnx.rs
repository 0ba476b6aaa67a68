//! ONNX Runtime backend for the colorization network
//!
//! Runs the network through ONNX Runtime with CPU, CUDA or `CoreML`
//! execution providers. A `Session` needs exclusive access to run, so the
//! backend keeps it behind a mutex and forward passes on one backend are
//! serialized.

use crate::config::{ColorizerConfig, ExecutionProvider};
use crate::error::{ColorizeError, Result};
use crate::inference::InferenceBackend;
use crate::models::{ModelInfo, ModelManager};
use instant::{Duration, Instant};
use ndarray::Array4;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
    ExecutionProviderDispatch,
};
use ort::session::{builder::GraphOptimizationLevel, builder::SessionBuilder, Session};
use ort::value::Value;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// ONNX Runtime backend
#[derive(Debug, Default)]
pub struct OnnxBackend {
    session: Option<Mutex<Session>>,
    model_manager: Option<ModelManager>,
    input_size: usize,
}

impl OnnxBackend {
    /// List all ONNX Runtime execution providers with availability status and descriptions
    ///
    /// # Examples
    /// ```rust
    /// use colorit::backends::OnnxBackend;
    ///
    /// for (name, available, description) in OnnxBackend::list_providers() {
    ///     println!("{}: {} - {}", name, if available { "yes" } else { "no" }, description);
    /// }
    /// ```
    #[must_use]
    pub fn list_providers() -> Vec<(String, bool, String)> {
        log::debug!("🔍 System: {} / {}", std::env::consts::OS, std::env::consts::ARCH);

        let cuda_available = cuda_available();
        let coreml_available = coreml_available();
        if !coreml_available {
            #[cfg(target_os = "macos")]
            log::warn!("❌ CoreML execution provider is not available on this macOS build");
        }

        vec![
            (
                "CPU".to_string(),
                true,
                "Always available, uses CPU for inference".to_string(),
            ),
            (
                "CUDA".to_string(),
                cuda_available,
                "NVIDIA GPU acceleration (requires CUDA toolkit and compatible GPU)".to_string(),
            ),
            (
                "CoreML".to_string(),
                coreml_available,
                "Apple Silicon GPU acceleration (macOS only)".to_string(),
            ),
        ]
    }

    /// Create a new ONNX backend reading its network through `model_manager`
    #[must_use]
    pub fn with_model_manager(model_manager: ModelManager) -> Self {
        Self {
            session: None,
            model_manager: Some(model_manager),
            input_size: 0,
        }
    }

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn model_manager(&self) -> Result<&ModelManager> {
        self.model_manager
            .as_ref()
            .ok_or_else(|| ColorizeError::internal("Model manager not set for ONNX backend"))
    }

    fn execution_providers(provider: ExecutionProvider) -> Vec<ExecutionProviderDispatch> {
        match provider {
            ExecutionProvider::Auto => {
                let mut providers = Vec::new();
                if cuda_available() {
                    log::info!("🚀 CUDA execution provider is available and will be used");
                    providers.push(CUDAExecutionProvider::default().build());
                }
                if coreml_available() {
                    log::info!("🍎 CoreML execution provider is available and will be used");
                    providers.push(CoreMLExecutionProvider::default().with_subgraphs(true).build());
                }
                if providers.is_empty() {
                    log::info!("No hardware acceleration available, using CPU");
                }
                providers
            },
            ExecutionProvider::Cpu => {
                log::info!("Using CPU execution provider");
                Vec::new()
            },
            ExecutionProvider::Cuda => {
                if cuda_available() {
                    log::info!("Using CUDA execution provider");
                    vec![CUDAExecutionProvider::default().build()]
                } else {
                    log::warn!(
                        "CUDA execution provider requested but not available, falling back to CPU"
                    );
                    Vec::new()
                }
            },
            ExecutionProvider::CoreMl => {
                if coreml_available() {
                    log::info!("🍎 Using CoreML execution provider (explicitly requested)");
                    vec![CoreMLExecutionProvider::default().with_subgraphs(true).build()]
                } else {
                    log::warn!(
                        "CoreML execution provider requested but not available, falling back to CPU"
                    );
                    Vec::new()
                }
            },
        }
    }

    fn session_builder(config: &ColorizerConfig) -> Result<SessionBuilder> {
        let mut builder = Session::builder()
            .map_err(|e| init_error("Failed to create session builder", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| init_error("Failed to set optimization level", e))?;

        let providers = Self::execution_providers(config.execution_provider);
        if !providers.is_empty() {
            builder = builder
                .with_execution_providers(providers)
                .map_err(|e| init_error("Failed to set execution providers", e))?;
        }

        let cores = std::thread::available_parallelism()
            .map(std::num::NonZero::get)
            .unwrap_or(8);
        let intra_threads = if config.intra_threads > 0 {
            config.intra_threads
        } else {
            cores
        };
        // Coordination threads, typically 1-4
        let inter_threads = if config.inter_threads > 0 {
            config.inter_threads
        } else {
            (cores / 4).max(1)
        };
        log::debug!(
            "Threading: {intra_threads} intra-op threads, {inter_threads} inter-op threads"
        );

        builder
            .with_parallel_execution(true)
            .map_err(|e| init_error("Failed to enable parallel execution", e))?
            .with_intra_threads(intra_threads)
            .map_err(|e| init_error("Failed to set intra threads", e))?
            .with_inter_threads(inter_threads)
            .map_err(|e| init_error("Failed to set inter threads", e))
    }

    fn load_model(&mut self, config: &ColorizerConfig) -> Result<Duration> {
        let model_load_start = Instant::now();
        let model_data = self.model_manager()?.load_model()?;

        let session = Self::session_builder(config)?
            .commit_from_memory(&model_data)
            .map_err(|e| {
                ColorizeError::initialization_with_artifacts(
                    &format!("ONNX Runtime rejected the network: {e}"),
                    &[&config.artifacts.model],
                )
            })?;

        if session.inputs.len() != 1 {
            log::warn!(
                "Network declares {} inputs, only the first is fed",
                session.inputs.len()
            );
        }

        self.session = Some(Mutex::new(session));
        self.input_size = config.input_size as usize;

        let model_load_time = model_load_start.elapsed();
        log::info!(
            "📊 Model loading complete: {:.0}ms",
            model_load_time.as_secs_f64() * 1000.0
        );
        Ok(model_load_time)
    }
}

fn init_error<E: std::fmt::Display>(step: &str, e: E) -> ColorizeError {
    ColorizeError::initialization(format!("{step}: {e}"))
}

fn cuda_available() -> bool {
    OrtExecutionProvider::is_available(&CUDAExecutionProvider::default()).unwrap_or(false)
}

fn coreml_available() -> bool {
    OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default()).unwrap_or(false)
}

impl InferenceBackend for OnnxBackend {
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
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| ColorizeError::inference("ONNX backend not initialized"))?;

        let inference_start = Instant::now();
        log::debug!("🚀 Starting inference with input shape: {:?}", input.dim());

        let input_value = Value::from_array(input.clone()).map_err(|e| {
            ColorizeError::inference_error_with_backend("onnx", "Tensor conversion", &e.to_string())
        })?;

        let mut session = lock_session(session);

        let outputs = session.run(ort::inputs![input_value]).map_err(|e| {
            ColorizeError::inference_error_with_backend("onnx", "Forward pass", &e.to_string())
        })?;

        // Positional access avoids depending on exported tensor names
        let first_key = outputs
            .keys()
            .next()
            .ok_or_else(|| ColorizeError::inference("Network produced no outputs"))?;
        let output_tensor = outputs
            .get(first_key)
            .ok_or_else(|| ColorizeError::inference("First output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| {
                ColorizeError::inference_error_with_backend(
                    "onnx",
                    "Output extraction",
                    &e.to_string(),
                )
            })?;

        let result = output_tensor
            .to_owned()
            .into_dimensionality::<ndarray::Ix4>()
            .map_err(|_| {
                ColorizeError::inference(format!(
                    "Expected 4D output tensor, got {}D",
                    output_tensor.ndim()
                ))
            })?;

        log::debug!(
            "📊 Inference complete: {:.2}ms, output shape {:?}",
            inference_start.elapsed().as_secs_f64() * 1000.0,
            result.dim()
        );
        Ok(result)
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 1, self.input_size, self.input_size)
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        self.model_manager()?.get_info()
    }

    fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// A panic mid-run leaves nothing half-updated in the session, so a
/// poisoned lock is still usable
fn lock_session<T>(session: &Mutex<T>) -> MutexGuard<'_, T> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
