//! Test utilities and mock backends for testing inference functionality
//!
//! These implement `InferenceBackend` deterministically so the pipeline can
//! be exercised without network files, ONNX Runtime or Tract.

use crate::{
    config::ColorizerConfig,
    error::{ColorizeError, Result},
    inference::InferenceBackend,
    models::ModelInfo,
};
use instant::Duration;
use ndarray::Array4;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn mock_info(name: &str, input_size: usize, lut_bins: usize) -> ModelInfo {
    ModelInfo {
        name: name.to_string(),
        size_bytes: 1024,
        input_shape: (1, 1, input_size, input_size),
        lut_bins,
    }
}

fn check_input(input: &Array4<f32>, input_size: usize) -> Result<()> {
    let expected = (1, 1, input_size, input_size);
    if input.dim() == expected {
        Ok(())
    } else {
        Err(ColorizeError::inference(format!(
            "Mock backend expected {:?}, got {:?}",
            expected,
            input.dim()
        )))
    }
}

/// Emits an already decoded `(1, 2, S, S)` tensor filled with one ab value
#[derive(Debug, Clone)]
pub struct ConstantChromaBackend {
    input_size: usize,
    a: f32,
    b: f32,
    initialized: bool,
    calls: Arc<AtomicUsize>,
}

impl ConstantChromaBackend {
    #[must_use]
    pub fn new(input_size: usize, a: f32, b: f32) -> Self {
        Self {
            input_size,
            a,
            b,
            initialized: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Same backend, already initialized
    #[must_use]
    pub fn ready(input_size: usize, a: f32, b: f32) -> Self {
        let mut backend = Self::new(input_size, a, b);
        backend.initialized = true;
        backend
    }

    /// Shared counter of forward passes
    #[must_use]
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl InferenceBackend for ConstantChromaBackend {
    fn initialize(&mut self, _config: &ColorizerConfig) -> Result<Option<Duration>> {
        if self.initialized {
            return Ok(None);
        }
        self.initialized = true;
        Ok(Some(Duration::from_millis(1)))
    }

    fn infer(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(ColorizeError::inference("Mock backend not initialized"));
        }
        check_input(input, self.input_size)?;
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut output = Array4::<f32>::zeros((1, 2, self.input_size, self.input_size));
        output.slice_mut(ndarray::s![0, 0, .., ..]).fill(self.a);
        output.slice_mut(ndarray::s![0, 1, .., ..]).fill(self.b);
        Ok(output)
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 1, self.input_size, self.input_size)
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        Ok(mock_info("mock-constant-chroma", self.input_size, 2))
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Emits per-bin class scores at a reduced resolution, like the reference network
///
/// Every location strongly favours `hot_bin`.
#[derive(Debug, Clone)]
pub struct ClassScoreBackend {
    input_size: usize,
    output_size: usize,
    bins: usize,
    hot_bin: usize,
}

impl ClassScoreBackend {
    #[must_use]
    pub fn new(input_size: usize, output_size: usize, bins: usize, hot_bin: usize) -> Self {
        Self {
            input_size,
            output_size,
            bins,
            hot_bin,
        }
    }
}

impl InferenceBackend for ClassScoreBackend {
    fn initialize(&mut self, _config: &ColorizerConfig) -> Result<Option<Duration>> {
        Ok(None)
    }

    fn infer(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        check_input(input, self.input_size)?;
        let hot_bin = self.hot_bin;
        Ok(Array4::from_shape_fn(
            (1, self.bins, self.output_size, self.output_size),
            |(_, bin, _, _)| if bin == hot_bin { 20.0 } else { 0.0 },
        ))
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 1, self.input_size, self.input_size)
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        Ok(mock_info("mock-class-scores", self.input_size, self.bins))
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Fails every forward pass with an inference error
#[derive(Debug, Clone)]
pub struct FailingBackend {
    input_size: usize,
}

impl FailingBackend {
    #[must_use]
    pub fn new(input_size: usize) -> Self {
        Self { input_size }
    }
}

impl InferenceBackend for FailingBackend {
    fn initialize(&mut self, _config: &ColorizerConfig) -> Result<Option<Duration>> {
        Ok(None)
    }

    fn infer(&self, _input: &Array4<f32>) -> Result<Array4<f32>> {
        Err(ColorizeError::inference_error_with_backend(
            "mock",
            "Forward pass",
            "simulated failure",
        ))
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 1, self.input_size, self.input_size)
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        Ok(mock_info("mock-failing", self.input_size, 2))
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Sleeps during each forward pass and records the peak number of overlapping calls
#[derive(Debug, Clone)]
pub struct SlowBackend {
    input_size: usize,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    panic_on_infer: bool,
}

impl SlowBackend {
    #[must_use]
    pub fn new(input_size: usize, delay: Duration) -> Self {
        Self {
            input_size,
            delay,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            panic_on_infer: false,
        }
    }

    /// A backend whose forward pass panics
    #[must_use]
    pub fn panicking(input_size: usize) -> Self {
        let mut backend = Self::new(input_size, Duration::from_millis(0));
        backend.panic_on_infer = true;
        backend
    }

    /// Shared peak-concurrency counter
    #[must_use]
    pub fn peak(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.peak)
    }
}

impl InferenceBackend for SlowBackend {
    fn initialize(&mut self, _config: &ColorizerConfig) -> Result<Option<Duration>> {
        Ok(None)
    }

    fn infer(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if self.panic_on_infer {
            panic!("simulated backend panic");
        }
        check_input(input, self.input_size)?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(Array4::zeros((1, 2, self.input_size, self.input_size)))
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 1, self.input_size, self.input_size)
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        Ok(mock_info("mock-slow", self.input_size, 2))
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_backend_counts_calls() {
        let backend = ConstantChromaBackend::ready(16, 3.0, -4.0);
        let counter = backend.call_counter();

        let output = backend.infer(&Array4::zeros((1, 1, 16, 16))).unwrap();
        assert_eq!(output[[0, 0, 5, 5]], 3.0);
        assert_eq!(output[[0, 1, 15, 0]], -4.0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mock_backends_check_input_shape() {
        let backend = ConstantChromaBackend::ready(16, 0.0, 0.0);
        assert!(backend.infer(&Array4::zeros((1, 3, 16, 16))).is_err());

        let scores = ClassScoreBackend::new(16, 4, 313, 7);
        let output = scores.infer(&Array4::zeros((1, 1, 16, 16))).unwrap();
        assert_eq!(output.dim(), (1, 313, 4, 4));
        assert_eq!(output[[0, 7, 1, 1]], 20.0);
    }

    #[test]
    fn test_failing_backend_reports_inference_error() {
        let backend = FailingBackend::new(8);
        let err = backend.infer(&Array4::zeros((1, 1, 8, 8))).unwrap_err();
        assert!(matches!(err, ColorizeError::Inference(_)));
        assert!(!err.is_fatal());
    }
}
