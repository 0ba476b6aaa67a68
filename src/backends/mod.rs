//! Inference engines behind [`crate::inference::InferenceBackend`]
//!
//! Each engine is compiled in by its cargo feature; [`crate::DefaultBackendFactory`]
//! picks among whichever are present.

#[cfg(feature = "onnx")]
pub mod onnx;
#[cfg(feature = "onnx")]
pub use self::onnx::OnnxBackend;

#[cfg(feature = "tract")]
pub mod tract;
#[cfg(feature = "tract")]
pub use self::tract::TractBackend;

// Scripted backends for pipeline unit tests
#[cfg(test)]
pub mod test_utils;
