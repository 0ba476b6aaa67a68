//! Shared utilities: model input construction, provider parsing, validation

pub mod preprocessing;
pub mod providers;
pub mod validation;

pub use preprocessing::LabPreprocessor;
pub use providers::{ExecutionProviderManager, ProviderInfo};
pub use validation::TensorValidator;
