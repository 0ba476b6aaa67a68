//! Validation helpers shared by the pipeline and backends

pub mod tensor;

pub use tensor::TensorValidator;
