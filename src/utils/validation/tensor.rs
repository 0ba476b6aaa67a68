//! Tensor and image dimension validation

use crate::error::{ColorizeError, Result};
use ndarray::Array4;

/// Validator for tensor shapes and image dimensions
pub struct TensorValidator;

impl TensorValidator {
    /// Validate tensor shape matches expected dimensions
    pub fn validate_tensor_shape(
        tensor: &Array4<f32>,
        expected_shape: (usize, usize, usize, usize),
    ) -> Result<()> {
        let actual = tensor.dim();
        if actual != expected_shape {
            return Err(ColorizeError::internal(format!(
                "Tensor shape mismatch. Expected {:?}, got {:?}",
                expected_shape, actual
            )));
        }
        Ok(())
    }

    /// Validate that an image can go through the pipeline
    ///
    /// # Errors
    /// - `InvalidInput` for a zero dimension
    pub fn validate_image_dimensions(width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(ColorizeError::invalid_input(format!(
                "Image has no pixels: {}x{}",
                width, height
            )));
        }

        Ok(())
    }

    /// Count non-finite values in a network output
    #[must_use]
    pub fn count_non_finite(tensor: &Array4<f32>) -> usize {
        tensor.iter().filter(|v| !v.is_finite()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tensor_shape() {
        let tensor = Array4::<f32>::zeros((1, 1, 224, 224));
        assert!(TensorValidator::validate_tensor_shape(&tensor, (1, 1, 224, 224)).is_ok());
        assert!(TensorValidator::validate_tensor_shape(&tensor, (1, 3, 224, 224)).is_err());
    }

    #[test]
    fn test_validate_image_dimensions() {
        assert!(TensorValidator::validate_image_dimensions(1, 1).is_ok());
        assert!(TensorValidator::validate_image_dimensions(4000, 3000).is_ok());

        let err = TensorValidator::validate_image_dimensions(0, 10).unwrap_err();
        assert!(matches!(err, ColorizeError::InvalidInput(_)));
        assert!(TensorValidator::validate_image_dimensions(20000, 10).is_ok());
        assert!(TensorValidator::validate_image_dimensions(u32::MAX, 1).is_ok());
    }

    #[test]
    fn test_count_non_finite() {
        let mut tensor = Array4::<f32>::zeros((1, 2, 2, 2));
        tensor[[0, 0, 0, 0]] = f32::NAN;
        tensor[[0, 1, 1, 1]] = f32::NEG_INFINITY;
        assert_eq!(TensorValidator::count_non_finite(&tensor), 2);
    }
}
