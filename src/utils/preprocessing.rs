//! Model input construction
//!
//! The network sees only lightness: the L plane of the image resized to the
//! working resolution, mean-centred by subtracting a fixed offset.

use crate::{colorspace::LabImage, error::Result, utils::TensorValidator};
use ndarray::{Array4, Axis};

/// Builds `(1, 1, S, S)` lightness tensors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabPreprocessor {
    input_size: u32,
    lightness_offset: f32,
}

impl LabPreprocessor {
    #[must_use]
    pub fn new(input_size: u32, lightness_offset: f32) -> Self {
        Self {
            input_size,
            lightness_offset,
        }
    }

    /// Build the model input from a full-resolution L\*a\*b\* image
    ///
    /// The whole image is resized (aspect ratio is not preserved) and only
    /// its L plane is kept. The input image is left untouched.
    pub fn to_tensor(&self, lab: &LabImage) -> Result<Array4<f32>> {
        let size = self.input_size as usize;
        let resized = lab.resize(self.input_size, self.input_size);

        let offset = self.lightness_offset;
        let tensor = resized
            .lightness()
            .mapv(|l| l - offset)
            .insert_axis(Axis(0))
            .insert_axis(Axis(0));

        TensorValidator::validate_tensor_shape(&tensor, (1, 1, size, size))?;
        Ok(tensor)
    }

    #[must_use]
    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    #[must_use]
    pub fn lightness_offset(&self) -> f32 {
        self.lightness_offset
    }
}
