//! Core types for colorization results

use crate::{
    config::{OutputFormat, DEFAULT_JPEG_QUALITY},
    error::Result,
    services::{ImageIOService, OutputFormatHandler},
};
use chrono::{DateTime, Utc};
use image::RgbImage;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result of a colorization operation
///
/// Owned by the caller; saving it never modifies it, so a failed save can be
/// retried with another path or format.
#[derive(Debug, Clone)]
pub struct ColorizationResult {
    /// Colorized image at the input's resolution
    pub image: RgbImage,

    /// Original image dimensions
    pub original_dimensions: (u32, u32),

    /// Processing metadata
    pub metadata: ProcessingMetadata,

    /// Original input path (for logging and default output naming)
    pub input_path: Option<String>,
}

impl ColorizationResult {
    #[must_use]
    pub fn new(image: RgbImage, original_dimensions: (u32, u32), metadata: ProcessingMetadata) -> Self {
        Self {
            image,
            original_dimensions,
            metadata,
            input_path: None,
        }
    }

    /// Attach the path the image was read from
    #[must_use]
    pub fn with_input_path<S: Into<String>>(mut self, input_path: S) -> Self {
        self.input_path = Some(input_path.into());
        self
    }

    /// Save with the format implied by the path's extension
    ///
    /// # Errors
    /// - `Encode` when the extension is not `.png`, `.jpg` or `.jpeg`, or writing fails
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let format = OutputFormatHandler::from_path(path.as_ref())?;
        self.save_with_format(path, format, DEFAULT_JPEG_QUALITY)
    }

    /// Save in an explicit format
    pub fn save_with_format<P: AsRef<Path>>(
        &self,
        path: P,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()> {
        let path = path.as_ref();
        let encode_start = instant::Instant::now();
        ImageIOService::save_image(&self.image, path, format, quality)?;

        info!(
            "Processed: {} -> {} in {:.2}s (encode {}ms)",
            self.input_path.as_deref().unwrap_or("input"),
            path.display(),
            self.metadata.timings.total_ms as f64 / 1000.0,
            encode_start.elapsed().as_millis()
        );
        Ok(())
    }

    /// Encode to bytes in the specified format
    pub fn to_bytes(&self, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        ImageIOService::encode(&self.image, format, quality)
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    #[must_use]
    pub fn timings(&self) -> &ProcessingTimings {
        &self.metadata.timings
    }

    /// Get timing summary for display
    #[must_use]
    pub fn timing_summary(&self) -> String {
        let t = &self.metadata.timings;
        let mut summary = format!(
            "Total: {}ms | Decode: {}ms | Preprocess: {}ms | Inference: {}ms ({:.1}%) | Postprocess: {}ms",
            t.total_ms,
            t.image_decode_ms,
            t.preprocessing_ms,
            t.inference_ms,
            t.inference_ratio() * 100.0,
            t.postprocessing_ms
        );

        let other_ms = t.other_overhead_ms();
        if other_ms > 5 {
            summary.push_str(&format!(" | Other: {other_ms}ms"));
        }
        summary
    }
}

/// Per-stage timings of one pipeline run, in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Image loading and decoding (zero for in-memory images)
    pub image_decode_ms: u64,

    /// Colour conversion, resize and tensor construction
    pub preprocessing_ms: u64,

    /// Forward pass
    pub inference_ms: u64,

    /// Chroma decoding, upsampling and conversion back to RGB
    pub postprocessing_ms: u64,

    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of the total spent in the forward pass
    #[must_use]
    pub fn inference_ratio(&self) -> f64 {
        if self.total_ms == 0 {
            0.0
        } else {
            self.inference_ms as f64 / self.total_ms as f64
        }
    }

    /// Time not attributed to any stage
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        let measured = self.image_decode_ms
            + self.preprocessing_ms
            + self.inference_ms
            + self.postprocessing_ms;
        self.total_ms.saturating_sub(measured)
    }
}

/// Describes how a result was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// Detailed timing breakdown
    pub timings: ProcessingTimings,

    /// Model used for inference
    pub model_name: String,

    /// Inference engine name
    pub backend: String,

    /// Shape of the raw network output (NCHW)
    pub network_output_shape: (usize, usize, usize, usize),

    /// When processing finished
    pub timestamp: DateTime<Utc>,
}

impl ProcessingMetadata {
    #[must_use]
    pub fn new<M: Into<String>, B: Into<String>>(model_name: M, backend: B) -> Self {
        Self {
            timings: ProcessingTimings::new(),
            model_name: model_name.into(),
            backend: backend.into(),
            network_output_shape: (0, 0, 0, 0),
            timestamp: Utc::now(),
        }
    }
}
