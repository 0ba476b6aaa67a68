//! Shared helpers for integration tests
//!
//! `ScriptedBackend` stands in for the network so the full pipeline can run
//! without model files.

#![allow(dead_code)]

use colorit::{
    ChromaLut, ColorizeError, ColorizerConfig, InferenceBackend, ModelInfo, ModelState, Result,
};
use image::{DynamicImage, Rgb, RgbImage};
use instant::Duration;
use ndarray::Array4;

pub const INPUT_SIZE: u32 = 32;

/// What the stand-in network emits for every forward pass
#[derive(Debug, Clone, Copy)]
pub enum Output {
    /// Decoded ab at the input resolution
    Chroma { a: f32, b: f32 },
    /// Per-bin scores at a quarter of the input resolution, favouring one bin
    Scores { bins: usize, hot_bin: usize },
    /// Chroma that varies with the input lightness, at half resolution
    LightnessDependent,
}

#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    input_size: usize,
    output: Output,
    initialized: bool,
}

impl ScriptedBackend {
    pub fn new(input_size: u32, output: Output) -> Self {
        Self {
            input_size: input_size as usize,
            output,
            initialized: false,
        }
    }
}

impl InferenceBackend for ScriptedBackend {
    fn initialize(&mut self, _config: &ColorizerConfig) -> Result<Option<Duration>> {
        self.initialized = true;
        Ok(Some(Duration::from_millis(1)))
    }

    fn infer(&self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(ColorizeError::inference("scripted backend not initialized"));
        }
        let size = self.input_size;
        if input.dim() != (1, 1, size, size) {
            return Err(ColorizeError::inference(format!("bad input {:?}", input.dim())));
        }

        Ok(match self.output {
            Output::Chroma { a, b } => {
                Array4::from_shape_fn((1, 2, size, size), |(_, c, _, _)| if c == 0 { a } else { b })
            },
            Output::Scores { bins, hot_bin } => {
                let out = (size / 4).max(1);
                Array4::from_shape_fn((1, bins, out, out), |(_, q, _, _)| {
                    if q == hot_bin {
                        8.0
                    } else {
                        0.0
                    }
                })
            },
            Output::LightnessDependent => {
                let out = (size / 2).max(1);
                Array4::from_shape_fn((1, 2, out, out), |(_, c, y, x)| {
                    let l = input[[0, 0, (y * 2).min(size - 1), (x * 2).min(size - 1)]];
                    if c == 0 {
                        l * 0.8
                    } else {
                        -l * 0.5
                    }
                })
            },
        })
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 1, self.input_size, self.input_size)
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        Ok(ModelInfo {
            name: "scripted".to_string(),
            size_bytes: 0,
            input_shape: self.input_shape(),
            lut_bins: 4,
        })
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Four bins at the corners of a moderate ab square
pub fn small_lut() -> ChromaLut {
    ChromaLut::from_pairs(vec![[20.0, 20.0], [20.0, -20.0], [-20.0, 20.0], [-20.0, -20.0]])
        .unwrap()
}

/// Route `log` output through the test harness; safe to call repeatedly
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn state(output: Output) -> ModelState {
    init_logging();
    let config = ColorizerConfig::builder()
        .input_size(INPUT_SIZE)
        .build()
        .unwrap();
    let mut backend = ScriptedBackend::new(INPUT_SIZE, output);
    backend.initialize(&config).unwrap();
    ModelState::with_backend(Box::new(backend), small_lut(), config).unwrap()
}

pub fn gray(width: u32, height: u32, level: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([level; 3])))
}

/// A deterministic pattern with strong gradients and saturated corners
pub fn pattern(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let r = ((x * 255) / width.max(1)) as u8;
        let g = ((y * 255) / height.max(1)) as u8;
        let b = (((x + y) * 37) % 256) as u8;
        Rgb([r, g, b])
    }))
}
