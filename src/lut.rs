//! Quantized chrominance lookup table
//!
//! The reference network classifies every output location into one of 313
//! quantized ab bins. The table holds the ab coordinate of each bin and is
//! used to turn the per-bin scores into a single continuous ab value (the
//! "annealed mean": softmax of the scaled scores, then a weighted average of
//! the bin coordinates).

use crate::error::{ColorizeError, Result};
use ndarray::{s, Array2, Array3, Array4, Axis};
use ndarray_npy::{read_npy, ReadNpyError};
use std::path::Path;

type NpyReader = fn(&Path) -> std::result::Result<Array2<f32>, ReadNpyError>;

/// Immutable table of `(a, b)` bin centres
#[derive(Debug, Clone, PartialEq)]
pub struct ChromaLut {
    pairs: Vec<[f32; 2]>,
}

impl ChromaLut {
    /// Build a table from `(a, b)` pairs
    pub fn from_pairs(pairs: Vec<[f32; 2]>) -> Result<Self> {
        if pairs.is_empty() {
            return Err(ColorizeError::initialization("Lookup table is empty"));
        }
        if let Some(index) = pairs
            .iter()
            .position(|pair| !pair[0].is_finite() || !pair[1].is_finite())
        {
            return Err(ColorizeError::initialization(format!(
                "Lookup table entry {} is not finite",
                index
            )));
        }
        Ok(Self { pairs })
    }

    /// Load a table from `.npy` or `.json`, requiring exactly `expected_bins` entries
    ///
    /// `.npy` arrays may be float32, float64, int32 or int64, shaped either
    /// `(bins, 2)` or `(2, bins)`. `.json` files hold an array of `[a, b]`
    /// pairs.
    pub fn from_file<P: AsRef<Path>>(path: P, expected_bins: usize) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let pairs = match extension.as_str() {
            "npy" => Self::pairs_from_table(&Self::read_npy_table(path)?, expected_bins)?,
            "json" => Self::read_json_pairs(path)?,
            other => {
                return Err(ColorizeError::initialization(format!(
                    "Unsupported lookup table format '{}' for '{}'. Expected .npy or .json",
                    other,
                    path.display()
                )));
            },
        };

        if pairs.len() != expected_bins {
            return Err(ColorizeError::initialization(format!(
                "Lookup table '{}' has {} entries, expected {}",
                path.display(),
                pairs.len(),
                expected_bins
            )));
        }

        log::debug!(
            "Loaded {} chrominance bins from {}",
            pairs.len(),
            path.display()
        );
        Self::from_pairs(pairs)
    }

    fn read_npy_table(path: &Path) -> Result<Array2<f32>> {
        let readers: [NpyReader; 4] = [
            |p| read_npy::<_, Array2<f32>>(p),
            |p| read_npy::<_, Array2<f64>>(p).map(|t| t.mapv(|v| v as f32)),
            |p| read_npy::<_, Array2<i64>>(p).map(|t| t.mapv(|v| v as f32)),
            |p| read_npy::<_, Array2<i32>>(p).map(|t| t.mapv(|v| v as f32)),
        ];

        // Only a dtype mismatch moves on to the next reader
        let mut descriptor = None;
        for read in readers {
            match read(path) {
                Err(ReadNpyError::WrongDescriptor(descr)) => descriptor = Some(descr),
                Ok(table) => return Ok(table),
                Err(e) => {
                    return Err(ColorizeError::initialization(format!(
                        "Failed to read lookup table '{}': {}",
                        path.display(),
                        e
                    )))
                },
            }
        }

        Err(ColorizeError::initialization(format!(
            "Failed to read lookup table '{}': unsupported element type {}; expected float32, float64, int32 or int64",
            path.display(),
            descriptor.map(|d| d.to_string()).unwrap_or_default()
        )))
    }

    fn pairs_from_table(table: &Array2<f32>, expected_bins: usize) -> Result<Vec<[f32; 2]>> {
        let (rows, cols) = table.dim();
        let oriented = if cols == 2 {
            table.view()
        } else if rows == 2 {
            table.t()
        } else {
            return Err(ColorizeError::initialization(format!(
                "Lookup table must be shaped ({expected_bins}, 2) or (2, {expected_bins}), got ({rows}, {cols})"
            )));
        };

        Ok(oriented
            .rows()
            .into_iter()
            .map(|row| [row[0], row[1]])
            .collect())
    }

    fn read_json_pairs(path: &Path) -> Result<Vec<[f32; 2]>> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ColorizeError::initialization(format!(
                "Failed to read lookup table '{}': {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ColorizeError::initialization(format!(
                "Failed to parse lookup table '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Number of bins
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn pairs(&self) -> &[[f32; 2]] {
        &self.pairs
    }

    /// Convert network output into a `(2, h, w)` ab array
    ///
    /// Accepts either per-bin scores `(1, bins, h, w)`, decoded here with the
    /// annealed mean, or an already decoded `(1, 2, h, w)` ab tensor, which
    /// is passed through.
    pub fn decode(&self, output: &Array4<f32>, annealing_scale: f32) -> Result<Array3<f32>> {
        let (batch, channels, height, width) = output.dim();
        if batch != 1 {
            return Err(ColorizeError::inference(format!(
                "Expected batch size 1 in network output, got {}",
                batch
            )));
        }
        if height == 0 || width == 0 {
            return Err(ColorizeError::inference(format!(
                "Network output has empty spatial size {}x{}",
                width, height
            )));
        }

        let scores = output.index_axis(Axis(0), 0);
        if channels == self.len() {
            self.annealed_mean(&scores.to_owned(), annealing_scale)
        } else if channels == 2 {
            log::debug!("Network output is already decoded ab, skipping lookup table");
            Ok(scores.to_owned())
        } else {
            Err(ColorizeError::inference(format!(
                "Unexpected network output with {} channels: expected {} class scores or 2 ab channels",
                channels,
                self.len()
            )))
        }
    }

    #[allow(clippy::indexing_slicing)]
    // Safe: ab is allocated with the spatial size of scores
    fn annealed_mean(&self, scores: &Array3<f32>, annealing_scale: f32) -> Result<Array3<f32>> {
        let (_, height, width) = scores.dim();
        let mut ab = Array3::<f32>::zeros((2, height, width));
        let mut weights = vec![0.0_f32; self.len()];

        for y in 0..height {
            for x in 0..width {
                let column = scores.slice(s![.., y, x]);
                let max = column.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
                if !max.is_finite() {
                    return Err(ColorizeError::inference(format!(
                        "Non-finite class scores at ({}, {})",
                        x, y
                    )));
                }

                let mut total = 0.0_f32;
                for (weight, &score) in weights.iter_mut().zip(column.iter()) {
                    *weight = ((score - max) * annealing_scale).exp();
                    total += *weight;
                }

                let (mut a, mut b) = (0.0_f32, 0.0_f32);
                for (weight, pair) in weights.iter().zip(&self.pairs) {
                    a += weight * pair[0];
                    b += weight * pair[1];
                }

                ab[[0, y, x]] = a / total;
                ab[[1, y, x]] = b / total;
            }
        }

        Ok(ab)
    }
}
