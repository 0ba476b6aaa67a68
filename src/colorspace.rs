//! sRGB and CIE L\*a\*b\* conversion for the colorization pipeline
//!
//! Images are held planar, as a `(3, height, width)` array of L, a and b.
//! Conversions use the D65 white point and the sRGB transfer curve.

use crate::error::{ColorizeError, Result};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, Rgb, RgbImage};
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Axis};
use palette::white_point::D65;
use palette::{IntoColor, Lab, LinSrgb, Srgb};

type LabD65 = Lab<D65, f32>;

/// Planar L\*a\*b\* image
#[derive(Debug, Clone, PartialEq)]
pub struct LabImage {
    data: Array3<f32>,
}

impl LabImage {
    /// Convert an 8-bit sRGB image
    #[must_use]
    #[allow(clippy::indexing_slicing)]
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let mut data = Array3::<f32>::zeros((3, height as usize, width as usize));

        for (x, y, pixel) in image.enumerate_pixels() {
            let lab = rgb8_to_lab(*pixel);
            let (y, x) = (y as usize, x as usize);
            data[[0, y, x]] = lab.l;
            data[[1, y, x]] = lab.a;
            data[[2, y, x]] = lab.b;
        }

        Self { data }
    }

    /// Pair a lightness plane with a `(2, h, w)` chroma array of the same size
    pub fn from_planes(lightness: Array2<f32>, chroma: Array3<f32>) -> Result<Self> {
        let (ab_channels, ab_height, ab_width) = chroma.dim();
        if ab_channels != 2 {
            return Err(ColorizeError::internal(format!(
                "Chroma must have 2 channels, got {}",
                ab_channels
            )));
        }
        if lightness.dim() != (ab_height, ab_width) {
            return Err(ColorizeError::internal(format!(
                "Lightness is {}x{} but chroma is {}x{}",
                lightness.ncols(),
                lightness.nrows(),
                ab_width,
                ab_height
            )));
        }

        let (height, width) = lightness.dim();
        let mut data = Array3::<f32>::zeros((3, height, width));
        data.index_axis_mut(Axis(0), 0).assign(&lightness);
        data.slice_mut(s![1..3, .., ..]).assign(&chroma);
        Ok(Self { data })
    }

    /// Convert back to 8-bit sRGB
    ///
    /// Out-of-gamut channels are clipped to `[0, 1]` and non-finite values
    /// become 0 before scaling and rounding to `u8`.
    #[must_use]
    #[allow(clippy::indexing_slicing)]
    pub fn to_rgb(&self) -> RgbImage {
        let (_, height, width) = self.data.dim();
        RgbImage::from_fn(width as u32, height as u32, |x, y| {
            let (y, x) = (y as usize, x as usize);
            let lab = LabD65::new(
                self.data[[0, y, x]],
                self.data[[1, y, x]],
                self.data[[2, y, x]],
            );
            lab_to_rgb8(lab)
        })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.data.dim().2 as u32
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.data.dim().1 as u32
    }

    /// L plane, `(height, width)`
    #[must_use]
    pub fn lightness(&self) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), 0)
    }

    /// a and b planes, `(2, height, width)`
    #[must_use]
    pub fn chroma(&self) -> ArrayView3<'_, f32> {
        self.data.slice(s![1..3, .., ..])
    }

    /// Resample all three planes to `width` x `height`
    #[must_use]
    pub fn resize(&self, width: u32, height: u32) -> Self {
        let mut data = Array3::<f32>::zeros((3, height as usize, width as usize));
        data.index_axis_mut(Axis(0), 0)
            .assign(&resize_plane(self.lightness(), width, height));
        data.slice_mut(s![1..3, .., ..])
            .assign(&resize_chroma(self.chroma(), width, height));
        Self { data }
    }
}

/// Resample a `(2, h, w)` chroma array to `width` x `height`
#[must_use]
pub fn resize_chroma(chroma: ArrayView3<'_, f32>, width: u32, height: u32) -> Array3<f32> {
    let mut out = Array3::<f32>::zeros((2, height as usize, width as usize));
    for (channel, mut target) in out.outer_iter_mut().enumerate() {
        target.assign(&resize_plane(chroma.index_axis(Axis(0), channel), width, height));
    }
    out
}

/// Maps a plane's finite values onto `[0, 1]`, where image's float
/// resampling works without clamping
#[derive(Debug, Clone, Copy)]
struct PlaneRange {
    low: f32,
    span: f32,
}

impl PlaneRange {
    fn of(plane: ArrayView2<'_, f32>) -> Self {
        let (low, high) = plane
            .iter()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        if low > high {
            return Self { low: 0.0, span: 1.0 };
        }
        let span = high - low;
        Self {
            low,
            span: if span > 0.0 { span } else { 1.0 },
        }
    }

    // Infinities land on the plane's finite extremes
    fn forward(self, value: f32) -> f32 {
        ((value - self.low) / self.span).clamp(0.0, 1.0)
    }

    fn inverse(self, value: f32) -> f32 {
        value * self.span + self.low
    }
}

#[allow(clippy::indexing_slicing)]
fn resize_plane(plane: ArrayView2<'_, f32>, width: u32, height: u32) -> Array2<f32> {
    let (src_height, src_width) = plane.dim();
    if (src_width as u32, src_height as u32) == (width, height) {
        return plane.to_owned();
    }

    let range = PlaneRange::of(plane);
    let buffer = ImageBuffer::<Luma<f32>, Vec<f32>>::from_fn(
        src_width as u32,
        src_height as u32,
        |x, y| Luma([range.forward(plane[[y as usize, x as usize]])]),
    );
    let resized = imageops::resize(&buffer, width, height, FilterType::Triangle);

    Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        range.inverse(resized.get_pixel(x as u32, y as u32)[0])
    })
}

fn rgb8_to_lab(pixel: Rgb<u8>) -> LabD65 {
    let srgb = Srgb::new(pixel[0], pixel[1], pixel[2]).into_format::<f32>();
    let linear: LinSrgb<f32> = srgb.into_linear();
    linear.into_color()
}

fn lab_to_rgb8(lab: LabD65) -> Rgb<u8> {
    let linear: LinSrgb<f32> = lab.into_color();
    let srgb: Srgb<f32> = Srgb::from_linear(linear);
    Rgb([
        quantize(srgb.red),
        quantize(srgb.green),
        quantize(srgb.blue),
    ])
}

fn quantize(value: f32) -> u8 {
    let clipped = if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (clipped * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                ((x + y) * 37 % 256) as u8,
            ])
        })
    }

    #[test]
    fn test_round_trip_within_one_level() {
        let image = gradient(32, 24);
        let restored = LabImage::from_rgb(&image).to_rgb();

        for (a, b) in image.pixels().zip(restored.pixels()) {
            for channel in 0..3 {
                let diff = (i16::from(a[channel]) - i16::from(b[channel])).abs();
                assert!(diff <= 1, "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_reference_values() {
        let white = rgb8_to_lab(Rgb([255, 255, 255]));
        assert!((white.l - 100.0).abs() < 0.01);
        assert!(white.a.abs() < 0.01 && white.b.abs() < 0.01);

        let black = rgb8_to_lab(Rgb([0, 0, 0]));
        assert!(black.l.abs() < 0.01);

        let gray = rgb8_to_lab(Rgb([128, 128, 128]));
        assert!(gray.a.abs() < 0.01 && gray.b.abs() < 0.01);
        assert!((gray.l - 53.59).abs() < 0.1);
    }

    #[test]
    fn test_quantize_clips_and_zeroes_non_finite() {
        assert_eq!(quantize(-0.4), 0);
        assert_eq!(quantize(1.7), 255);
        assert_eq!(quantize(f32::NAN), 0);
        assert_eq!(quantize(f32::INFINITY), 0);
        assert_eq!(quantize(0.5), 128);
    }

    #[test]
    fn test_extreme_chroma_stays_in_range() {
        let lightness = Array2::<f32>::from_elem((4, 4), 50.0);
        let chroma = Array3::<f32>::from_shape_fn((2, 4, 4), |(c, y, _)| {
            if c == 0 {
                500.0 - (y as f32) * 300.0
            } else {
                -400.0
            }
        });

        let rgb = LabImage::from_planes(lightness, chroma).unwrap().to_rgb();
        assert_eq!(rgb.dimensions(), (4, 4));
    }

    #[test]
    fn test_from_planes_rejects_mismatch() {
        let lightness = Array2::<f32>::zeros((4, 4));
        assert!(LabImage::from_planes(lightness.clone(), Array3::zeros((2, 4, 5))).is_err());
        assert!(matches!(
            LabImage::from_planes(lightness, Array3::zeros((3, 4, 4))),
            Err(ColorizeError::Internal(_))
        ));
    }

    #[test]
    fn test_resize_shapes_and_constant_planes() {
        let lightness = Array2::<f32>::from_elem((10, 20), 42.0);
        let chroma = Array3::<f32>::from_shape_fn((2, 10, 20), |(c, _, _)| {
            if c == 0 {
                12.5
            } else {
                -30.0
            }
        });
        let lab = LabImage::from_planes(lightness, chroma).unwrap();

        let small = lab.resize(7, 3);
        assert_eq!((small.width(), small.height()), (7, 3));
        assert!(small.lightness().iter().all(|v| (v - 42.0).abs() < 0.01));
        assert!(small
            .chroma()
            .index_axis(Axis(0), 0)
            .iter()
            .all(|v| (v - 12.5).abs() < 0.01));
        assert!(small
            .chroma()
            .index_axis(Axis(0), 1)
            .iter()
            .all(|v| (v + 30.0).abs() < 0.01));
    }

    #[test]
    fn test_resize_degenerate_sizes() {
        let lab = LabImage::from_rgb(&gradient(1, 1));
        let up = lab.resize(224, 224);
        assert_eq!((up.width(), up.height()), (224, 224));

        let down = LabImage::from_rgb(&gradient(50, 30)).resize(1, 1);
        assert_eq!((down.width(), down.height()), (1, 1));
    }

    #[test]
    fn test_resize_chroma_upsamples() {
        let chroma = Array3::<f32>::from_elem((2, 56, 56), 5.0);
        let up = resize_chroma(chroma.view(), 300, 200);
        assert_eq!(up.dim(), (2, 200, 300));
        assert!(up.iter().all(|v| (v - 5.0).abs() < 0.01));
    }

    #[test]
    fn test_resize_keeps_chroma_beyond_nominal_range() {
        let chroma = Array3::<f32>::from_shape_fn((2, 8, 8), |(c, _, x)| {
            if c == 0 {
                180.0
            } else {
                -300.0 + x as f32 * 100.0
            }
        });
        let up = resize_chroma(chroma.view(), 9, 8);

        assert!(up
            .index_axis(Axis(0), 0)
            .iter()
            .all(|v| (v - 180.0).abs() < 0.01));
        let b = up.index_axis(Axis(0), 1);
        assert!(b.iter().any(|&v| v < -250.0));
        assert!(b.iter().any(|&v| v > 350.0));
    }

    #[test]
    fn test_resize_maps_infinities_to_plane_extremes() {
        let mut plane = Array2::<f32>::from_elem((4, 4), 20.0);
        plane[[0, 0]] = -10.0;
        plane[[3, 3]] = f32::INFINITY;
        let resized = resize_plane(plane.view(), 4, 5);
        assert!(resized.iter().all(|v| (-10.01..=20.01).contains(v)));
    }
}
