//! End-to-end properties of the colorization pipeline
//!
//! Runs the real pre- and post-processing around a scripted network.

mod common;

use colorit::{colorize, colorize_bytes, ColorizeError, LabImage, OutputFormat};
use common::{gray, pattern, state, Output};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

#[test]
fn test_output_matches_input_dimensions() {
    let state = state(Output::LightnessDependent);

    for (width, height) in [(64, 64), (1, 1), (1, 97), (300, 7), (33, 224), (225, 225)] {
        let result = colorize(&state, &pattern(width, height)).unwrap();
        assert_eq!(result.image.dimensions(), (width, height));
        assert_eq!(result.original_dimensions, (width, height));
        assert_eq!(DynamicImage::ImageRgb8(result.image).color().channel_count(), 3);
    }
}

#[test]
fn test_non_rgb_inputs_are_accepted() {
    let state = state(Output::Chroma { a: 5.0, b: 5.0 });

    let luma = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(10, 6, image::Luma([77])));
    let rgba = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(4, 9, image::Rgba([1, 2, 3, 0])));
    let wide = DynamicImage::ImageRgb16(image::ImageBuffer::from_pixel(5, 5, Rgb([40_000u16; 3])));

    for input in [luma, rgba, wide] {
        let result = colorize(&state, &input).unwrap();
        assert_eq!(result.image.dimensions(), input.dimensions());
    }
}

#[test]
fn test_lightness_is_preserved() {
    let state = state(Output::Chroma { a: 6.0, b: -4.0 });
    let input = pattern(48, 40).to_rgb8();
    let original = LabImage::from_rgb(&input);

    let result = colorize(&state, &DynamicImage::ImageRgb8(input)).unwrap();
    let recovered = LabImage::from_rgb(&result.image);

    let worst = original
        .lightness()
        .iter()
        .zip(recovered.lightness().iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0_f32, f32::max);
    // Quantization to 8 bits and small out-of-gamut clips at saturated pixels
    assert!(worst < 3.0, "lightness drifted by {worst}");
}

#[test]
fn test_mid_gray_scenario() {
    let state = state(Output::Chroma { a: 0.0, b: 0.0 });
    let input = gray(64, 64, 128);
    let input_l = LabImage::from_rgb(&input.to_rgb8()).lightness()[[0, 0]];

    let result = colorize(&state, &input).unwrap();
    assert_eq!(result.image.dimensions(), (64, 64));

    let output_lab = LabImage::from_rgb(&result.image);
    for l in output_lab.lightness() {
        assert!((l - input_l).abs() < 0.5, "L {l} vs {input_l}");
    }
    for pixel in result.image.pixels() {
        assert!(pixel.0.iter().all(|&c| (i16::from(c) - 128).abs() <= 1));
    }
}

#[test]
fn test_single_pixel_scenario() {
    let state = state(Output::Scores { bins: 4, hot_bin: 1 });
    let result = colorize(&state, &gray(1, 1, 200)).unwrap();
    assert_eq!(result.image.dimensions(), (1, 1));
}

#[test]
fn test_garbage_bytes_scenario() {
    let state = state(Output::Chroma { a: 0.0, b: 0.0 });

    for bytes in [&b""[..], &b"\x89PNG\r\n\x1a\nbroken"[..], &[0u8; 512][..]] {
        let err = colorize_bytes(&state, bytes).unwrap_err();
        assert!(matches!(err, ColorizeError::Decode(_)), "got {err:?}");
    }

    // The state still works after failed calls
    assert!(colorize(&state, &gray(3, 3, 50)).is_ok());
}

#[test]
fn test_png_and_jpeg_saves_scenario() {
    let state = state(Output::LightnessDependent);
    let result = colorize(&state, &pattern(40, 30)).unwrap();
    let dir = tempfile::tempdir().unwrap();

    let png = dir.path().join("colorized.png");
    let jpg = dir.path().join("colorized.jpg");
    result.save(&png).unwrap();
    result.save(&jpg).unwrap();

    let png_back = image::open(&png).unwrap().to_rgb8();
    let jpg_back = image::open(&jpg).unwrap().to_rgb8();
    assert_eq!(png_back, result.image);
    assert_eq!(jpg_back.dimensions(), result.image.dimensions());

    let mean_error = jpg_back
        .as_raw()
        .iter()
        .zip(result.image.as_raw())
        .map(|(a, b)| f64::from(a.abs_diff(*b)))
        .sum::<f64>()
        / jpg_back.as_raw().len() as f64;
    assert!(mean_error < 8.0, "JPEG deviates by {mean_error} on average");

    let bytes = result.to_bytes(OutputFormat::Png, 95).unwrap();
    assert_eq!(image::load_from_memory(&bytes).unwrap().to_rgb8(), result.image);
}

#[test]
fn test_extreme_chroma_is_clipped() {
    let state = state(Output::Chroma { a: 500.0, b: -500.0 });

    for input in [gray(16, 16, 0), gray(16, 16, 255), pattern(20, 20)] {
        let result = colorize(&state, &input).unwrap();
        assert_eq!(result.image.dimensions(), input.dimensions());
        // Huge +a, -b drives red and blue to their limits without wrapping to 0
        let pixel = result.image.get_pixel(8, 8);
        assert!(pixel[0] >= pixel[1], "unexpected {pixel:?}");
    }
}

#[test]
fn test_strong_chroma_does_not_depend_on_image_size() {
    let state = state(Output::Chroma { a: 0.0, b: 180.0 });

    // 32x32 matches the network size, so chroma skips resampling
    let native = colorize(&state, &gray(32, 32, 160)).unwrap();
    let resized = colorize(&state, &gray(33, 32, 160)).unwrap();
    assert_eq!(native.image.get_pixel(5, 5), resized.image.get_pixel(5, 5));
}

#[test]
fn test_very_wide_image_is_colorized() {
    let state = state(Output::Chroma { a: 10.0, b: 10.0 });
    let result = colorize(&state, &gray(16_385, 1, 128)).unwrap();
    assert_eq!(result.image.dimensions(), (16_385, 1));
}

#[test]
fn test_non_finite_chroma_does_not_leak() {
    let state = state(Output::Chroma { a: f32::NAN, b: f32::INFINITY });
    let result = colorize(&state, &gray(8, 8, 100)).unwrap();
    assert_eq!(result.image.dimensions(), (8, 8));
}

#[test]
fn test_colorize_is_deterministic() {
    let state = state(Output::LightnessDependent);
    let input = pattern(57, 31);

    let first = colorize(&state, &input).unwrap();
    let second = colorize(&state, &input).unwrap();
    assert_eq!(first.image, second.image);
}

#[test]
fn test_input_image_is_not_modified() {
    let state = state(Output::LightnessDependent);
    let input = pattern(12, 12);
    let before: RgbImage = input.to_rgb8();

    colorize(&state, &input).unwrap();
    assert_eq!(input.to_rgb8(), before);
}

#[test]
fn test_score_output_uses_lookup_table() {
    let warm = state(Output::Scores { bins: 4, hot_bin: 0 });
    let cool = state(Output::Scores { bins: 4, hot_bin: 3 });
    let input = gray(16, 16, 128);

    let warm_pixel = *colorize(&warm, &input).unwrap().image.get_pixel(8, 8);
    let cool_pixel = *colorize(&cool, &input).unwrap().image.get_pixel(8, 8);

    // (+20, +20) is yellow-red, (-20, -20) is cyan-blue
    assert!(warm_pixel[0] > cool_pixel[0]);
    assert!(warm_pixel[2] < cool_pixel[2]);
}

#[test]
fn test_result_metadata() {
    let state = state(Output::Scores { bins: 4, hot_bin: 2 });
    let result = colorize(&state, &gray(20, 10, 90)).unwrap();

    assert_eq!(result.metadata.backend, "scripted");
    assert_eq!(result.metadata.model_name, "scripted");
    assert_eq!(result.metadata.network_output_shape, (1, 4, 8, 8));
    assert!(result.timings().total_ms >= result.timings().inference_ms);
    assert!(result.input_path.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_worker_matches_direct_call() {
    let state = std::sync::Arc::new(state(Output::LightnessDependent));
    let worker = colorit::ColorizeWorker::new(state.clone(), 2).unwrap();
    let input = pattern(30, 18);

    let direct = colorize(&state, &input).unwrap();
    let handles: Vec<_> = (0..4).map(|_| worker.submit(input.clone())).collect();

    for joined in futures::future::join_all(handles).await {
        let result = joined.unwrap().unwrap();
        assert_eq!(result.image, direct.image);
    }
}
