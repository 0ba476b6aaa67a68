//! Image I/O operations service
//!
//! Keeps decoding and encoding out of the pipeline so it stays a pure
//! function of pixels.

use crate::{
    config::OutputFormat,
    error::{ColorizeError, Result},
    services::OutputFormatHandler,
};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path
    ///
    /// Tries extension-based format detection first, then content sniffing.
    ///
    /// # Errors
    /// - `Io` when the file does not exist or cannot be read
    /// - `Decode` when neither detection method can decode it
    ///
    /// # Examples
    /// ```rust,no_run
    /// use colorit::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("old_photo.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(ColorizeError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref).map_err(|io_err| {
                    ColorizeError::file_io_error("read image data", path_ref, &io_err)
                })?;

                image::load_from_memory(&data).map_err(|content_err| {
                    ColorizeError::decode(format!(
                        "Failed to decode '{}' ({} bytes): {}; content detection: {}",
                        path_ref.display(),
                        data.len(),
                        e,
                        content_err
                    ))
                })
            },
        }
    }

    /// Decode an image from bytes
    ///
    /// # Errors
    /// - `Decode` when the bytes are not a supported raster format
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(bytes).map_err(|e| {
            ColorizeError::decode(format!("Failed to decode image from bytes: {}", e))
        })
    }

    /// Read an async stream to the end and decode it
    ///
    /// # Examples
    /// ```rust,no_run
    /// use colorit::services::ImageIOService;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let file = tokio::fs::File::open("image.jpg").await?;
    /// let image = ImageIOService::load_from_reader(file).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load_from_reader<R: tokio::io::AsyncRead + Unpin>(
        mut reader: R,
    ) -> Result<DynamicImage> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;
        Self::decode(&buffer)
    }

    /// Encode an image in memory
    ///
    /// # Errors
    /// - `Encode` when the encoder fails
    pub fn encode(image: &RgbImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        Self::write_encoded(image, &mut Cursor::new(&mut buffer), format, quality)?;
        Ok(buffer)
    }

    /// Save an image, creating parent directories as needed
    ///
    /// `quality` only applies to JPEG.
    ///
    /// # Errors
    /// - `Encode` when the directory or file cannot be created or encoding fails
    ///
    /// # Examples
    /// ```rust,no_run
    /// use colorit::{services::ImageIOService, OutputFormat};
    /// use image::RgbImage;
    ///
    /// let image = RgbImage::new(100, 100);
    /// ImageIOService::save_image(&image, "out/colorized.jpg", OutputFormat::Jpeg, 95)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn save_image<P: AsRef<Path>>(
        image: &RgbImage,
        path: P,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ColorizeError::encode(format!(
                    "Failed to create output directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let file = std::fs::File::create(path_ref).map_err(|e| {
            ColorizeError::encode(format!(
                "Failed to create '{}': {}",
                path_ref.display(),
                e
            ))
        })?;
        let mut writer = BufWriter::new(file);

        Self::write_encoded(image, &mut writer, format, quality).map_err(|e| {
            ColorizeError::encode(format!("{} (path: {})", e, path_ref.display()))
        })?;
        writer.flush().map_err(|e| {
            ColorizeError::encode(format!(
                "Failed to write '{}': {}",
                path_ref.display(),
                e
            ))
        })
    }

    fn write_encoded<W: Write + std::io::Seek>(
        image: &RgbImage,
        writer: &mut W,
        format: OutputFormat,
        quality: u8,
    ) -> Result<()> {
        let result = match format {
            OutputFormat::Jpeg => JpegEncoder::new_with_quality(writer, quality.min(100))
                .encode_image(image),
            OutputFormat::Png => {
                image.write_to(writer, OutputFormatHandler::image_format(format))
            },
        };

        result.map_err(|e| ColorizeError::encode(format!("Failed to encode as {}: {}", format, e)))
    }

    /// Check if a file path has a supported input extension (case-insensitive)
    pub fn is_supported_input<P: AsRef<Path>>(path: P) -> bool {
        let Some(extension) = path.as_ref().extension().and_then(|e| e.to_str()) else {
            return false;
        };

        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "png" | "bmp" | "tif" | "tiff" => true,
            "webp" => cfg!(feature = "webp-support"),
            _ => false,
        }
    }
}
