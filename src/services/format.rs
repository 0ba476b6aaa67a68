//! Output format handling service
//!
//! Maps between file extensions and [`OutputFormat`] and derives default
//! output names.

use crate::{
    config::OutputFormat,
    error::{ColorizeError, Result},
};
use std::path::{Path, PathBuf};

/// Prefix of default output file names
pub const OUTPUT_PREFIX: &str = "colorized_";

/// Service for handling output format selection
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Determine the save format from a path's extension (case-insensitive)
    ///
    /// # Examples
    /// ```rust
    /// use colorit::{services::OutputFormatHandler, OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::from_path("a/b.PNG").unwrap(), OutputFormat::Png);
    /// assert_eq!(OutputFormatHandler::from_path("photo.jpeg").unwrap(), OutputFormat::Jpeg);
    /// assert!(OutputFormatHandler::from_path("photo.gif").is_err());
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<OutputFormat> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("png") => Ok(OutputFormat::Png),
            Some("jpg" | "jpeg") => Ok(OutputFormat::Jpeg),
            Some(other) => Err(ColorizeError::encode(format!(
                "Unsupported output format '.{}' for '{}'. Use .png, .jpg or .jpeg",
                other,
                path.display()
            ))),
            None => Err(ColorizeError::encode(format!(
                "Unsupported output format: '{}' has no extension",
                path.display()
            ))),
        }
    }

    /// File extension for a format (without the dot)
    ///
    /// ```rust
    /// use colorit::{services::OutputFormatHandler, OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
    /// ```
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// Corresponding `image` crate format
    #[must_use]
    pub fn image_format(format: OutputFormat) -> image::ImageFormat {
        match format {
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }

    /// Default output path: `colorized_<name>` next to the input
    ///
    /// An input without an extension gets `.jpg`.
    #[must_use]
    pub fn default_output_path<P: AsRef<Path>>(input: P) -> PathBuf {
        let input = input.as_ref();
        let stem = input
            .file_stem()
            .map_or_else(|| "image".to_string(), |s| s.to_string_lossy().to_string());
        let extension = input.extension().map_or_else(
            || Self::get_extension(OutputFormat::Jpeg).to_string(),
            |e| e.to_string_lossy().to_string(),
        );

        input.with_file_name(format!("{OUTPUT_PREFIX}{stem}.{extension}"))
    }

    /// Format to save with: an explicit override, else the path's extension,
    /// else `fallback`
    #[must_use]
    pub fn resolve(path: &Path, explicit: Option<OutputFormat>, fallback: OutputFormat) -> OutputFormat {
        explicit
            .or_else(|| Self::from_path(path).ok())
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(OutputFormatHandler::from_path("x.png").unwrap(), OutputFormat::Png);
        assert_eq!(OutputFormatHandler::from_path("x.JPG").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormatHandler::from_path("x.Jpeg").unwrap(), OutputFormat::Jpeg);

        let err = OutputFormatHandler::from_path("x.bmp").unwrap_err();
        assert!(matches!(err, ColorizeError::Encode(_)));
        assert!(err.to_string().contains("Unsupported output format"));
        assert!(OutputFormatHandler::from_path("noext").is_err());
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            OutputFormatHandler::default_output_path("/photos/grandma.png"),
            PathBuf::from("/photos/colorized_grandma.png")
        );
        assert_eq!(
            OutputFormatHandler::default_output_path("scan"),
            PathBuf::from("colorized_scan.jpg")
        );
        assert_eq!(
            OutputFormatHandler::default_output_path("old.photo.JPEG"),
            PathBuf::from("colorized_old.photo.JPEG")
        );
    }

    #[test]
    fn test_resolve_precedence() {
        let path = Path::new("out.png");
        assert_eq!(
            OutputFormatHandler::resolve(path, Some(OutputFormat::Jpeg), OutputFormat::Png),
            OutputFormat::Jpeg
        );
        assert_eq!(
            OutputFormatHandler::resolve(path, None, OutputFormat::Jpeg),
            OutputFormat::Png
        );
        assert_eq!(
            OutputFormatHandler::resolve(Path::new("out.bmp"), None, OutputFormat::Jpeg),
            OutputFormat::Jpeg
        );
    }

    #[test]
    fn test_extension_and_image_format() {
        assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
        assert_eq!(
            OutputFormatHandler::image_format(OutputFormat::Jpeg),
            image::ImageFormat::Jpeg
        );
    }
}
