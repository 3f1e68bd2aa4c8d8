//! Output format handling service
//!
//! Keeps encoding of downloadable artifacts out of the session logic.

use crate::{
    config::OutputFormat,
    error::{EraseError, Result},
};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Downloadable artifacts produced by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Output of the background remover
    BgRemoved,
    /// Output of the latest apply-erase
    Cleaned,
}

impl Artifact {
    /// File stem used for the download
    #[must_use]
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::BgRemoved => "bg_removed",
            Self::Cleaned => "cleaned",
        }
    }

    /// Download file name for `format`, e.g. `cleaned.png`
    ///
    /// # Examples
    /// ```rust
    /// use bg_eraser::{services::Artifact, config::OutputFormat};
    ///
    /// assert_eq!(Artifact::BgRemoved.file_name(OutputFormat::Png), "bg_removed.png");
    /// assert_eq!(Artifact::Cleaned.file_name(OutputFormat::Png), "cleaned.png");
    /// ```
    #[must_use]
    pub fn file_name(self, format: OutputFormat) -> String {
        format!(
            "{}.{}",
            self.file_stem(),
            OutputFormatHandler::get_extension(format)
        )
    }
}

/// Service for encoding output images
pub struct OutputFormatHandler;

impl OutputFormatHandler {
    /// Encode an RGBA image losslessly in the given format
    ///
    /// Colour and alpha are written unchanged, including fully erased
    /// `(0, 0, 0, 0)` pixels.
    ///
    /// # Errors
    /// - `EraseError::Encode` if the encoder fails
    pub fn encode(image: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), Self::image_format(format))
            .map_err(|e| EraseError::encode(format!("Failed to encode as {format}: {e}")))?;
        Ok(bytes)
    }

    /// Encode any decoded image as PNG, keeping its native pixel layout
    ///
    /// Used to hand the source image to the background remover.
    ///
    /// # Errors
    /// - `EraseError::Encode` if the encoder fails
    pub fn encode_dynamic(image: &DynamicImage) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let result = match image {
            // PNG has no f32 layout
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => DynamicImage::ImageRgba8(
                image.to_rgba8(),
            )
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png),
            _ => image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png),
        };
        result.map_err(|e| EraseError::encode(format!("Failed to encode source image: {e}")))?;
        Ok(bytes)
    }

    fn image_format(format: OutputFormat) -> ImageFormat {
        match format {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Tiff => ImageFormat::Tiff,
        }
    }

    /// File extension (without the dot) for a given output format
    ///
    /// # Examples
    /// ```rust
    /// use bg_eraser::{services::OutputFormatHandler, config::OutputFormat};
    ///
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Png), "png");
    /// assert_eq!(OutputFormatHandler::get_extension(OutputFormat::Tiff), "tiff");
    /// ```
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Tiff => "tiff",
        }
    }

    /// MIME type for a given output format
    #[must_use]
    pub fn mime_type(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "image/png",
            OutputFormat::Tiff => "image/tiff",
        }
    }

    /// Check if a format keeps the alpha channel
    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png | OutputFormat::Tiff => true,
        }
    }
}
