//! Image I/O operations service
//!
//! Decoding of uploads and file access, kept apart from the session logic.

use crate::{
    error::{EraseError, Result},
    types::SourceImage,
};
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader};
use std::{io::Cursor, path::Path};

/// Service for image decoding and file input/output
pub struct ImageIOService;

impl ImageIOService {
    /// Decode uploaded bytes into a [`SourceImage`]
    ///
    /// The format is detected from the content; only PNG and JPEG are
    /// accepted. EXIF orientation is applied so the image is upright.
    ///
    /// # Errors
    /// - `EraseError::Decode` for unsupported formats or corrupt data
    ///
    /// # Examples
    /// ```rust,no_run
    /// use bg_eraser::services::ImageIOService;
    ///
    /// let bytes = std::fs::read("photo.jpg")?;
    /// let source = ImageIOService::load_source(&bytes)?;
    /// println!("{:?}", source.dimensions());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_source(bytes: &[u8]) -> Result<SourceImage> {
        if bytes.is_empty() {
            return Err(EraseError::decode("Uploaded file is empty"));
        }

        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| EraseError::decode(format!("Failed to read image data: {e}")))?;

        match reader.format() {
            Some(ImageFormat::Png | ImageFormat::Jpeg) => {},
            Some(other) => {
                return Err(EraseError::decode(format!(
                    "Unsupported image format {other:?}; expected PNG or JPEG"
                )));
            },
            None => {
                return Err(EraseError::decode(
                    "Unrecognized image data; expected PNG or JPEG",
                ));
            },
        }

        let mut decoder = reader
            .into_decoder()
            .map_err(|e| EraseError::decode(format!("Failed to decode image: {e}")))?;
        let orientation = decoder.orientation().map_err(|e| {
            EraseError::decode(format!("Failed to read orientation metadata: {e}"))
        })?;
        let mut image = DynamicImage::from_decoder(decoder)
            .map_err(|e| EraseError::decode(format!("Failed to decode image: {e}")))?;
        image.apply_orientation(orientation);

        log::debug!(
            "Decoded {}x{} image ({:?})",
            image.width(),
            image.height(),
            image.color()
        );
        Ok(SourceImage::new(image))
    }

    /// Read and decode an image file
    ///
    /// # Errors
    /// - `EraseError::Io` if the file cannot be read
    /// - `EraseError::Decode` for unsupported formats or corrupt data
    pub fn load_source_file<P: AsRef<Path>>(path: P) -> Result<SourceImage> {
        let bytes = Self::read_file(path)?;
        Self::load_source(&bytes)
    }

    /// Read all bytes from an async reader and decode them
    ///
    /// # Errors
    /// - `EraseError::Io` if the stream fails
    /// - `EraseError::Decode` for unsupported formats or corrupt data
    pub async fn load_source_from_reader<R: tokio::io::AsyncRead + Unpin>(
        mut reader: R,
    ) -> Result<SourceImage> {
        use tokio::io::AsyncReadExt;

        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).await?;
        Self::load_source(&buffer)
    }

    /// Read a file, attaching the path to any I/O error
    ///
    /// # Errors
    /// - `EraseError::Io` if the file is missing or unreadable
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        let path_ref = path.as_ref();
        std::fs::read(path_ref).map_err(|e| EraseError::file_io_error("read file", path_ref, &e))
    }

    /// Write bytes to a file, creating parent directories as needed
    ///
    /// # Errors
    /// - `EraseError::Io` if the directory or file cannot be written
    pub fn write_file<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    EraseError::file_io_error("create output directory", parent, &e)
                })?;
            }
        }

        std::fs::write(path_ref, bytes)
            .map_err(|e| EraseError::file_io_error("write file", path_ref, &e))
    }

    /// Check if a file path has a supported upload extension
    #[must_use]
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "png" | "jpg" | "jpeg"))
    }
}
