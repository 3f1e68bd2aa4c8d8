//! Core image and mask types for the erase session

use crate::error::{EraseError, Result};
use image::{DynamicImage, GenericImageView, RgbaImage};

/// Decoded upload with orientation metadata applied
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: DynamicImage,
}

impl SourceImage {
    #[must_use]
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    #[must_use]
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// RGBA output of the background remover; alpha encodes transparency
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedBgImage {
    image: RgbaImage,
}

impl RemovedBgImage {
    #[must_use]
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Decode the remover's PNG output into an RGBA buffer
    ///
    /// # Errors
    /// - Bytes are not a decodable image (reported as a processing failure)
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(|e| {
            EraseError::processing(format!("Background remover returned an unreadable image: {e}"))
        })?;
        Ok(Self::new(image.to_rgba8()))
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Result of an apply-erase: the removed image with masked pixels fully cleared
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedImage {
    image: RgbaImage,
}

impl CleanedImage {
    #[must_use]
    pub(crate) fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    #[must_use]
    pub fn into_inner(self) -> RgbaImage {
        self.image
    }
}

/// Raster snapshot emitted by the paint surface
///
/// Painted pixels carry a non-zero value in the designated channel; all other
/// pixels are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeOverlay {
    image: RgbaImage,
}

impl StrokeOverlay {
    #[must_use]
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Fully transparent overlay with no paint
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbaImage::new(width, height))
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub(crate) fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Binary per-pixel erase mask, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EraseMask {
    data: Vec<bool>,
    dimensions: (u32, u32),
}

impl EraseMask {
    /// Build a mask from row-major values
    ///
    /// # Errors
    /// - `data.len()` does not equal `width * height`
    pub fn new(data: Vec<bool>, dimensions: (u32, u32)) -> Result<Self> {
        let expected = dimensions.0 as usize * dimensions.1 as usize;
        if data.len() != expected {
            return Err(EraseError::processing(format!(
                "Mask data has {} entries, expected {} for {}x{}",
                data.len(),
                expected,
                dimensions.0,
                dimensions.1
            )));
        }
        Ok(Self { data, dimensions })
    }

    /// Mask with nothing marked
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            data: vec![false; width as usize * height as usize],
            dimensions: (width, height),
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    /// Whether the pixel at (x, y) is marked; out-of-range coordinates are unmarked
    #[must_use]
    pub fn is_marked(&self, x: u32, y: u32) -> bool {
        if x >= self.dimensions.0 || y >= self.dimensions.1 {
            return false;
        }
        let index = y as usize * self.dimensions.0 as usize + x as usize;
        self.data.get(index).copied().unwrap_or(false)
    }

    /// Number of marked pixels
    #[must_use]
    pub fn marked_count(&self) -> usize {
        self.data.iter().filter(|m| **m).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|m| *m)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_mask_rejects_wrong_length() {
        assert!(EraseMask::new(vec![true; 5], (2, 2)).is_err());
        assert!(EraseMask::new(vec![true; 4], (2, 2)).is_ok());
    }

    #[test]
    fn test_mask_queries() {
        let mask = EraseMask::new(vec![true, false, false, true], (2, 2)).unwrap();
        assert!(mask.is_marked(0, 0));
        assert!(!mask.is_marked(1, 0));
        assert!(mask.is_marked(1, 1));
        assert!(!mask.is_marked(5, 5));
        assert_eq!(mask.marked_count(), 2);
        assert!(!mask.is_empty());
        assert!(EraseMask::empty(3, 3).is_empty());
    }

    #[test]
    fn test_removed_image_from_png_bytes() {
        let rgba = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 40]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(rgba.clone())
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let removed = RemovedBgImage::from_png_bytes(&bytes).unwrap();
        assert_eq!(removed.dimensions(), (4, 3));
        assert_eq!(removed.image(), &rgba);
    }

    #[test]
    fn test_removed_image_from_garbage_is_processing_error() {
        let err = RemovedBgImage::from_png_bytes(b"not an image").unwrap_err();
        assert!(matches!(err, EraseError::Processing(_)));
    }

    #[test]
    fn test_blank_overlay() {
        let overlay = StrokeOverlay::blank(3, 2);
        assert_eq!(overlay.dimensions(), (3, 2));
        assert!(overlay.image().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }
}
