//! Manual erase compositing
//!
//! Turns a painted overlay into a binary [`EraseMask`] and applies it as full
//! transparency to the background-removed image. Erased pixels become
//! `(0, 0, 0, 0)`: colour is cleared along with alpha so nothing bleeds through
//! if the image is later composited onto another background.
//!
//! The mask is strictly binary. Any non-zero value in the designated channel
//! marks the pixel, including anti-aliased stroke edges.

use crate::{
    config::Channel,
    error::{EraseError, Result},
    types::{CleanedImage, EraseMask, StrokeOverlay},
};
use image::{Rgba, RgbaImage};
use log::{debug, error};
use tracing::instrument;

const ERASED: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Mask compositor for the erase step
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskCompositor {
    channel: Channel,
}

impl MaskCompositor {
    /// Create a compositor reading paint presence from `channel`
    #[must_use]
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    /// Channel used as the paint-presence signal
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Derive the erase mask: `mask[x,y] = overlay[x,y][channel] > 0`
    #[must_use]
    pub fn derive_mask(&self, overlay: &StrokeOverlay) -> EraseMask {
        derive_mask(overlay, self.channel)
    }

    /// Derive the erase mask for `overlay`, checking it matches `base`
    ///
    /// # Errors
    /// - `EraseError::DimensionMismatch` if the overlay size differs from `base`
    pub fn mask_for(&self, base: &RgbaImage, overlay: &StrokeOverlay) -> Result<EraseMask> {
        check_dimensions(base.dimensions(), overlay.dimensions())?;
        Ok(self.derive_mask(overlay))
    }

    /// Build a cleaned copy of `base` with every painted overlay pixel erased
    ///
    /// A missing overlay yields an exact copy of `base`. `base` is never
    /// modified.
    ///
    /// # Errors
    /// - `EraseError::DimensionMismatch` if the overlay size differs from `base`
    #[instrument(skip_all, fields(width = base.width(), height = base.height()))]
    pub fn apply_mask(
        &self,
        base: &RgbaImage,
        overlay: Option<&StrokeOverlay>,
    ) -> Result<CleanedImage> {
        let Some(overlay) = overlay else {
            debug!("No stroke overlay supplied; cleaned image is a copy of the base");
            return Ok(CleanedImage::new(base.clone()));
        };

        let mask = self.mask_for(base, overlay)?;
        apply_erase_mask(base, &mask)
    }
}

/// Derive a binary erase mask from the designated overlay channel
#[must_use]
pub fn derive_mask(overlay: &StrokeOverlay, channel: Channel) -> EraseMask {
    let index = channel.index();
    let data = overlay
        .image()
        .pixels()
        .map(|pixel| pixel.0.get(index).copied().unwrap_or(0) > 0)
        .collect();
    let (width, height) = overlay.dimensions();

    // Pixel count always matches the overlay's own dimensions
    EraseMask::new(data, (width, height)).unwrap_or_else(|_| EraseMask::empty(width, height))
}

/// Apply a derived mask to `base`, returning a new cleaned image
///
/// # Errors
/// - `EraseError::DimensionMismatch` if the mask size differs from `base`
pub fn apply_erase_mask(base: &RgbaImage, mask: &EraseMask) -> Result<CleanedImage> {
    check_dimensions(base.dimensions(), mask.dimensions())?;

    let mut cleaned = base.clone();
    for (pixel, marked) in cleaned.pixels_mut().zip(mask.as_slice()) {
        if *marked {
            *pixel = ERASED;
        }
    }

    debug!(
        "Erased {} of {} pixels",
        mask.marked_count(),
        mask.as_slice().len()
    );
    Ok(CleanedImage::new(cleaned))
}

fn check_dimensions(expected: (u32, u32), actual: (u32, u32)) -> Result<()> {
    if expected != actual {
        error!(
            "Erase overlay is {}x{} but the image is {}x{}; aborting erase",
            actual.0, actual.1, expected.0, expected.1
        );
        return Err(EraseError::dimension_mismatch(expected, actual));
    }
    Ok(())
}
