//! Background removal
//!
//! [`BackgroundRemover`] is the seam between the session and the segmentation
//! model: PNG bytes in, RGBA PNG bytes out. [`ModelRemover`] implements it on
//! top of any [`InferenceBackend`].

use crate::{
    config::{OutputFormat, RemoverSettings},
    error::{EraseError, Result},
    inference::InferenceBackend,
    services::OutputFormatHandler,
    utils::{ImagePreprocessor, Letterbox},
};
use image::{DynamicImage, Rgba, RgbaImage};
use instant::Instant;
use log::{debug, info, warn};
use ndarray::Array4;
use tracing::instrument;

/// Turns an image into the same image with its background made transparent
///
/// Implementations may take seconds and need not be deterministic. Every
/// failure must be reported as `EraseError::Processing`.
pub trait BackgroundRemover {
    /// Remove the background from PNG-encoded `png_bytes`
    ///
    /// Returns PNG bytes of an RGBA image with the same dimensions, where
    /// alpha encodes foreground opacity.
    ///
    /// # Errors
    /// - `EraseError::Processing` for any model or decoding failure
    fn remove_background(&mut self, png_bytes: &[u8]) -> Result<Vec<u8>>;
}

impl<T: BackgroundRemover + ?Sized> BackgroundRemover for Box<T> {
    fn remove_background(&mut self, png_bytes: &[u8]) -> Result<Vec<u8>> {
        (**self).remove_background(png_bytes)
    }
}

/// Background remover driven by a segmentation model backend
#[derive(Debug)]
pub struct ModelRemover<B: InferenceBackend> {
    settings: RemoverSettings,
    backend: B,
}

impl<B: InferenceBackend> ModelRemover<B> {
    /// Wrap `backend`; the model is loaded lazily on first use
    #[must_use]
    pub fn new(backend: B, settings: RemoverSettings) -> Self {
        Self { settings, backend }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[must_use]
    pub fn settings(&self) -> &RemoverSettings {
        &self.settings
    }

    /// Load the model now instead of on the first removal
    ///
    /// A failed attempt is retried on the next call.
    ///
    /// # Errors
    /// - `EraseError::Processing` if the backend cannot be initialized
    pub fn initialize(&mut self) -> Result<()> {
        if self.backend.is_initialized() {
            return Ok(());
        }

        match self.backend.initialize(&self.settings) {
            Ok(Some(load_time)) => {
                info!("Segmentation model loaded in {}ms", load_time.as_millis());
                Ok(())
            },
            Ok(None) => Ok(()),
            Err(e) => {
                warn!("Segmentation model failed to load: {}", e);
                Err(into_processing(e))
            },
        }
    }

    fn run(&mut self, png_bytes: &[u8]) -> Result<Vec<u8>> {
        self.initialize()?;

        let image = image::load_from_memory(png_bytes)
            .map_err(|e| EraseError::processing(format!("Failed to decode remover input: {e}")))?;
        let dimensions = (image.width(), image.height());
        let input_info = format!("{}x{}", dimensions.0, dimensions.1);

        let preprocess_start = Instant::now();
        let config = self.backend.preprocessing_config();
        let (letterbox, tensor) = ImagePreprocessor::preprocess_for_inference(&image, &config)
            .map_err(|e| {
                EraseError::processing_stage_error("preprocessing", &e.to_string(), Some(&input_info))
            })?;
        debug!(
            "Preprocessed {}x{} image in {}ms",
            dimensions.0,
            dimensions.1,
            preprocess_start.elapsed().as_millis()
        );

        let inference_start = Instant::now();
        let output = self.backend.infer(&tensor).map_err(|e| {
            EraseError::processing_stage_error("inference", &e.to_string(), Some(&input_info))
        })?;
        debug!("Inference took {}ms", inference_start.elapsed().as_millis());

        let matte = tensor_to_matte(&output, dimensions, &letterbox)?;
        let result = apply_matte(&image, &matte);
        OutputFormatHandler::encode(&result, OutputFormat::Png)
    }
}

impl<B: InferenceBackend> BackgroundRemover for ModelRemover<B> {
    #[instrument(skip_all, fields(bytes = png_bytes.len()))]
    fn remove_background(&mut self, png_bytes: &[u8]) -> Result<Vec<u8>> {
        self.run(png_bytes).map_err(into_processing)
    }
}

fn into_processing(error: EraseError) -> EraseError {
    match error {
        EraseError::Processing(_) => error,
        other => EraseError::processing(other.to_string()),
    }
}

/// Map a `1x1xHxW` model output back onto the source pixels as an 8-bit matte
///
/// Inverts the letterbox applied during preprocessing. Source pixels that map
/// outside the model output are treated as background.
///
/// # Errors
/// - Output tensor is not `1x1xHxW`
pub fn tensor_to_matte(
    tensor: &Array4<f32>,
    dimensions: (u32, u32),
    letterbox: &Letterbox,
) -> Result<Vec<u8>> {
    let shape = tensor.shape();
    if shape.first() != Some(&1) || shape.get(1) != Some(&1) {
        return Err(EraseError::processing(format!(
            "Invalid output tensor shape {shape:?}; expected [1, 1, H, W]"
        )));
    }
    let mask_height = shape.get(2).copied().unwrap_or(0);
    let mask_width = shape.get(3).copied().unwrap_or(0);

    let (width, height) = dimensions;
    let mut matte = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let (tensor_x, tensor_y) = letterbox.to_model(x, y);
            let value = if (tensor_x as usize) < mask_width && (tensor_y as usize) < mask_height {
                tensor
                    .get([0, 0, tensor_y as usize, tensor_x as usize])
                    .copied()
                    .unwrap_or(0.0)
            } else {
                0.0
            };
            matte.push((value.clamp(0.0, 1.0) * 255.0) as u8);
        }
    }

    Ok(matte)
}

/// Use `matte` as the alpha channel of `image`
///
/// Fully transparent pixels are cleared to `(0, 0, 0, 0)`.
#[must_use]
pub fn apply_matte(image: &DynamicImage, matte: &[u8]) -> RgbaImage {
    let mut result = image.to_rgba8();
    for (pixel, alpha) in result.pixels_mut().zip(matte.iter().copied()) {
        *pixel = if alpha > 0 {
            Rgba([pixel[0], pixel[1], pixel[2], alpha])
        } else {
            Rgba([0, 0, 0, 0])
        };
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::MockBackend;
    use image::{Rgb, RgbImage};

    fn png(image: &DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn small_settings() -> RemoverSettings {
        RemoverSettings {
            target_size: 64,
            ..RemoverSettings::default()
        }
    }

    #[test]
    fn test_model_remover_applies_matte() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, Rgb([10, 200, 30])));
        let mut remover = ModelRemover::new(MockBackend::new(), small_settings());

        let output = remover.remove_background(&png(&source)).unwrap();
        let result = image::load_from_memory(&output).unwrap().to_rgba8();

        assert_eq!(result.dimensions(), (40, 40));
        assert_eq!(result.get_pixel(20, 20).0, [10, 200, 30, 255]);
        assert_eq!(result.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert!(remover.backend().is_initialized());
    }

    #[test]
    fn test_init_failure_is_retried() {
        let mut remover = ModelRemover::new(MockBackend::failing_init(1), small_settings());
        let source = png(&DynamicImage::ImageRgb8(RgbImage::new(8, 8)));

        let err = remover.remove_background(&source).unwrap_err();
        assert!(matches!(err, EraseError::Processing(_)));
        assert!(!remover.backend().is_initialized());

        assert!(remover.remove_background(&source).is_ok());
        assert_eq!(remover.backend().init_attempts(), 2);
    }

    #[test]
    fn test_inference_failure_is_processing_error() {
        let mut remover = ModelRemover::new(MockBackend::failing_inference(), small_settings());
        let source = png(&DynamicImage::ImageRgb8(RgbImage::new(12, 8)));
        let err = remover.remove_background(&source).unwrap_err();
        assert!(matches!(err, EraseError::Processing(_)));

        let message = err.to_string();
        assert!(message.contains("stage 'inference'"));
        assert!(message.contains("12x8"));
    }

    #[test]
    fn test_undecodable_input_is_processing_error() {
        let mut remover = ModelRemover::new(MockBackend::new(), small_settings());
        assert!(matches!(
            remover.remove_background(b"garbage").unwrap_err(),
            EraseError::Processing(_)
        ));
    }

    #[test]
    fn test_tensor_to_matte_inverts_letterbox() {
        // 4x2 image letterboxed into 4x4: rows 1..3 hold the content
        let letterbox = Letterbox::compute((4, 2), 4).unwrap();
        let mut tensor = Array4::<f32>::zeros((1, 1, 4, 4));
        tensor[[0, 0, 1, 0]] = 1.0;
        tensor[[0, 0, 2, 3]] = 0.5;

        let matte = tensor_to_matte(&tensor, (4, 2), &letterbox).unwrap();
        assert_eq!(matte.len(), 8);
        assert_eq!(matte[0], 255);
        assert_eq!(matte[7], 127);
        assert_eq!(matte[1], 0);
    }

    #[test]
    fn test_tensor_to_matte_rejects_bad_shape() {
        let letterbox = Letterbox::compute((4, 4), 4).unwrap();
        let tensor = Array4::<f32>::zeros((1, 3, 4, 4));
        assert!(tensor_to_matte(&tensor, (4, 4), &letterbox).is_err());
    }

    #[test]
    fn test_apply_matte_clears_transparent_pixels() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 1, Rgb([50, 60, 70])));
        let result = apply_matte(&image, &[0, 128]);
        assert_eq!(result.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(result.get_pixel(1, 0).0, [50, 60, 70, 128]);
    }
}
