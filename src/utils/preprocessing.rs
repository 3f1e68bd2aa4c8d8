//! Image preprocessing for segmentation models
//!
//! Letterboxes the source into the model's square input and keeps the
//! parameters needed to map the model output back onto the source pixels.

use crate::{
    error::{EraseError, Result},
    models::PreprocessingConfig,
};
use image::{imageops::FilterType, DynamicImage, ImageBuffer, Rgb, RgbImage};
use ndarray::Array4;

/// Configuration for preprocessing behavior
#[derive(Debug, Clone)]
pub struct PreprocessingOptions {
    /// Padding color for aspect ratio preservation (RGB)
    pub padding_color: [u8; 3],
}

impl Default for PreprocessingOptions {
    fn default() -> Self {
        Self {
            padding_color: [255, 255, 255],
        }
    }
}

/// Scale and centering offsets applied by [`ImagePreprocessor`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub scaled_width: u32,
    pub scaled_height: u32,
}

impl Letterbox {
    /// Compute the letterbox for an image of `original` size in a `target_size` square
    ///
    /// # Errors
    /// - Zero-sized image or target
    pub fn compute(original: (u32, u32), target_size: u32) -> Result<Self> {
        let (orig_width, orig_height) = original;
        if orig_width == 0 || orig_height == 0 || target_size == 0 {
            return Err(EraseError::processing(format!(
                "Cannot letterbox {orig_width}x{orig_height} image into {target_size}x{target_size}"
            )));
        }

        let target = target_size as f32;
        let scale = (target / orig_width as f32).min(target / orig_height as f32);

        let scaled_width = ((orig_width as f32 * scale).round() as u32).clamp(1, target_size);
        let scaled_height = ((orig_height as f32 * scale).round() as u32).clamp(1, target_size);

        Ok(Self {
            scale,
            offset_x: (target_size - scaled_width) / 2,
            offset_y: (target_size - scaled_height) / 2,
            scaled_width,
            scaled_height,
        })
    }

    /// Map a source pixel to its position in the model's square input
    #[must_use]
    pub fn to_model(&self, x: u32, y: u32) -> (u32, u32) {
        let scaled_x = (x as f32 * self.scale).round() as u32;
        let scaled_y = (y as f32 * self.scale).round() as u32;
        (scaled_x + self.offset_x, scaled_y + self.offset_y)
    }
}

/// Image preprocessing for model inference
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Preprocess an image into a normalized NCHW tensor
    ///
    /// Converts to RGB, resizes keeping the aspect ratio, center-pads to the
    /// model's square size and normalizes each channel.
    ///
    /// # Errors
    /// - Zero-sized image or target size
    pub fn preprocess_image(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
        options: &PreprocessingOptions,
    ) -> Result<(Letterbox, Array4<f32>)> {
        let target_size = preprocessing_config.target_size[0];
        let rgb_image = image.to_rgb8();
        let letterbox = Letterbox::compute(rgb_image.dimensions(), target_size)?;

        let resized = image::imageops::resize(
            &rgb_image,
            letterbox.scaled_width,
            letterbox.scaled_height,
            FilterType::Triangle,
        );

        let mut canvas: RgbImage =
            ImageBuffer::from_pixel(target_size, target_size, Rgb(options.padding_color));
        image::imageops::replace(
            &mut canvas,
            &resized,
            i64::from(letterbox.offset_x),
            i64::from(letterbox.offset_y),
        );

        let tensor = Self::canvas_to_tensor(&canvas, preprocessing_config, target_size as usize);
        Ok((letterbox, tensor))
    }

    /// Preprocess with default options
    ///
    /// # Errors
    /// - Zero-sized image or target size
    pub fn preprocess_for_inference(
        image: &DynamicImage,
        preprocessing_config: &PreprocessingConfig,
    ) -> Result<(Letterbox, Array4<f32>)> {
        Self::preprocess_image(image, preprocessing_config, &PreprocessingOptions::default())
    }

    fn canvas_to_tensor(
        canvas: &RgbImage,
        preprocessing_config: &PreprocessingConfig,
        target_size: usize,
    ) -> Array4<f32> {
        let mut tensor = Array4::<f32>::zeros((1, 3, target_size, target_size));
        let mean = preprocessing_config.normalization_mean;
        let std = preprocessing_config.normalization_std;

        #[allow(clippy::indexing_slicing)]
        // Safe: tensor dimensions pre-allocated to match canvas size
        for (x, y, pixel) in canvas.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for channel in 0..3 {
                tensor[[0, channel, y, x]] =
                    (f32::from(pixel[channel]) / 255.0 - mean[channel]) / std[channel];
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(size: u32) -> PreprocessingConfig {
        PreprocessingConfig {
            target_size: [size, size],
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [1.0, 1.0, 1.0],
        }
    }

    #[test]
    fn test_letterbox_wide_image() {
        let letterbox = Letterbox::compute((200, 100), 64).unwrap();
        assert_eq!(letterbox.scaled_width, 64);
        assert_eq!(letterbox.scaled_height, 32);
        assert_eq!(letterbox.offset_x, 0);
        assert_eq!(letterbox.offset_y, 16);
        assert_eq!(letterbox.to_model(0, 0), (0, 16));
        assert_eq!(letterbox.to_model(100, 50), (32, 32));
    }

    #[test]
    fn test_letterbox_rejects_empty() {
        assert!(Letterbox::compute((0, 10), 64).is_err());
        assert!(Letterbox::compute((10, 10), 0).is_err());
    }

    #[test]
    fn test_tensor_shape_and_padding() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([0, 0, 0])));
        let (letterbox, tensor) =
            ImagePreprocessor::preprocess_for_inference(&image, &config(32)).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
        assert_eq!(letterbox.offset_y, 8);
        // Padding is white: (1.0 - 0.5) / 1.0
        assert!((tensor[[0, 0, 0, 0]] - 0.5).abs() < 1e-6);
        // Image content is black: (0.0 - 0.5) / 1.0
        assert!((tensor[[0, 1, 16, 16]] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_custom_padding_color() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 20, Rgb([255, 255, 255])));
        let options = PreprocessingOptions {
            padding_color: [0, 0, 0],
        };
        let (_, tensor) = ImagePreprocessor::preprocess_image(&image, &config(16), &options).unwrap();
        assert!((tensor[[0, 2, 8, 0]] + 0.5).abs() < 1e-6);
        assert!((tensor[[0, 2, 8, 8]] - 0.5).abs() < 1e-2);
    }
}
