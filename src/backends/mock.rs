//! Mock backends and removers
//!
//! Deterministic stand-ins for the segmentation model, usable without model
//! files. Used by the test suites and benchmarks.

use crate::{
    config::{OutputFormat, RemoverSettings},
    error::{EraseError, Result},
    inference::InferenceBackend,
    models::{ModelInfo, PreprocessingConfig},
    remover::BackgroundRemover,
    services::OutputFormatHandler,
};
use image::RgbaImage;
use instant::Duration;
use ndarray::Array4;

/// Inference backend that predicts a centered ellipse as foreground
#[derive(Debug, Clone)]
pub struct MockBackend {
    preprocessing: PreprocessingConfig,
    initialized: bool,
    init_failures_left: usize,
    fail_inference: bool,
    init_attempts: usize,
    inference_calls: usize,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            preprocessing: PreprocessingConfig::from(&RemoverSettings::default()),
            initialized: false,
            init_failures_left: 0,
            fail_inference: false,
            init_attempts: 0,
            inference_calls: 0,
        }
    }

    /// Backend whose first `failures` initialization attempts fail
    #[must_use]
    pub fn failing_init(failures: usize) -> Self {
        Self {
            init_failures_left: failures,
            ..Self::new()
        }
    }

    /// Backend that initializes but fails every inference
    #[must_use]
    pub fn failing_inference() -> Self {
        Self {
            fail_inference: true,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn init_attempts(&self) -> usize {
        self.init_attempts
    }

    #[must_use]
    pub fn inference_calls(&self) -> usize {
        self.inference_calls
    }

    /// Ellipse covering the central 80% of the output in each direction
    fn ellipse(height: usize, width: usize) -> Array4<f32> {
        let center_x = width as f32 / 2.0;
        let center_y = height as f32 / 2.0;
        let radius_x = (width as f32 * 0.4).max(1.0);
        let radius_y = (height as f32 * 0.4).max(1.0);

        Array4::from_shape_fn((1, 1, height, width), |(_, _, y, x)| {
            let dx = (x as f32 + 0.5 - center_x) / radius_x;
            let dy = (y as f32 + 0.5 - center_y) / radius_y;
            if dx * dx + dy * dy <= 1.0 {
                1.0
            } else {
                0.0
            }
        })
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for MockBackend {
    fn initialize(&mut self, settings: &RemoverSettings) -> Result<Option<Duration>> {
        if self.initialized {
            return Ok(None);
        }
        self.init_attempts += 1;

        if self.init_failures_left > 0 {
            self.init_failures_left -= 1;
            return Err(EraseError::processing("Mock backend initialization failed"));
        }

        self.preprocessing = PreprocessingConfig::from(settings);
        self.initialized = true;
        Ok(Some(Duration::from_millis(1)))
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        self.inference_calls += 1;

        if !self.initialized {
            return Err(EraseError::processing("Mock backend not initialized"));
        }
        if self.fail_inference {
            return Err(EraseError::processing("Mock backend inference failed"));
        }

        let shape = input.shape();
        let (height, width) = (
            shape.get(2).copied().unwrap_or(0),
            shape.get(3).copied().unwrap_or(0),
        );
        Ok(Self::ellipse(height, width))
    }

    fn preprocessing_config(&self) -> PreprocessingConfig {
        self.preprocessing.clone()
    }

    fn model_info(&self) -> Option<ModelInfo> {
        let size = self.preprocessing.target_size[0] as usize;
        self.initialized.then(|| ModelInfo {
            name: "mock-ellipse".to_string(),
            size_bytes: 0,
            input_shape: (1, 3, size, size),
            output_shape: (1, 1, size, size),
        })
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Remover that always returns the same image, ignoring its input
#[derive(Debug, Clone)]
pub struct FixedRemover {
    png: Vec<u8>,
    calls: usize,
}

impl FixedRemover {
    /// Remover answering every call with `image`
    ///
    /// # Errors
    /// - `image` cannot be encoded
    pub fn new(image: &RgbaImage) -> Result<Self> {
        Ok(Self {
            png: OutputFormatHandler::encode(image, OutputFormat::Png)?,
            calls: 0,
        })
    }

    /// Remover answering with raw bytes, which need not be a valid image
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            png: bytes,
            calls: 0,
        }
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl BackgroundRemover for FixedRemover {
    fn remove_background(&mut self, _png_bytes: &[u8]) -> Result<Vec<u8>> {
        self.calls += 1;
        Ok(self.png.clone())
    }
}

/// Remover that fails a number of times, then passes its input through
#[derive(Debug, Clone)]
pub struct FailingRemover {
    failures_left: Option<usize>,
}

impl FailingRemover {
    /// Remover that always fails
    #[must_use]
    pub fn new() -> Self {
        Self {
            failures_left: None,
        }
    }

    /// Remover that fails `failures` times, then behaves like [`PassthroughRemover`]
    #[must_use]
    pub fn times(failures: usize) -> Self {
        Self {
            failures_left: Some(failures),
        }
    }
}

impl Default for FailingRemover {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundRemover for FailingRemover {
    fn remove_background(&mut self, png_bytes: &[u8]) -> Result<Vec<u8>> {
        match &mut self.failures_left {
            Some(0) => PassthroughRemover.remove_background(png_bytes),
            Some(left) => {
                *left -= 1;
                Err(EraseError::processing("Background removal service unavailable"))
            },
            None => Err(EraseError::processing("Background removal service unavailable")),
        }
    }
}

/// Remover that returns its input unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRemover;

impl BackgroundRemover for PassthroughRemover {
    fn remove_background(&mut self, png_bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(png_bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_backend_ellipse() {
        let mut backend = MockBackend::new();
        assert!(backend.model_info().is_none());
        backend
            .initialize(&RemoverSettings {
                target_size: 32,
                ..RemoverSettings::default()
            })
            .unwrap();

        let output = backend.infer(&Array4::zeros((1, 3, 32, 32))).unwrap();
        assert_eq!(output.shape(), &[1, 1, 32, 32]);
        assert_eq!(output[[0, 0, 16, 16]], 1.0);
        assert_eq!(output[[0, 0, 0, 0]], 0.0);
        assert_eq!(backend.model_info().unwrap().output_shape, (1, 1, 32, 32));
        assert_eq!(backend.preprocessing_config().target_size, [32, 32]);
    }

    #[test]
    fn test_mock_backend_requires_initialization() {
        let mut backend = MockBackend::new();
        assert!(backend.infer(&Array4::zeros((1, 3, 8, 8))).is_err());
    }

    #[test]
    fn test_failing_remover_recovers() {
        let mut remover = FailingRemover::times(1);
        assert!(remover.remove_background(b"x").is_err());
        assert_eq!(remover.remove_background(b"x").unwrap(), b"x");

        let mut always = FailingRemover::new();
        for _ in 0..3 {
            assert!(matches!(
                always.remove_background(b"x").unwrap_err(),
                EraseError::Processing(_)
            ));
        }
    }

    #[test]
    fn test_fixed_remover_counts_calls() {
        let mut remover = FixedRemover::from_bytes(vec![1, 2, 3]);
        assert_eq!(remover.remove_background(b"ignored").unwrap(), vec![1, 2, 3]);
        assert_eq!(remover.calls(), 1);
    }
}
