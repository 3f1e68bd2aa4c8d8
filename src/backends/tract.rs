//! Tract backend for ONNX segmentation models
//!
//! Pure Rust inference with no native dependencies. The model is read from a
//! local ONNX file and optimized for the configured square input size.

use crate::{
    config::RemoverSettings,
    error::{EraseError, Result},
    inference::InferenceBackend,
    models::{self, ModelInfo, PreprocessingConfig},
};
use instant::{Duration, Instant};
use ndarray::Array4;
use std::path::PathBuf;
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Tract backend running an ISNet-style model from disk
#[derive(Debug, Default)]
pub struct TractBackend {
    model: Option<TractModel>,
    preprocessing: Option<PreprocessingConfig>,
    info: Option<ModelInfo>,
    model_path: Option<PathBuf>,
}

impl TractBackend {
    /// Create an uninitialized backend; the model path comes from the settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the loaded model, once initialized
    #[must_use]
    pub fn model_path(&self) -> Option<&PathBuf> {
        self.model_path.as_ref()
    }

    fn load_model(&mut self, settings: &RemoverSettings) -> Result<Duration> {
        let model_load_start = Instant::now();
        let path = models::resolve_model_path(settings)?;
        let size = settings.target_size as usize;

        log::info!("Loading segmentation model from {}", path.display());
        let size_bytes = std::fs::metadata(&path)
            .map_err(|e| EraseError::file_io_error("read model metadata", &path, &e))?
            .len();

        let model = onnx()
            .model_for_path(&path)
            .map_err(|e| EraseError::processing(format!("Failed to load ONNX model: {e}")))?
            .with_input_fact(0, f32::fact([1, 3, size, size]).into())
            .map_err(|e| EraseError::processing(format!("Failed to set model input shape: {e}")))?
            .into_optimized()
            .map_err(|e| EraseError::processing(format!("Failed to optimize model: {e}")))?
            .into_runnable()
            .map_err(|e| {
                EraseError::processing(format!("Failed to create runnable model: {e}"))
            })?;

        self.info = Some(ModelInfo {
            name: path
                .file_stem()
                .map_or_else(|| "model".to_string(), |s| s.to_string_lossy().into_owned()),
            size_bytes,
            input_shape: (1, 3, size, size),
            output_shape: (1, 1, size, size),
        });
        self.preprocessing = Some(PreprocessingConfig::from(settings));
        self.model = Some(model);
        self.model_path = Some(path);

        Ok(model_load_start.elapsed())
    }
}

impl InferenceBackend for TractBackend {
    fn initialize(&mut self, settings: &RemoverSettings) -> Result<Option<Duration>> {
        if self.model.is_some() {
            return Ok(None);
        }
        self.load_model(settings).map(Some)
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| EraseError::processing("Tract model not initialized"))?;

        log::debug!("Running Tract inference on {:?}", input.shape());
        let input_tensor = Tensor::from(input.clone());

        let outputs = model
            .run(tvec![input_tensor.into()])
            .map_err(|e| EraseError::processing(format!("Tract inference failed: {e}")))?;

        // ISNet emits several side outputs; the first is the fused matte
        let output_tensor = outputs
            .into_iter()
            .next()
            .ok_or_else(|| EraseError::processing("No output tensor found"))?
            .into_arc_tensor();

        let output_data = output_tensor.to_array_view::<f32>().map_err(|e| {
            EraseError::processing(format!("Failed to convert output tensor: {e}"))
        })?;

        output_data
            .to_owned()
            .into_dimensionality::<ndarray::Ix4>()
            .map_err(|e| EraseError::processing(format!("Expected 4D output tensor: {e}")))
    }

    fn preprocessing_config(&self) -> PreprocessingConfig {
        self.preprocessing
            .clone()
            .unwrap_or_else(|| PreprocessingConfig::from(&RemoverSettings::default()))
    }

    fn model_info(&self) -> Option<ModelInfo> {
        self.info.clone()
    }

    fn is_initialized(&self) -> bool {
        self.model.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_backend_is_uninitialized() {
        let mut backend = TractBackend::new();
        assert!(!backend.is_initialized());
        assert!(backend.model_info().is_none());
        assert_eq!(backend.preprocessing_config().target_size, [1024, 1024]);
        assert!(backend.infer(&Array4::zeros((1, 3, 4, 4))).is_err());
    }

    #[test]
    fn test_missing_model_fails_without_initializing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = RemoverSettings {
            model_path: Some(dir.path().join("absent.onnx")),
            ..RemoverSettings::default()
        };

        let mut backend = TractBackend::new();
        assert!(backend.initialize(&settings).is_err());
        assert!(!backend.is_initialized());
    }

    #[test]
    fn test_invalid_model_file_is_processing_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.onnx");
        std::fs::write(&path, b"not an onnx model").unwrap();

        let settings = RemoverSettings {
            model_path: Some(path),
            ..RemoverSettings::default()
        };
        let err = TractBackend::new().initialize(&settings).unwrap_err();
        assert!(matches!(err, EraseError::Processing(_)));
    }
}
