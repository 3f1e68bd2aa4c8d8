//! Inference backend abstraction

use crate::{
    config::RemoverSettings,
    error::Result,
    models::{ModelInfo, PreprocessingConfig},
};
use ndarray::Array4;

// Use instant crate for cross-platform time compatibility
use instant::Duration;

/// Trait for segmentation model backends
pub trait InferenceBackend {
    /// Load the model described by `settings`
    ///
    /// Returns the load time, or `None` if the backend was already initialized.
    ///
    /// # Errors
    /// - Model file missing or unreadable
    /// - Model cannot be optimized for the configured input size
    fn initialize(&mut self, settings: &RemoverSettings) -> Result<Option<Duration>>;

    /// Run inference on an NCHW input tensor, returning a `1x1xHxW` matte
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Model inference failures
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Preprocessing the model expects
    fn preprocessing_config(&self) -> PreprocessingConfig;

    /// Metadata about the loaded model, if any
    fn model_info(&self) -> Option<ModelInfo>;

    fn is_initialized(&self) -> bool;
}
