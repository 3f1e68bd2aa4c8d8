//! Segmentation model metadata and location

use crate::{
    config::RemoverSettings,
    error::{EraseError, Result},
};
use std::path::{Path, PathBuf};

/// File name of the default segmentation model inside the cache directory
pub const DEFAULT_MODEL_FILE: &str = "isnet-general.onnx";

/// Preprocessing parameters a model expects
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingConfig {
    /// Square input size (width, height)
    pub target_size: [u32; 2],
    pub normalization_mean: [f32; 3],
    pub normalization_std: [f32; 3],
}

impl From<&RemoverSettings> for PreprocessingConfig {
    fn from(settings: &RemoverSettings) -> Self {
        Self {
            target_size: [settings.target_size, settings.target_size],
            normalization_mean: settings.normalization_mean,
            normalization_std: settings.normalization_std,
        }
    }
}

/// Metadata about a loaded model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub size_bytes: u64,
    pub input_shape: (usize, usize, usize, usize), // NCHW format
    pub output_shape: (usize, usize, usize, usize),
}

/// Default model location: `<cache dir>/bg-eraser/models/isnet-general.onnx`
///
/// Returns `None` on platforms without a user cache directory.
#[must_use]
pub fn default_model_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("bg-eraser").join("models").join(DEFAULT_MODEL_FILE))
}

/// Resolve the model file for `settings`, falling back to the default location
///
/// # Errors
/// - No path configured and no cache directory available
/// - The resolved file does not exist
pub fn resolve_model_path(settings: &RemoverSettings) -> Result<PathBuf> {
    let path = match &settings.model_path {
        Some(path) => path.clone(),
        None => default_model_path().ok_or_else(|| {
            EraseError::invalid_config(
                "Failed to determine cache directory. Pass a model path explicitly.",
            )
        })?,
    };

    ensure_model_file(&path)?;
    Ok(path)
}

fn ensure_model_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(EraseError::processing(format!(
            "Model file not found: {}. Download an ONNX segmentation model (e.g. ISNet) and pass its path.",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocessing_config_from_settings() {
        let settings = RemoverSettings {
            target_size: 320,
            ..RemoverSettings::default()
        };
        let config = PreprocessingConfig::from(&settings);
        assert_eq!(config.target_size, [320, 320]);
        assert_eq!(config.normalization_mean, [0.5, 0.5, 0.5]);
        assert_eq!(config.normalization_std, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_default_model_path_layout() {
        if let Some(path) = default_model_path() {
            assert!(path.ends_with("bg-eraser/models/isnet-general.onnx"));
        }
    }

    #[test]
    fn test_resolve_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.onnx");

        let settings = RemoverSettings {
            model_path: Some(model.clone()),
            ..RemoverSettings::default()
        };
        let err = resolve_model_path(&settings).unwrap_err();
        assert!(matches!(err, EraseError::Processing(_)));
        assert!(err.to_string().contains("model.onnx"));

        std::fs::write(&model, b"onnx").unwrap();
        assert_eq!(resolve_model_path(&settings).unwrap(), model);
    }
}
