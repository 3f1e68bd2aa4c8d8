//! Configuration types for the erase session

use crate::error::{EraseError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Smallest brush width offered by the paint surface
pub const MIN_BRUSH_WIDTH: u32 = 5;
/// Largest brush width offered by the paint surface
pub const MAX_BRUSH_WIDTH: u32 = 50;
/// Brush width used when none is configured
pub const DEFAULT_BRUSH_WIDTH: u32 = 15;
/// Stroke colour used by the paint surface (opaque red)
pub const DEFAULT_STROKE_COLOR: [u8; 4] = [255, 0, 0, 255];

/// Output image format options
///
/// Only lossless formats with an alpha channel are offered, so erased pixels
/// survive the download exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    #[default]
    Png,
    /// TIFF with alpha channel transparency and lossless compression
    Tiff,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Tiff => write!(f, "tiff"),
        }
    }
}

/// Colour channel the paint surface renders strokes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Red,
    Green,
    Blue,
    Alpha,
}

impl Channel {
    /// Index of this channel inside an RGBA pixel
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
            Self::Alpha => 3,
        }
    }
}

/// Brush settings for the paint surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrushSettings {
    /// Stroke width in pixels (5-50)
    pub width: u32,
    /// RGBA stroke colour
    pub color: [u8; 4],
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_BRUSH_WIDTH,
            color: DEFAULT_STROKE_COLOR,
        }
    }
}

impl BrushSettings {
    /// Validate the brush width range
    ///
    /// # Errors
    /// - Width outside `MIN_BRUSH_WIDTH..=MAX_BRUSH_WIDTH`
    pub fn validate(&self) -> Result<()> {
        if !(MIN_BRUSH_WIDTH..=MAX_BRUSH_WIDTH).contains(&self.width) {
            return Err(EraseError::config_value_error(
                "brush width",
                self.width,
                "5-50",
                Some(DEFAULT_BRUSH_WIDTH),
            ));
        }
        Ok(())
    }
}

/// Settings for the model-backed background remover
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoverSettings {
    /// Path to an ONNX segmentation model (None = default cache location)
    pub model_path: Option<PathBuf>,
    /// Square input size expected by the model
    pub target_size: u32,
    /// Per-channel normalization mean (RGB, 0-1 range)
    pub normalization_mean: [f32; 3],
    /// Per-channel normalization standard deviation (RGB, 0-1 range)
    pub normalization_std: [f32; 3],
}

impl Default for RemoverSettings {
    fn default() -> Self {
        // ISNet general-use defaults
        Self {
            model_path: None,
            target_size: 1024,
            normalization_mean: [0.5, 0.5, 0.5],
            normalization_std: [1.0, 1.0, 1.0],
        }
    }
}

/// Configuration for one erase session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionConfig {
    /// Brush used by the paint surface
    pub brush: BrushSettings,
    /// Overlay channel that signals painted pixels
    pub mask_channel: Channel,
    /// Format used for downloads
    pub output_format: OutputFormat,
    /// Background remover settings
    pub remover: RemoverSettings,
}

impl SessionConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bg_eraser::SessionConfig;
    ///
    /// let config = SessionConfig::builder()
    ///     .brush_width(25)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.brush.width, 25);
    /// ```
    #[must_use]
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Load configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    /// - File cannot be read
    /// - Invalid JSON
    /// - Values fail validation
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref)
            .map_err(|e| EraseError::file_io_error("read config file", path_ref, &e))?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            EraseError::invalid_config(format!(
                "Failed to parse config '{}': {}",
                path_ref.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Brush width outside 5-50
    /// - Zero model target size
    /// - Non-positive normalization standard deviation
    pub fn validate(&self) -> Result<()> {
        self.brush.validate()?;

        if self.remover.target_size == 0 {
            return Err(EraseError::config_value_error(
                "model target size",
                self.remover.target_size,
                "1-4096",
                Some(1024),
            ));
        }

        if self.remover.normalization_std.iter().any(|s| *s <= 0.0) {
            return Err(EraseError::invalid_config(
                "Normalization std values must be positive",
            ));
        }

        Ok(())
    }
}

/// Builder for `SessionConfig`
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Set brush width (validated at build time)
    #[must_use]
    pub fn brush_width(mut self, width: u32) -> Self {
        self.config.brush.width = width;
        self
    }

    /// Set stroke colour
    #[must_use]
    pub fn stroke_color(mut self, color: [u8; 4]) -> Self {
        self.config.brush.color = color;
        self
    }

    /// Set the overlay channel that marks painted pixels
    #[must_use]
    pub fn mask_channel(mut self, channel: Channel) -> Self {
        self.config.mask_channel = channel;
        self
    }

    /// Set output format
    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Set model path
    #[must_use]
    pub fn model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config.remover.model_path = Some(path.into());
        self
    }

    /// Set model input size
    #[must_use]
    pub fn target_size(mut self, size: u32) -> Self {
        self.config.remover.target_size = size;
        self
    }

    /// Set normalization parameters
    #[must_use]
    pub fn normalization(mut self, mean: [f32; 3], std: [f32; 3]) -> Self {
        self.config.remover.normalization_mean = mean;
        self.config.remover.normalization_std = std;
        self
    }

    /// Build the configuration with validation
    ///
    /// # Errors
    /// - Any value rejected by [`SessionConfig::validate`]
    pub fn build(self) -> Result<SessionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
