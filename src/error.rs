//! Error types for background removal and manual erase operations

use thiserror::Error;

/// Result type alias for erase session operations
pub type Result<T> = std::result::Result<T, EraseError>;

/// Error taxonomy for the erase session
///
/// Every variant is recoverable at the step boundary that produced it: the
/// session keeps its previous state and the user can retry the action.
#[derive(Error, Debug)]
pub enum EraseError {
    /// Uploaded image is corrupt or not a supported format (PNG, JPEG)
    #[error("Decode error: {0}")]
    Decode(String),

    /// Background removal model failed
    #[error("Processing error: {0}")]
    Processing(String),

    /// Overlay and base image dimensions differ
    #[error(
        "Dimension mismatch: expected {}x{}, got {}x{}",
        expected.0, expected.1, actual.0, actual.1
    )]
    DimensionMismatch {
        /// Dimensions of the base image
        expected: (u32, u32),
        /// Dimensions of the offending overlay or mask
        actual: (u32, u32),
    },

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Output encoding failures
    #[error("Encode error: {0}")]
    Encode(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EraseError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a dimension mismatch error
    #[must_use]
    pub fn dimension_mismatch(expected: (u32, u32), actual: (u32, u32)) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }

    /// Short, non-fatal notice suitable for showing to the user
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Decode(_) => "Could not read the uploaded image. Please upload a PNG or JPEG file.",
            Self::Processing(_) => {
                "Background removal failed. The original image is still available; try again."
            },
            Self::DimensionMismatch { .. } => {
                "The drawing does not match the image size. Nothing was erased."
            },
            Self::InvalidConfig(_) => "Invalid settings. Please check the brush and model options.",
            Self::Encode(_) => "Could not prepare the image for download.",
            Self::Io(_) => "A file could not be read or written.",
        }
    }
}
