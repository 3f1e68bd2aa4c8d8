#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

//! # Background Eraser
//!
//! Background removal with brush-based manual touch-up.
//!
//! A user uploads a PNG or JPEG photo, an ONNX segmentation model removes the
//! background, and the user may then paint strokes over regions the model left
//! behind. Applying the strokes erases every painted pixel to fully transparent
//! black, producing a cleaned image that can be downloaded as a lossless file.
//!
//! ## Features
//!
//! - **Automatic removal**: `ISNet`-style segmentation through the pure Rust Tract backend
//! - **Erase touch-up**: freehand brush strokes (5-50 px) rasterized into an overlay
//! - **Deterministic compositing**: painted pixels become exactly `(0, 0, 0, 0)`
//! - **Lossless export**: PNG (default) or TIFF with alpha
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bg_eraser::{BrushStroke, ModelRemover, Session, SessionConfig, TractBackend};
//! use bg_eraser::services::Artifact;
//!
//! # fn example(photo: &[u8]) -> anyhow::Result<()> {
//! let config = SessionConfig::default();
//! let remover = ModelRemover::new(TractBackend::new(), config.remover.clone());
//! let mut session = Session::new(config, Box::new(remover))?;
//!
//! session.upload(photo)?;
//! session.start_edit();
//! session.add_stroke(BrushStroke::new(vec![(10.0, 10.0), (40.0, 40.0)], 15))?;
//! session.apply_erase(None)?;
//!
//! if let Some(download) = session.download(Artifact::Cleaned)? {
//!     std::fs::write(&download.file_name, &download.bytes)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Compositing without a session
//!
//! ```rust
//! use bg_eraser::{compositor, Channel, StrokeOverlay};
//! use image::{Rgba, RgbaImage};
//!
//! let base = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
//! let mut painted = RgbaImage::new(4, 4);
//! painted.put_pixel(1, 1, Rgba([255, 0, 0, 255]));
//!
//! let mask = compositor::derive_mask(&StrokeOverlay::new(painted), Channel::Red);
//! let cleaned = compositor::apply_erase_mask(&base, &mask).unwrap();
//! assert_eq!(cleaned.image().get_pixel(1, 1).0, [0, 0, 0, 0]);
//! assert_eq!(cleaned.image().get_pixel(0, 0).0, [10, 20, 30, 255]);
//! ```
//!
//! ### Feature Flags
//!
//! - `tract` (default): Pure Rust ONNX backend
//! - `cli` (default): Command-line interface and progress reporting
//! - `tracing-json`: JSON log output for the CLI
//! - `tracing-files`: Log file output for the CLI

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compositor;
pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod paint;
pub mod remover;
pub mod services;
pub mod session;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use backends::*;
pub use compositor::MaskCompositor;
pub use config::{BrushSettings, Channel, OutputFormat, RemoverSettings, SessionConfig};
pub use error::{EraseError, Result};
pub use inference::InferenceBackend;
pub use models::{ModelInfo, PreprocessingConfig};
pub use paint::{BrushStroke, PaintSurface};
pub use remover::{BackgroundRemover, ModelRemover};
pub use services::{
    Artifact, ConsoleProgressReporter, ImageIOService, NoOpProgressReporter, OutputFormatHandler,
    ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate,
};
pub use session::{Download, EditMode, Session};
pub use types::{CleanedImage, EraseMask, RemovedBgImage, SourceImage, StrokeOverlay};
pub use utils::{ImagePreprocessor, Letterbox, PreprocessingOptions};

#[cfg(feature = "cli")]
pub use tracing_config::{spans, TracingConfig, TracingFormat, TracingOutput};
