//! Interactive erase session
//!
//! A [`Session`] owns every in-memory entity for one user: the uploaded source,
//! the background-removed image, the latest cleaned image and the paint surface.
//! Each public method is one discrete user action. Errors are reported at the
//! action boundary and leave the previously committed state intact.
//!
//! Edit mode is an explicit [`EditMode`] value with pure transition functions,
//! so the state machine can be tested without a session.

use crate::{
    compositor::{apply_erase_mask, MaskCompositor},
    config::SessionConfig,
    error::{EraseError, Result},
    paint::{BrushStroke, PaintSurface},
    remover::BackgroundRemover,
    services::{Artifact, ImageIOService, OutputFormatHandler, ProcessingStage, ProgressTracker},
    types::{CleanedImage, RemovedBgImage, SourceImage, StrokeOverlay},
};
use log::{debug, info, warn};
use tracing::instrument;

/// Whether the paint surface and apply/cancel controls are active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    /// Looking at the results; no paint surface
    #[default]
    Viewing,
    /// Painting erase strokes over the background-removed image
    Editing,
}

impl EditMode {
    /// "Start edit" action; only enabled once a background-removed image exists
    #[must_use]
    pub fn start_edit(self, removed_available: bool) -> Self {
        match self {
            Self::Viewing if removed_available => Self::Editing,
            other => other,
        }
    }

    /// "Cancel" action; always returns to viewing
    #[must_use]
    pub fn cancel(self) -> Self {
        Self::Viewing
    }

    /// "Apply" action; keeps the user editing so strokes can be refined
    #[must_use]
    pub fn apply(self) -> Self {
        self
    }

    #[must_use]
    pub fn is_editing(self) -> bool {
        matches!(self, Self::Editing)
    }
}

/// Encoded artifact ready to hand to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// One user's interactive erase session
pub struct Session {
    config: SessionConfig,
    remover: Box<dyn BackgroundRemover>,
    compositor: MaskCompositor,
    progress: ProgressTracker,
    source: Option<SourceImage>,
    removed: Option<RemovedBgImage>,
    cleaned: Option<CleanedImage>,
    mode: EditMode,
    surface: Option<PaintSurface>,
}

impl Session {
    /// Create a session with a silent progress tracker
    ///
    /// # Errors
    /// - Invalid configuration
    pub fn new(config: SessionConfig, remover: Box<dyn BackgroundRemover>) -> Result<Self> {
        Self::with_progress(config, remover, ProgressTracker::no_op())
    }

    /// Create a session that reports long-running work to `progress`
    ///
    /// # Errors
    /// - Invalid configuration
    pub fn with_progress(
        config: SessionConfig,
        remover: Box<dyn BackgroundRemover>,
        progress: ProgressTracker,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            compositor: MaskCompositor::new(config.mask_channel),
            config,
            remover,
            progress,
            source: None,
            removed: None,
            cleaned: None,
            mode: EditMode::Viewing,
            surface: None,
        })
    }

    /// Upload a new image and remove its background
    ///
    /// A decode failure leaves the session untouched. Otherwise all prior
    /// entities are discarded and the mode resets to viewing; if the remover
    /// then fails, the new source stays available without a removed image.
    ///
    /// # Errors
    /// - `EraseError::Decode` for corrupt or unsupported input
    /// - `EraseError::Processing` if background removal fails
    #[instrument(skip_all, fields(bytes = raw_bytes.len()))]
    pub fn upload(&mut self, raw_bytes: &[u8]) -> Result<&RemovedBgImage> {
        self.progress.report_stage(ProcessingStage::ImageLoading);
        let source = match ImageIOService::load_source(raw_bytes) {
            Ok(source) => source,
            Err(e) => {
                self.progress.report_error(&e.to_string());
                return Err(e);
            },
        };

        let (width, height) = source.dimensions();
        info!("Loaded {}x{} image", width, height);

        self.source = Some(source);
        self.removed = None;
        self.cleaned = None;
        self.surface = None;
        self.mode = EditMode::Viewing;

        self.run_removal()
    }

    /// Re-run background removal on the current source image
    ///
    /// # Errors
    /// - `EraseError::Processing` if no image was uploaded or removal fails
    pub fn retry_removal(&mut self) -> Result<&RemovedBgImage> {
        if self.source.is_none() {
            return Err(EraseError::processing("No image uploaded"));
        }
        self.run_removal()
    }

    fn run_removal(&mut self) -> Result<&RemovedBgImage> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| EraseError::processing("No image uploaded"))?;

        let png_bytes = match OutputFormatHandler::encode_dynamic(source.image()) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.progress.report_error(&e.to_string());
                return Err(e);
            },
        };

        self.progress.report_stage(ProcessingStage::BackgroundRemoval);
        let result = self
            .remover
            .remove_background(&png_bytes)
            .map_err(|e| match e {
                EraseError::Processing(_) => e,
                other => EraseError::processing(other.to_string()),
            })
            .and_then(|bytes| RemovedBgImage::from_png_bytes(&bytes));

        let removed = match result {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Background removal failed: {}", e);
                self.progress.report_error(&e.to_string());
                return Err(e);
            },
        };

        if removed.dimensions() != source.dimensions() {
            let e = EraseError::processing(format!(
                "Background remover changed image size from {:?} to {:?}",
                source.dimensions(),
                removed.dimensions()
            ));
            self.progress.report_error(&e.to_string());
            return Err(e);
        }

        self.progress.report_stage(ProcessingStage::Completed);
        info!("Background removed");
        Ok(self.removed.insert(removed))
    }

    /// "Start edit" action
    ///
    /// Enters editing only when a background-removed image exists, creating a
    /// paint surface sized to it. Returns the resulting mode.
    pub fn start_edit(&mut self) -> EditMode {
        let next = self.mode.start_edit(self.removed.is_some());
        if next.is_editing() && !self.mode.is_editing() {
            if let Some(removed) = &self.removed {
                let (width, height) = removed.dimensions();
                // Brush was validated with the session config
                self.surface = PaintSurface::new(width, height, self.config.brush).ok();
            }
            debug!("Entered edit mode");
        } else if !next.is_editing() {
            debug!("Start edit ignored: no background-removed image yet");
        }
        self.mode = next;
        self.mode
    }

    /// Add a stroke to the paint surface; ignored unless editing
    ///
    /// # Errors
    /// - Stroke width outside 5-50
    /// - Non-finite stroke coordinates
    pub fn add_stroke(&mut self, stroke: BrushStroke) -> Result<()> {
        match (self.mode, self.surface.as_mut()) {
            (EditMode::Editing, Some(surface)) => surface.add_stroke(stroke),
            _ => {
                debug!("Stroke ignored outside edit mode");
                Ok(())
            },
        }
    }

    /// "Apply erase" action
    ///
    /// `overlay` is the paint surface's latest raster snapshot; when `None`,
    /// the session's own strokes are rasterized instead. The base is always
    /// the background-removed image, so each apply re-applies the full set of
    /// strokes. Returns the newly committed cleaned image, or `None` when the
    /// action was disabled or nothing was painted.
    ///
    /// # Errors
    /// - `EraseError::DimensionMismatch` if the overlay does not match the image
    #[instrument(skip_all)]
    pub fn apply_erase(&mut self, overlay: Option<&StrokeOverlay>) -> Result<Option<&CleanedImage>> {
        if !self.mode.is_editing() {
            debug!("Apply ignored outside edit mode");
            return Ok(None);
        }
        let Some(removed) = self.removed.as_ref() else {
            return Ok(None);
        };

        let rasterized;
        let overlay = match (overlay, self.surface.as_ref()) {
            (Some(overlay), _) => overlay,
            (None, Some(surface)) if !surface.is_empty() => {
                rasterized = surface.rasterize();
                &rasterized
            },
            _ => {
                debug!("Apply with no strokes drawn; nothing to erase");
                return Ok(None);
            },
        };

        self.progress.report_stage(ProcessingStage::Compositing);
        let mask = match self.compositor.mask_for(removed.image(), overlay) {
            Ok(mask) => mask,
            Err(e) => {
                self.progress.report_error(&e.to_string());
                return Err(e);
            },
        };

        if mask.is_empty() {
            debug!("Overlay has no painted pixels; keeping previous result");
            return Ok(None);
        }

        let cleaned = apply_erase_mask(removed.image(), &mask)?;
        self.mode = self.mode.apply();
        self.progress.report_stage(ProcessingStage::Completed);
        info!("Erased {} pixels", mask.marked_count());
        Ok(Some(self.cleaned.insert(cleaned)))
    }

    /// "Cancel edit" action
    ///
    /// Returns to viewing and drops in-progress strokes. A previously
    /// committed cleaned image stays available.
    pub fn cancel_edit(&mut self) -> EditMode {
        self.mode = self.mode.cancel();
        self.surface = None;
        debug!("Left edit mode");
        self.mode
    }

    /// Encode an artifact for download
    ///
    /// Returns `None` when the artifact has not been produced yet.
    ///
    /// # Errors
    /// - Encoding failures
    pub fn download(&mut self, artifact: Artifact) -> Result<Option<Download>> {
        let image = match artifact {
            Artifact::BgRemoved => self.removed.as_ref().map(RemovedBgImage::image),
            Artifact::Cleaned => self.cleaned.as_ref().map(CleanedImage::image),
        };
        let Some(image) = image else {
            return Ok(None);
        };

        let format = self.config.output_format;
        self.progress.report_stage(ProcessingStage::Encoding);
        let bytes = match OutputFormatHandler::encode(image, format) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.progress.report_error(&e.to_string());
                return Err(e);
            },
        };
        self.progress.report_stage(ProcessingStage::Completed);
        Ok(Some(Download {
            file_name: artifact.file_name(format),
            mime_type: OutputFormatHandler::mime_type(format),
            bytes,
        }))
    }

    #[must_use]
    pub fn mode(&self) -> EditMode {
        self.mode
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    #[must_use]
    pub fn removed(&self) -> Option<&RemovedBgImage> {
        self.removed.as_ref()
    }

    #[must_use]
    pub fn cleaned(&self) -> Option<&CleanedImage> {
        self.cleaned.as_ref()
    }

    #[must_use]
    pub fn paint_surface(&self) -> Option<&PaintSurface> {
        self.surface.as_ref()
    }

    /// Mutable access to the paint surface while editing
    pub fn paint_surface_mut(&mut self) -> Option<&mut PaintSurface> {
        if self.mode.is_editing() {
            self.surface.as_mut()
        } else {
            None
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("source", &self.source.as_ref().map(SourceImage::dimensions))
            .field("removed", &self.removed.as_ref().map(RemovedBgImage::dimensions))
            .field("cleaned", &self.cleaned.is_some())
            .finish_non_exhaustive()
    }
}
