//! Background eraser CLI
//!
//! Removes the background from one image and optionally applies erase strokes,
//! writing `bg_removed.png` and `cleaned.png`.

use super::config::CliConfigBuilder;
use crate::{
    error::EraseError,
    paint::BrushStroke,
    remover::BackgroundRemover,
    services::{Artifact, ProcessingStage, ProgressReporter, ProgressTracker, ProgressUpdate},
    session::Session,
    tracing_config::{spans, TracingConfig, TracingFormat},
    types::StrokeOverlay,
    SessionConfig,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Instrument;

/// Background removal with manual erase touch-up
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bg-eraser")]
pub struct Cli {
    /// Input image (PNG or JPEG)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Directory for bg_removed.png and cleaned.png
    #[arg(short, long, value_name = "OUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// ONNX segmentation model [default: <cache dir>/bg-eraser/models/isnet-general.onnx]
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Session configuration file (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Erase strokes as JSON: [{"points": [[x, y], ...], "width": 15}, ...]
    #[arg(long, value_name = "FILE", conflicts_with = "overlay")]
    pub strokes: Option<PathBuf>,

    /// Pre-rendered stroke overlay (PNG, same size as the input)
    #[arg(long, value_name = "FILE")]
    pub overlay: Option<PathBuf>,

    /// Brush width in pixels (5-50)
    #[arg(long, value_name = "N")]
    pub brush_size: Option<u32>,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = CliLogFormat::Console)]
    pub log_format: CliLogFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliLogFormat {
    Console,
    Compact,
    #[cfg(feature = "tracing-json")]
    Json,
}

impl From<CliLogFormat> for TracingFormat {
    fn from(format: CliLogFormat) -> Self {
        match format {
            CliLogFormat::Console => Self::Console,
            CliLogFormat::Compact => Self::Compact,
            #[cfg(feature = "tracing-json")]
            CliLogFormat::Json => Self::Json,
        }
    }
}

/// Forwards session progress to an indicatif spinner
struct SpinnerReporter {
    spinner: ProgressBar,
}

impl ProgressReporter for SpinnerReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        if update.stage == ProcessingStage::Completed {
            self.spinner.set_message("Done");
        } else {
            self.spinner.set_message(format!("{}...", update.description));
        }
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        self.spinner
            .println(format!("Error during {}: {}", stage.description(), error));
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let session_id = uuid::Uuid::new_v4().to_string();
    TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(cli.log_format.into())
        .with_session_id(session_id.clone())
        .init()
        .context("Failed to initialize tracing")?;

    let span = spans::session(&session_id, &cli.input);
    run(cli).instrument(span).await
}

async fn run(cli: Cli) -> Result<()> {
    CliConfigBuilder::validate_cli(&cli).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;

    let input_bytes = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let strokes = match &cli.strokes {
        Some(path) => Some(load_strokes(path, config.brush.width).await?),
        None => None,
    };
    let overlay = match &cli.overlay {
        Some(path) => Some(load_overlay(path).await?),
        None => None,
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed}]")
            .context("Invalid progress template")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let progress = ProgressTracker::new(Box::new(SpinnerReporter {
        spinner: spinner.clone(),
    }));
    let mut session = Session::with_progress(config.clone(), create_remover(&config)?, progress)
        .context("Failed to create session")?;

    let result = run_session(&mut session, &cli, &input_bytes, strokes, overlay.as_ref()).await;
    spinner.finish_and_clear();

    if let Err(e) = &result {
        if let Some(erase_error) = e.downcast_ref::<EraseError>() {
            eprintln!("{}", erase_error.user_message());
        }
    }
    result
}

async fn run_session(
    session: &mut Session,
    cli: &Cli,
    input_bytes: &[u8],
    strokes: Option<Vec<BrushStroke>>,
    overlay: Option<&StrokeOverlay>,
) -> Result<()> {
    let removed = session
        .upload(input_bytes)
        .with_context(|| format!("Failed to remove background from {}", cli.input.display()))?;
    let (width, height) = removed.dimensions();
    info!("Background removed ({}x{})", width, height);

    write_artifact(session, Artifact::BgRemoved, &cli.output_dir).await?;

    if strokes.is_none() && overlay.is_none() {
        return Ok(());
    }

    session.start_edit();
    for stroke in strokes.into_iter().flatten() {
        session.add_stroke(stroke).context("Invalid stroke")?;
    }

    let committed = session
        .apply_erase(overlay)
        .context("Failed to apply erase strokes")?
        .is_some();

    if committed {
        write_artifact(session, Artifact::Cleaned, &cli.output_dir).await?;
    } else {
        warn!("No painted pixels in the strokes; cleaned image not written");
    }
    session.cancel_edit();

    Ok(())
}

#[cfg(feature = "tract")]
fn create_remover(config: &SessionConfig) -> Result<Box<dyn BackgroundRemover>> {
    use crate::{backends::TractBackend, remover::ModelRemover};

    Ok(Box::new(ModelRemover::new(
        TractBackend::new(),
        config.remover.clone(),
    )))
}

#[cfg(not(feature = "tract"))]
fn create_remover(_config: &SessionConfig) -> Result<Box<dyn BackgroundRemover>> {
    anyhow::bail!("No model backend available. Rebuild with --features tract")
}

async fn write_artifact(session: &mut Session, artifact: Artifact, output_dir: &Path) -> Result<()> {
    let download = session
        .download(artifact)?
        .with_context(|| format!("{artifact:?} image is not available"))?;

    tokio::fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let path = output_dir.join(&download.file_name);
    tokio::fs::write(&path, &download.bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Wrote {} ({})", path.display(), download.mime_type);
    Ok(())
}

async fn load_strokes(path: &Path, default_width: u32) -> Result<Vec<BrushStroke>> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    BrushStroke::list_from_json(&json, default_width)
        .with_context(|| format!("Failed to parse strokes from {}", path.display()))
}

async fn load_overlay(path: &Path) -> Result<StrokeOverlay> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let image = image::load_from_memory(&bytes)
        .with_context(|| format!("Failed to decode overlay {}", path.display()))?;
    Ok(StrokeOverlay::new(image.to_rgba8()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["bg-eraser", "photo.jpg"]);
        assert_eq!(cli.input, PathBuf::from("photo.jpg"));
        assert_eq!(cli.output_dir, PathBuf::from("."));
        assert!(cli.model.is_none());
        assert!(cli.strokes.is_none());
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.log_format, CliLogFormat::Console);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "bg-eraser",
            "photo.png",
            "-o",
            "out",
            "--strokes",
            "strokes.json",
            "-vv",
            "--log-format",
            "compact",
        ]);
        assert_eq!(cli.output_dir, PathBuf::from("out"));
        assert_eq!(cli.strokes, Some(PathBuf::from("strokes.json")));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, CliLogFormat::Compact);
    }

    #[tokio::test]
    async fn test_run_session_writes_artifacts() {
        use crate::backends::PassthroughRemover;
        use image::{DynamicImage, Rgba, RgbaImage};

        let dir = tempfile::tempdir().unwrap();
        let input = RgbaImage::from_pixel(30, 30, Rgba([40, 80, 120, 255]));
        let mut input_bytes = Vec::new();
        DynamicImage::ImageRgba8(input)
            .write_to(
                &mut std::io::Cursor::new(&mut input_bytes),
                image::ImageFormat::Png,
            )
            .unwrap();

        let out = dir.path().join("out").to_string_lossy().into_owned();
        let cli = Cli::parse_from(["bg-eraser", "in.png", "-o", out.as_str()]);
        let mut session =
            Session::new(SessionConfig::default(), Box::new(PassthroughRemover)).unwrap();
        let strokes = vec![BrushStroke::new(vec![(15.0, 15.0)], 10)];

        run_session(&mut session, &cli, &input_bytes, Some(strokes), None)
            .await
            .unwrap();

        let out_dir = dir.path().join("out");
        assert!(out_dir.join("bg_removed.png").is_file());
        let cleaned = image::open(out_dir.join("cleaned.png")).unwrap().to_rgba8();
        assert_eq!(cleaned.get_pixel(15, 15).0, [0, 0, 0, 0]);
        assert_eq!(cleaned.get_pixel(0, 0).0, [40, 80, 120, 255]);
    }

    #[tokio::test]
    async fn test_session_span_does_not_leak_across_awaits() {
        use crate::backends::PassthroughRemover;
        use image::{DynamicImage, Rgba, RgbaImage};
        use std::sync::{Arc, Mutex};
        use tracing::span::{Attributes, Id};
        use tracing::Subscriber;
        use tracing_subscriber::{layer::Context, prelude::*, registry::LookupSpan, Layer};

        /// Records each new span with the name of its parent
        #[derive(Clone, Default)]
        struct SpanParents(Arc<Mutex<Vec<(String, Option<String>)>>>);

        impl<S> Layer<S> for SpanParents
        where
            S: Subscriber + for<'a> LookupSpan<'a>,
        {
            fn on_new_span(&self, _attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
                if let Some(span) = ctx.span(id) {
                    let parent = span.parent().map(|p| p.name().to_string());
                    self.0.lock().unwrap().push((span.name().to_string(), parent));
                }
            }
        }

        let recorded = SpanParents::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(recorded.clone()));

        let dir = tempfile::tempdir().unwrap();
        let mut input_bytes = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255])))
            .write_to(
                &mut std::io::Cursor::new(&mut input_bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        let out = dir.path().to_string_lossy().into_owned();
        let cli = Cli::parse_from(["bg-eraser", "in.png", "-o", out.as_str()]);
        let mut session =
            Session::new(SessionConfig::default(), Box::new(PassthroughRemover)).unwrap();

        let span = spans::session("test-session", &cli.input);
        let sibling = async {
            for _ in 0..5 {
                tokio::task::yield_now().await;
                let _span = tracing::info_span!("sibling").entered();
            }
        };
        let (result, ()) = tokio::join!(
            run_session(&mut session, &cli, &input_bytes, None, None).instrument(span),
            sibling
        );
        result.unwrap();

        let recorded = recorded.0.lock().unwrap();
        let upload = recorded.iter().find(|(name, _)| name == "upload").unwrap();
        assert_eq!(upload.1.as_deref(), Some("session"));
        let siblings: Vec<_> = recorded.iter().filter(|(name, _)| name == "sibling").collect();
        assert_eq!(siblings.len(), 5);
        assert!(siblings.iter().all(|(_, parent)| parent.is_none()));
    }
}
