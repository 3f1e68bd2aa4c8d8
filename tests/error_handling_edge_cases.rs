//! Error handling and edge case testing
//!
//! Error conditions, boundary values and degenerate inputs across the
//! configuration, paint surface, I/O and model layers.

use bg_eraser::{
    backends::PassthroughRemover,
    config::{BrushSettings, MAX_BRUSH_WIDTH, MIN_BRUSH_WIDTH},
    error::{EraseError, Result},
    models::resolve_model_path,
    BrushStroke, ImageIOService, PaintSurface, RemoverSettings, Session, SessionConfig,
};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use tempfile::TempDir;

#[test]
fn test_brush_width_boundaries() -> Result<()> {
    let config = SessionConfig::builder().brush_width(MIN_BRUSH_WIDTH).build()?;
    assert_eq!(config.brush.width, 5);

    let config = SessionConfig::builder().brush_width(MAX_BRUSH_WIDTH).build()?;
    assert_eq!(config.brush.width, 50);

    for width in [0, 4, 51, 500] {
        let err = SessionConfig::builder().brush_width(width).build().unwrap_err();
        assert!(matches!(err, EraseError::InvalidConfig(_)));
        assert!(err.to_string().contains("brush width"));
        assert!(err.to_string().contains("5-50"));
    }

    // Manually corrupted config is caught at session creation
    let mut config = SessionConfig::default();
    config.brush.width = 1;
    assert!(Session::new(config, Box::new(PassthroughRemover)).is_err());

    Ok(())
}

#[test]
fn test_remover_settings_validation() {
    let mut config = SessionConfig::default();
    config.remover.target_size = 0;
    assert!(config.validate().is_err());

    let mut config = SessionConfig::default();
    config.remover.normalization_std = [1.0, 0.0, 1.0];
    assert!(config.validate().is_err());
}

#[test]
fn test_stroke_json_edge_cases() -> Result<()> {
    let strokes = BrushStroke::list_from_json("[]", 15)?;
    assert!(strokes.is_empty());

    let strokes = BrushStroke::list_from_json(
        r#"[{"points": [[1.5, 2.5]]}, {"points": [], "width": 40}]"#,
        20,
    )?;
    assert_eq!(strokes.len(), 2);
    assert_eq!(strokes[0].width, 20);
    assert_eq!(strokes[1].width, 40);
    assert!(strokes[1].points.is_empty());

    assert!(BrushStroke::list_from_json("{not json", 15).is_err());
    assert!(BrushStroke::list_from_json(r#"[{"width": 10}]"#, 15).is_err());
    Ok(())
}

#[test]
fn test_strokes_outside_canvas_are_clipped() -> Result<()> {
    let mut surface = PaintSurface::new(10, 10, BrushSettings::default())?;
    surface.add_stroke(BrushStroke::new(vec![(-50.0, -50.0), (-20.0, -30.0)], 10))?;
    surface.add_stroke(BrushStroke::new(vec![(500.0, 5.0)], 10))?;
    surface.add_stroke(BrushStroke::new(Vec::new(), 10))?;

    let overlay = surface.rasterize();
    assert_eq!(overlay.dimensions(), (10, 10));
    assert!(overlay.image().pixels().all(|p| p.0 == [0, 0, 0, 0]));

    // A stroke crossing the edge paints only the visible part
    surface.add_stroke(BrushStroke::new(vec![(-5.0, 5.0), (3.0, 5.0)], 6))?;
    let overlay = surface.rasterize();
    assert_eq!(overlay.image().get_pixel(0, 5).0[0], 255);
    assert_eq!(overlay.image().get_pixel(9, 5).0[0], 0);
    Ok(())
}

#[test]
fn test_zero_sized_surface_is_rejected() {
    assert!(PaintSurface::new(0, 10, BrushSettings::default()).is_err());
    assert!(PaintSurface::new(10, 0, BrushSettings::default()).is_err());
}

#[test]
fn test_single_pixel_image_workflow() -> Result<()> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(RgbaImage::new(1, 1))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| EraseError::encode(e.to_string()))?;

    let mut session = Session::new(SessionConfig::default(), Box::new(PassthroughRemover))?;
    session.upload(&bytes)?;
    session.start_edit();
    session.add_stroke(BrushStroke::new(vec![(0.5, 0.5)], 5))?;
    let cleaned = session.apply_erase(None)?.map(|c| c.image().clone());
    assert_eq!(cleaned.map(|c| c.get_pixel(0, 0).0), Some([0, 0, 0, 0]));
    Ok(())
}

#[test]
fn test_unsupported_upload_formats() {
    let image = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
    for format in [ImageFormat::Tiff, ImageFormat::Bmp] {
        let mut bytes = Vec::new();
        if image.write_to(&mut Cursor::new(&mut bytes), format).is_err() {
            // Encoder not compiled in; nothing to check for this format
            continue;
        }
        let err = ImageIOService::load_source(&bytes).unwrap_err();
        assert!(matches!(err, EraseError::Decode(_)), "{format:?} should be rejected");
    }

    assert!(matches!(
        ImageIOService::load_source(&[]),
        Err(EraseError::Decode(_))
    ));
}

#[test]
fn test_missing_model_is_processing_error() {
    let temp_dir = TempDir::new().unwrap();
    let settings = RemoverSettings {
        model_path: Some(temp_dir.path().join("nope.onnx")),
        ..RemoverSettings::default()
    };
    let err = resolve_model_path(&settings).unwrap_err();
    assert!(matches!(err, EraseError::Processing(_)));
    assert!(err.to_string().contains("nope.onnx"));
}

#[test]
fn test_file_errors_carry_context() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing.png");

    let err = ImageIOService::load_source_file(&missing).unwrap_err();
    assert!(matches!(err, EraseError::Io(_)));
    assert!(err.to_string().contains("missing.png"));

    let err = SessionConfig::from_json_file(&missing).unwrap_err();
    assert!(matches!(err, EraseError::Io(_)));
}

#[test]
fn test_user_messages_are_non_technical() {
    let errors = [
        EraseError::decode("bad magic"),
        EraseError::processing("tensor shape"),
        EraseError::dimension_mismatch((10, 10), (10, 9)),
        EraseError::invalid_config("width"),
        EraseError::encode("png"),
    ];
    for error in &errors {
        let message = error.user_message();
        assert!(!message.is_empty());
        assert!(!message.contains("tensor"));
    }
    assert!(errors[2].to_string().contains("10x10"));
    assert!(errors[2].to_string().contains("10x9"));
}
