//! Paint surface for free-hand erase strokes
//!
//! Strokes are kept as vector polylines and rasterized on demand into a
//! [`StrokeOverlay`] sized exactly to the image being edited. The compositor
//! only ever sees the raster.

use crate::{
    config::BrushSettings,
    error::{EraseError, Result},
    types::StrokeOverlay,
};
use image::Rgba;
use serde::{Deserialize, Serialize};

/// One free-hand stroke: ordered pixel coordinates drawn at a fixed width
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushStroke {
    /// Points in image pixel coordinates, in drawing order
    pub points: Vec<(f32, f32)>,
    /// Stroke width in pixels
    pub width: u32,
}

impl BrushStroke {
    #[must_use]
    pub fn new(points: Vec<(f32, f32)>, width: u32) -> Self {
        Self { points, width }
    }

    /// Check that every point is a finite coordinate
    ///
    /// # Errors
    /// - A point contains `NaN` or an infinity
    pub fn validate(&self) -> Result<()> {
        match self
            .points
            .iter()
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            Some(index) => Err(EraseError::invalid_config(format!(
                "Stroke point {index} is not a finite coordinate: {:?}",
                self.points.get(index)
            ))),
            None => Ok(()),
        }
    }

    /// Load strokes from a JSON array
    ///
    /// Each entry has `points` as `[x, y]` pairs and an optional `width`;
    /// strokes without a width use `default_width`.
    ///
    /// # Errors
    /// - Invalid JSON or unexpected shape
    /// - Coordinates that overflow to infinity
    pub fn list_from_json(json: &str, default_width: u32) -> Result<Vec<Self>> {
        let entries: Vec<StrokeEntry> = serde_json::from_str(json)
            .map_err(|e| EraseError::invalid_config(format!("Invalid stroke list: {e}")))?;
        entries
            .into_iter()
            .map(|entry| {
                let stroke = Self::new(entry.points, entry.width.unwrap_or(default_width));
                stroke.validate()?;
                Ok(stroke)
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct StrokeEntry {
    points: Vec<(f32, f32)>,
    width: Option<u32>,
}

/// Drawing surface matched to one image's dimensions
#[derive(Debug, Clone)]
pub struct PaintSurface {
    width: u32,
    height: u32,
    brush: BrushSettings,
    strokes: Vec<BrushStroke>,
}

impl PaintSurface {
    /// Create a surface for a `width`x`height` image
    ///
    /// # Errors
    /// - Zero width or height
    /// - Brush width outside 5-50
    pub fn new(width: u32, height: u32, brush: BrushSettings) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EraseError::invalid_config(format!(
                "Paint surface needs a non-empty image, got {width}x{height}"
            )));
        }
        brush.validate()?;
        Ok(Self {
            width,
            height,
            brush,
            strokes: Vec::new(),
        })
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn brush(&self) -> BrushSettings {
        self.brush
    }

    /// Change the width used for subsequent strokes
    ///
    /// # Errors
    /// - Width outside 5-50
    pub fn set_brush_width(&mut self, width: u32) -> Result<()> {
        let brush = BrushSettings {
            width,
            ..self.brush
        };
        brush.validate()?;
        self.brush = brush;
        Ok(())
    }

    /// Append a stroke drawn with the surface's current brush width
    ///
    /// # Errors
    /// - Non-finite coordinates
    pub fn add_points(&mut self, points: Vec<(f32, f32)>) -> Result<()> {
        self.add_stroke(BrushStroke::new(points, self.brush.width))
    }

    /// Append a stroke
    ///
    /// # Errors
    /// - Stroke width outside 5-50
    /// - Non-finite coordinates
    pub fn add_stroke(&mut self, stroke: BrushStroke) -> Result<()> {
        BrushSettings {
            width: stroke.width,
            ..self.brush
        }
        .validate()?;
        stroke.validate()?;
        self.strokes.push(stroke);
        Ok(())
    }

    #[must_use]
    pub fn strokes(&self) -> &[BrushStroke] {
        &self.strokes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.iter().all(|s| s.points.is_empty())
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
    }

    /// Rasterize all strokes into a fresh overlay snapshot
    #[must_use]
    pub fn rasterize(&self) -> StrokeOverlay {
        let mut overlay = StrokeOverlay::blank(self.width, self.height);
        let color = Rgba(self.brush.color);
        for stroke in &self.strokes {
            draw_stroke(&mut overlay, stroke, color);
        }
        overlay
    }
}

fn draw_stroke(overlay: &mut StrokeOverlay, stroke: &BrushStroke, color: Rgba<u8>) {
    let radius = stroke.width as f32 / 2.0;
    let mut points = stroke.points.iter().copied();
    let Some(mut previous) = points.next() else {
        return;
    };

    stamp_disc(overlay, previous, radius, color);
    for point in points {
        draw_segment(overlay, previous, point, radius, color);
        previous = point;
    }
}

/// Dense one-pixel stepping between two points
///
/// Only the part of the segment within `radius` of the overlay is stepped, so
/// the work is bounded by the overlay size however far the points lie.
fn draw_segment(
    overlay: &mut StrokeOverlay,
    start: (f32, f32),
    end: (f32, f32),
    radius: f32,
    color: Rgba<u8>,
) {
    let (width, height) = overlay.dimensions();
    let bounds = (-radius, -radius, width as f32 + radius, height as f32 + radius);
    let Some((start, end)) = clip_segment(start, end, bounds) else {
        return;
    };

    let dx = end.0 - start.0;
    let dy = end.1 - start.1;
    let distance = (dx * dx + dy * dy).sqrt();

    if distance < 0.1 {
        stamp_disc(overlay, end, radius, color);
        return;
    }

    let steps = distance.ceil() as usize;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        stamp_disc(overlay, (start.0 + dx * t, start.1 + dy * t), radius, color);
    }
}

/// Liang-Barsky clip of a segment to `(min_x, min_y, max_x, max_y)`
///
/// Runs in `f64` and clamps the result, since points near `f32::MAX` lose too
/// much precision to land exactly on the bounds.
fn clip_segment(
    start: (f32, f32),
    end: (f32, f32),
    (min_x, min_y, max_x, max_y): (f32, f32, f32, f32),
) -> Option<((f32, f32), (f32, f32))> {
    let (x0, y0) = (f64::from(start.0), f64::from(start.1));
    let dx = f64::from(end.0) - x0;
    let dy = f64::from(end.1) - y0;
    let (min_x, min_y, max_x, max_y) = (
        f64::from(min_x),
        f64::from(min_y),
        f64::from(max_x),
        f64::from(max_y),
    );
    let mut t_enter = 0.0_f64;
    let mut t_exit = 1.0_f64;

    for (p, q) in [
        (-dx, x0 - min_x),
        (dx, max_x - x0),
        (-dy, y0 - min_y),
        (dy, max_y - y0),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            if t > t_exit {
                return None;
            }
            t_enter = t_enter.max(t);
        } else {
            if t < t_enter {
                return None;
            }
            t_exit = t_exit.min(t);
        }
    }

    let point_at = |t: f64| {
        (
            (x0 + dx * t).clamp(min_x, max_x) as f32,
            (y0 + dy * t).clamp(min_y, max_y) as f32,
        )
    };
    Some((point_at(t_enter), point_at(t_exit)))
}

/// Fill every pixel whose centre lies within `radius` of `center`, clipped to the overlay
fn stamp_disc(overlay: &mut StrokeOverlay, center: (f32, f32), radius: f32, color: Rgba<u8>) {
    let (width, height) = overlay.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let min_x = (center.0 - radius).floor().max(0.0) as u32;
    let min_y = (center.1 - radius).floor().max(0.0) as u32;
    let max_x = (center.0 + radius).ceil().min(width as f32 - 1.0);
    let max_y = (center.1 + radius).ceil().min(height as f32 - 1.0);
    if max_x < 0.0 || max_y < 0.0 {
        return;
    }
    let (max_x, max_y) = (max_x as u32, max_y as u32);

    let radius_sq = radius * radius;
    let image = overlay.image_mut();
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let px = x as f32 + 0.5 - center.0;
            let py = y as f32 + 0.5 - center.1;
            if px * px + py * py <= radius_sq {
                image.put_pixel(x, y, color);
            }
        }
    }
}
