//! tiny-skia implementation of the snapshot compositor.

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont, point};
use kurbo::{BezPath, PathEl, Size};
use overmark_core::shapes::{SerializableColor, Stroke, StrokeKind, build_geometry};
use overmark_core::{Compositor, StrokeGeometry};
use std::path::Path;
use tiny_skia::{
    FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Transform,
};

use crate::renderer::{RenderError, RenderResult};

/// Convert a kurbo path to a tiny-skia path. `None` for empty paths.
pub fn to_skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut builder = PathBuilder::new();

    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => builder.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => builder.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => builder.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => builder.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => builder.close(),
        }
    }

    builder.finish()
}

pub(crate) fn paint_for(color: SerializableColor) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = true;
    paint
}

pub(crate) fn line_style(width: f64) -> tiny_skia::Stroke {
    tiny_skia::Stroke {
        width: width as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Default::default()
    }
}

/// Freehand strokes whose samples all coincide render as a dot.
fn is_dot(stroke: &Stroke) -> bool {
    let Some(first) = stroke.points().first() else {
        return false;
    };
    matches!(stroke.kind(), StrokeKind::Freehand)
        && stroke.points().iter().all(|p| p.distance(*first) < 0.5)
}

/// CPU compositor rasterizing strokes into a [`Pixmap`].
///
/// Text needs a font; without one, text strokes are skipped.
#[derive(Clone, Default)]
pub struct SkiaCompositor {
    font: Option<FontArc>,
}

impl std::fmt::Debug for SkiaCompositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkiaCompositor")
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl SkiaCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(font: FontArc) -> Self {
        Self { font: Some(font) }
    }

    /// Load a TrueType/OpenType font file for text strokes.
    pub fn load_font(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| RenderError::Font(format!("{}: {e}", path.display())))?;
        log::info!("Loaded font {}", path.display());
        Ok(Self::with_font(font))
    }

    pub fn font(&self) -> Option<&FontArc> {
        self.font.as_ref()
    }

    /// Create a transparent pixmap covering `size`.
    pub fn new_pixmap(size: Size) -> RenderResult<Pixmap> {
        let width = size.width.ceil().max(0.0) as u32;
        let height = size.height.ceil().max(0.0) as u32;
        Pixmap::new(width, height)
            .ok_or_else(|| RenderError::Surface(format!("cannot allocate {width}x{height} pixmap")))
    }

    /// Draw a stroke with its cached geometry, building it for uncommitted strokes.
    pub fn draw_stroke(&self, pixmap: &mut Pixmap, stroke: &Stroke) {
        if stroke.kind().is_text() {
            self.draw_text(pixmap, stroke);
            return;
        }

        let built;
        let geometry: &StrokeGeometry = match stroke.geometry() {
            Some(geometry) => geometry,
            None => {
                built = build_geometry(stroke);
                &built
            }
        };
        let paint = paint_for(stroke.color());

        if let Some(fill) = to_skia_path(&geometry.fill) {
            pixmap.fill_path(&fill, &paint, FillRule::Winding, Transform::identity(), None);
        }

        if is_dot(stroke) {
            let center = stroke.first_point();
            let radius = (stroke.stroke_width() / 2.0).max(0.5) as f32;
            if let Some(dot) = PathBuilder::from_circle(center.x as f32, center.y as f32, radius) {
                pixmap.fill_path(&dot, &paint, FillRule::Winding, Transform::identity(), None);
            }
            return;
        }

        if let Some(path) = to_skia_path(&geometry.stroke) {
            pixmap.stroke_path(
                &path,
                &paint,
                &line_style(stroke.stroke_width()),
                Transform::identity(),
                None,
            );
        }
    }

    /// Draw an in-progress stroke. Freehand segments use their per-point widths.
    pub fn draw_live(&self, pixmap: &mut Pixmap, stroke: &Stroke) {
        let widths = stroke.widths();
        let points = stroke.points();
        if !matches!(stroke.kind(), StrokeKind::Freehand)
            || points.len() < 2
            || widths.len() != points.len()
        {
            self.draw_stroke(pixmap, stroke);
            return;
        }

        let paint = paint_for(stroke.color());
        for (pair, width) in points.windows(2).zip(widths.windows(2)) {
            let mut builder = PathBuilder::new();
            builder.move_to(pair[0].x as f32, pair[0].y as f32);
            builder.line_to(pair[1].x as f32, pair[1].y as f32);
            let Some(segment) = builder.finish() else {
                continue;
            };
            let style = line_style((width[0] + width[1]) / 2.0);
            pixmap.stroke_path(&segment, &paint, &style, Transform::identity(), None);
        }
    }

    /// Draw a text stroke with its baseline at the anchor.
    pub fn draw_text(&self, pixmap: &mut Pixmap, stroke: &Stroke) {
        let (Some(text), Some(font_size)) = (stroke.text_content(), stroke.font_size()) else {
            return;
        };
        let Some(font) = &self.font else {
            log::debug!("No font loaded; skipping text stroke {}", stroke.id());
            return;
        };

        let scale = PxScale::from(font_size as f32);
        let scaled = font.as_scaled(scale);
        let anchor = stroke.first_point();
        let color = stroke.color();
        let width = pixmap.width() as i32;
        let height = pixmap.height() as i32;
        let pixels = pixmap.pixels_mut();

        let mut cursor_x = anchor.x as f32;
        let baseline = anchor.y as f32;
        let mut previous: Option<GlyphId> = None;

        for ch in text.chars().filter(|c| !c.is_control()) {
            let glyph_id = font.glyph_id(ch);
            if let Some(prev) = previous {
                cursor_x += scaled.kern(prev, glyph_id);
            }
            let glyph = glyph_id.with_scale_and_position(scale, point(cursor_x, baseline));
            cursor_x += scaled.h_advance(glyph_id);
            previous = Some(glyph_id);

            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let x = bounds.min.x as i32 + gx as i32;
                let y = bounds.min.y as i32 + gy as i32;
                if x < 0 || y < 0 || x >= width || y >= height {
                    return;
                }
                let index = (y * width + x) as usize;
                blend_over(&mut pixels[index], color, coverage);
            });
        }
    }
}

/// Source-over blend of `color` at `coverage` onto a premultiplied pixel.
pub(crate) fn blend_over(dst: &mut PremultipliedColorU8, color: SerializableColor, coverage: f32) {
    let alpha = (color.a as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let inv = 1.0 - alpha;
    let a = (255.0 * alpha + dst.alpha() as f32 * inv).round().min(255.0) as u8;
    let channel = |src: u8, dst: u8| -> u8 {
        (src as f32 * alpha + dst as f32 * inv).round().min(a as f32) as u8
    };
    let r = channel(color.r, dst.red());
    let g = channel(color.g, dst.green());
    let b = channel(color.b, dst.blue());
    if let Some(blended) = PremultipliedColorU8::from_rgba(r, g, b, a) {
        *dst = blended;
    }
}

impl Compositor for SkiaCompositor {
    type Surface = Pixmap;
    type Image = Pixmap;

    fn begin(&self, size: Size) -> Option<Pixmap> {
        Self::new_pixmap(size)
            .map_err(|e| log::warn!("Snapshot surface unavailable: {e}"))
            .ok()
    }

    fn composite_stroke(&self, surface: &mut Pixmap, stroke: &Stroke) {
        self.draw_stroke(surface, stroke);
    }

    fn composite_text(&self, surface: &mut Pixmap, stroke: &Stroke) {
        self.draw_text(surface, stroke);
    }

    fn finish(&self, surface: Pixmap) -> Pixmap {
        surface
    }
}
