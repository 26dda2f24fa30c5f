//! Frame composition on top of the snapshot cache.

use kurbo::{Rect, Size};
use overmark_core::{DisplayState, SerializableColor, Stroke};
use peniko::Color;
use thiserror::Error;
use tiny_skia::{FillRule, PathBuilder, Pixmap, PixmapPaint, Transform};

use crate::skia_impl::{SkiaCompositor, line_style, paint_for};

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Font error: {0}")]
    Font(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Colors used when composing a frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameStyle {
    /// Background color; fully transparent for an overlay.
    pub background: Color,
    /// Selection highlight color.
    pub selection_color: Color,
    /// Gap between a selected stroke's bounds and its highlight box.
    pub selection_padding: f64,
}

impl Default for FrameStyle {
    fn default() -> Self {
        Self {
            background: Color::TRANSPARENT,
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            selection_padding: 6.0,
        }
    }
}

impl FrameStyle {
    /// Set the background color.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }
}

/// Compose one display frame of `size`.
///
/// Draw order: background, cache image, selected stroke with its highlight,
/// finished strokes still awaiting commit, then the stroke being drawn.
///
/// The last published image is shown even while a newer rebuild is pending.
/// Committed strokes are drawn directly only when no image has been published
/// yet or the latest rebuild failed.
pub fn render_frame(
    compositor: &SkiaCompositor,
    state: &DisplayState<'_, Pixmap>,
    size: Size,
    style: &FrameStyle,
) -> RenderResult<Pixmap> {
    let mut frame = SkiaCompositor::new_pixmap(size)?;

    let background = SerializableColor::from(style.background);
    if background.a > 0 {
        frame.fill(tiny_skia::Color::from_rgba8(
            background.r,
            background.g,
            background.b,
            background.a,
        ));
    }

    match &state.cache {
        Some(image) if !state.cache_failed => {
            let image: &Pixmap = image;
            frame.draw_pixmap(
                0,
                0,
                image.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }
        _ => draw_committed(compositor, &mut frame, state),
    }

    if let Some(selected) = state.selected_stroke {
        compositor.draw_stroke(&mut frame, selected);
        draw_highlight(&mut frame, selected, style);
    }

    for stroke in &state.pending {
        compositor.draw_live(&mut frame, stroke);
    }

    if let Some(stroke) = state.in_progress {
        compositor.draw_live(&mut frame, stroke);
    }

    Ok(frame)
}

/// Draw the non-selected committed strokes, vector strokes before text.
fn draw_committed(compositor: &SkiaCompositor, frame: &mut Pixmap, state: &DisplayState<'_, Pixmap>) {
    log::trace!("No usable cache image; drawing {} strokes directly", state.strokes.len());
    let visible = || {
        state
            .strokes
            .iter()
            .filter(|s| Some(s.id()) != state.selected)
    };
    for stroke in visible().filter(|s| !s.kind().is_text()) {
        compositor.draw_stroke(frame, stroke);
    }
    for stroke in visible().filter(|s| s.kind().is_text()) {
        compositor.draw_text(frame, stroke);
    }
}

fn draw_highlight(frame: &mut Pixmap, stroke: &Stroke, style: &FrameStyle) {
    let bounds: Rect = stroke.bounds().inflate(style.selection_padding, style.selection_padding);
    let Some(rect) = tiny_skia::Rect::from_ltrb(
        bounds.x0 as f32,
        bounds.y0 as f32,
        bounds.x1 as f32,
        bounds.y1 as f32,
    ) else {
        return;
    };
    let path = PathBuilder::from_rect(rect);
    let paint = paint_for(SerializableColor::from(style.selection_color));
    frame.stroke_path(&path, &paint, &line_style(2.0), Transform::identity(), None);

    // Corner handles
    for (x, y) in [
        (bounds.x0, bounds.y0),
        (bounds.x1, bounds.y0),
        (bounds.x1, bounds.y1),
        (bounds.x0, bounds.y1),
    ] {
        if let Some(handle) = PathBuilder::from_circle(x as f32, y as f32, 4.0) {
            frame.fill_path(&handle, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }
}

/// Straight (non-premultiplied) RGBA8 bytes of a pixmap.
pub fn to_rgba8(pixmap: &Pixmap) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        bytes.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    bytes
}
