//! Stroke model and geometry builders.

mod arrow;
mod outline;
mod smooth;

pub use arrow::{ArrowGeometry, HEAD_WIDTH_RATIO, MIN_HEAD_LENGTH, head_length};
pub use outline::{OutlineKind, normalized_rect, shape_outline};
pub use smooth::smooth_path;

use kurbo::{BezPath, Point, Rect};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Width of the heuristic hit box used for text strokes.
pub const TEXT_BOX_WIDTH: f64 = 300.0;
/// Extra height below the font size covered by a text stroke's hit box.
pub const TEXT_BOX_PADDING: f64 = 20.0;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn red() -> Self {
        Self::new(230, 40, 40, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Unique identifier for strokes.
pub type StrokeId = Uuid;

/// Which ends of an arrow carry a head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArrowEnds {
    #[default]
    Single,
    Double,
}

/// What a stroke's points mean.
///
/// Freehand strokes use every point; shapes and arrows use only the first and
/// last point; text strokes use the first point as their anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StrokeKind {
    Freehand,
    Rectangle { filled: bool },
    Circle { filled: bool },
    Arrow { ends: ArrowEnds },
    Text { text: String, font_size: f64 },
}

impl StrokeKind {
    pub fn is_text(&self) -> bool {
        matches!(self, StrokeKind::Text { .. })
    }

    /// Whether every sample is kept, rather than only the first and latest.
    pub fn accumulates_points(&self) -> bool {
        matches!(self, StrokeKind::Freehand)
    }
}

/// Renderable geometry of a committed stroke.
///
/// `stroke` is outlined with the stroke's width, `fill` is filled with its
/// color. Either may be empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrokeGeometry {
    pub stroke: BezPath,
    pub fill: BezPath,
}

impl StrokeGeometry {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.stroke.elements().is_empty() && self.fill.elements().is_empty()
    }
}

/// A single drawing unit: freehand path, shape, arrow or text.
///
/// A stroke is mutable only while in progress. Committing attaches its cached
/// geometry and freezes everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub(crate) id: StrokeId,
    points: Vec<Point>,
    /// Per-point widths captured while drawing; emptied at commit.
    widths: Vec<f64>,
    color: SerializableColor,
    stroke_width: f64,
    kind: StrokeKind,
    geometry: Option<StrokeGeometry>,
}

impl Stroke {
    /// Start a new in-progress stroke at `point`.
    pub fn new(kind: StrokeKind, color: SerializableColor, stroke_width: f64, point: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            points: vec![point],
            widths: vec![stroke_width],
            color,
            stroke_width,
            kind,
            geometry: None,
        }
    }

    /// Create a committed text stroke anchored at `anchor`.
    pub fn text(anchor: Point, text: String, font_size: f64, color: SerializableColor) -> Self {
        Self::new(StrokeKind::Text { text, font_size }, color, font_size, anchor)
            .commit_with(StrokeGeometry::empty())
    }

    /// Create a stroke from a full point list and commit it immediately.
    pub fn from_points(
        kind: StrokeKind,
        color: SerializableColor,
        stroke_width: f64,
        points: Vec<Point>,
    ) -> Self {
        let mut stroke = Self::new(kind, color, stroke_width, Point::ZERO);
        stroke.widths = vec![stroke_width; points.len()];
        stroke.points = points;
        stroke.into_committed()
    }

    pub fn id(&self) -> StrokeId {
        self.id
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Per-point widths. Only populated while the stroke is in progress.
    pub fn widths(&self) -> &[f64] {
        &self.widths
    }

    pub fn color(&self) -> SerializableColor {
        self.color
    }

    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
    }

    pub fn kind(&self) -> &StrokeKind {
        &self.kind
    }

    /// Cached geometry; present iff the stroke is committed.
    pub fn geometry(&self) -> Option<&StrokeGeometry> {
        self.geometry.as_ref()
    }

    pub fn is_committed(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn is_filled(&self) -> bool {
        match self.kind {
            StrokeKind::Rectangle { filled } | StrokeKind::Circle { filled } => filled,
            _ => false,
        }
    }

    /// Text content, for text strokes.
    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            StrokeKind::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn font_size(&self) -> Option<f64> {
        match self.kind {
            StrokeKind::Text { font_size, .. } => Some(font_size),
            _ => None,
        }
    }

    pub fn first_point(&self) -> Point {
        self.points.first().copied().unwrap_or(Point::ZERO)
    }

    pub fn last_point(&self) -> Point {
        self.points.last().copied().unwrap_or(Point::ZERO)
    }

    /// Axis-aligned bounds of the stroke's defining points.
    pub fn bounds(&self) -> Rect {
        match &self.kind {
            StrokeKind::Freehand => {
                if self.points.is_empty() {
                    return Rect::ZERO;
                }

                let mut min_x = f64::MAX;
                let mut min_y = f64::MAX;
                let mut max_x = f64::MIN;
                let mut max_y = f64::MIN;

                for point in &self.points {
                    min_x = min_x.min(point.x);
                    min_y = min_y.min(point.y);
                    max_x = max_x.max(point.x);
                    max_y = max_y.max(point.y);
                }

                Rect::new(min_x, min_y, max_x, max_y)
            }
            StrokeKind::Rectangle { .. } | StrokeKind::Circle { .. } | StrokeKind::Arrow { .. } => {
                normalized_rect(self.first_point(), self.last_point())
            }
            StrokeKind::Text { font_size, .. } => {
                // Fixed-width heuristic box; there is no text measurement here.
                let anchor = self.first_point();
                let top = anchor.y - font_size;
                Rect::new(
                    anchor.x,
                    top,
                    anchor.x + TEXT_BOX_WIDTH,
                    top + font_size + TEXT_BOX_PADDING,
                )
            }
        }
    }

    /// Append a sample with its width (freehand) or move the end point (shapes).
    pub(crate) fn push_point(&mut self, point: Point, width: f64) {
        debug_assert!(!self.is_committed());
        if self.kind.accumulates_points() || self.points.len() < 2 {
            self.points.push(point);
            self.widths.push(width);
        } else {
            let last = self.points.len() - 1;
            self.points[last] = point;
            self.widths[last] = width;
        }
    }

    /// Build geometry for this stroke and freeze it.
    pub fn into_committed(self) -> Self {
        if self.is_committed() {
            return self;
        }
        let geometry = build_geometry(&self);
        self.commit_with(geometry)
    }

    /// Freeze the stroke with precomputed geometry.
    ///
    /// The width collapses to the mean of the captured per-point widths.
    pub(crate) fn commit_with(mut self, geometry: StrokeGeometry) -> Self {
        if !self.widths.is_empty() {
            let mean = self.widths.iter().sum::<f64>() / self.widths.len() as f64;
            if mean > 0.0 {
                self.stroke_width = mean;
            }
        }
        self.widths = Vec::new();
        self.geometry = Some(geometry);
        self
    }
}

/// Build the renderable geometry of a stroke from its kind and points.
pub fn build_geometry(stroke: &Stroke) -> StrokeGeometry {
    let points = stroke.points();
    match stroke.kind() {
        StrokeKind::Freehand => StrokeGeometry {
            stroke: smooth_path(points),
            fill: BezPath::new(),
        },
        StrokeKind::Rectangle { filled } => {
            outline_geometry(stroke, OutlineKind::Rectangle, *filled)
        }
        StrokeKind::Circle { filled } => outline_geometry(stroke, OutlineKind::Ellipse, *filled),
        StrokeKind::Arrow { ends } => ArrowGeometry::build(
            stroke.first_point(),
            stroke.last_point(),
            stroke.stroke_width(),
            *ends,
        )
        .map(|arrow| arrow.to_geometry())
        .unwrap_or_default(),
        StrokeKind::Text { .. } => StrokeGeometry::empty(),
    }
}

fn outline_geometry(stroke: &Stroke, kind: OutlineKind, filled: bool) -> StrokeGeometry {
    if stroke.first_point() == stroke.last_point() {
        return StrokeGeometry::empty();
    }
    let rect = normalized_rect(stroke.first_point(), stroke.last_point());
    let outline = shape_outline(rect, kind);
    let fill = if filled { outline.clone() } else { BezPath::new() };
    StrokeGeometry {
        stroke: outline,
        fill,
    }
}
