//! Hit-testing committed strokes against a pointer location.

use crate::shapes::{Stroke, StrokeId, StrokeKind};
use kurbo::Point;

/// A freehand stroke is hit when any sample lies within this distance.
pub const FREEHAND_HIT_RADIUS: f64 = 20.0;
/// Margin added on every side of a shape's bounding rectangle.
pub const SHAPE_HIT_MARGIN: f64 = 10.0;

/// Check whether `point` hits `stroke`.
pub fn hit_test(stroke: &Stroke, point: Point) -> bool {
    match stroke.kind() {
        StrokeKind::Freehand => stroke
            .points()
            .iter()
            .any(|p| p.distance(point) <= FREEHAND_HIT_RADIUS),
        StrokeKind::Rectangle { .. } | StrokeKind::Circle { .. } | StrokeKind::Arrow { .. } => {
            stroke
                .bounds()
                .inflate(SHAPE_HIT_MARGIN, SHAPE_HIT_MARGIN)
                .contains(point)
        }
        StrokeKind::Text { .. } => stroke.bounds().contains(point),
    }
}

/// Find the most recently committed stroke under `point`.
///
/// `strokes` is in commit order, so later entries win on overlap.
pub fn stroke_at(strokes: &[Stroke], point: Point) -> Option<StrokeId> {
    strokes
        .iter()
        .rev()
        .find(|stroke| hit_test(stroke, point))
        .map(Stroke::id)
}
