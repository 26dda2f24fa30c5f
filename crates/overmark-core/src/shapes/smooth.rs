//! Catmull-Rom smoothing for freehand strokes.

use kurbo::{BezPath, Point};

/// Build a smooth path through every sample point.
///
/// Each segment `p[i] -> p[i+1]` becomes a cubic whose control points are
/// offset by a sixth of the neighbouring chord, so the curve keeps a
/// continuous tangent and still passes through every sample. Neighbour
/// indices are clamped at both ends of the sequence.
pub fn smooth_path(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();

    match points {
        [] => {}
        [point] => {
            // Zero-length segment so round caps still render a dot.
            path.move_to(*point);
            path.line_to(*point);
        }
        [start, end] => {
            path.move_to(*start);
            path.line_to(*end);
        }
        _ => {
            let last = points.len() - 1;
            path.move_to(points[0]);
            for i in 0..last {
                let p0 = points[i.saturating_sub(1)];
                let p1 = points[i];
                let p2 = points[i + 1];
                let p3 = points[(i + 2).min(last)];

                let cp1 = p1 + (p2 - p0) / 6.0;
                let cp2 = p2 - (p3 - p1) / 6.0;
                path.curve_to(cp1, cp2, p2);
            }
        }
    }

    path
}
