//! Arrow geometry.

use super::{ArrowEnds, StrokeGeometry};
use kurbo::{BezPath, Point, Vec2};

/// Smallest arrowhead length, whatever the line width.
pub const MIN_HEAD_LENGTH: f64 = 14.0;
/// Head length per unit of line width, above the minimum.
const HEAD_LENGTH_PER_WIDTH: f64 = 4.0;
/// Head width as a fraction of head length.
pub const HEAD_WIDTH_RATIO: f64 = 0.55;
/// Arrows no longer than this produce no geometry.
const DEGENERATE_LENGTH: f64 = 1.0;

/// Arrowhead length for a given line width.
pub fn head_length(line_width: f64) -> f64 {
    MIN_HEAD_LENGTH.max(HEAD_LENGTH_PER_WIDTH * line_width)
}

/// Shaft and arrowheads of a straight arrow.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowGeometry {
    pub shaft_start: Point,
    pub shaft_end: Point,
    /// Closed triangles as `[apex, left, right]`.
    pub heads: Vec<[Point; 3]>,
    pub head_length: f64,
    pub head_width: f64,
}

impl ArrowGeometry {
    /// Build the arrow from `start` to `end`.
    ///
    /// Returns `None` when the arrow is too short to have a direction.
    pub fn build(start: Point, end: Point, line_width: f64, ends: ArrowEnds) -> Option<Self> {
        let delta = end - start;
        let length = delta.hypot();
        if length <= DEGENERATE_LENGTH {
            return None;
        }

        let dir = delta / length;
        let perp = Vec2::new(-dir.y, dir.x);
        let head_length = head_length(line_width);
        let head_width = HEAD_WIDTH_RATIO * head_length;
        let half = perp * (head_width / 2.0);

        let shaft_end = end - dir * head_length;
        let mut heads = vec![[end, shaft_end + half, shaft_end - half]];

        let shaft_start = match ends {
            ArrowEnds::Single => start,
            ArrowEnds::Double => {
                let inset = start + dir * head_length;
                heads.push([start, inset + half, inset - half]);
                inset
            }
        };

        Some(Self {
            shaft_start,
            shaft_end,
            heads,
            head_length,
            head_width,
        })
    }

    /// Shaft as the stroked path, heads as the filled path.
    pub fn to_geometry(&self) -> StrokeGeometry {
        let mut shaft = BezPath::new();
        shaft.move_to(self.shaft_start);
        shaft.line_to(self.shaft_end);

        let mut heads = BezPath::new();
        for [apex, left, right] in &self.heads {
            heads.move_to(*apex);
            heads.line_to(*left);
            heads.line_to(*right);
            heads.close_path();
        }

        StrokeGeometry {
            stroke: shaft,
            fill: heads,
        }
    }
}
