//! Rectangle and ellipse outlines from two corner points.

use kurbo::{BezPath, Ellipse, Point, Rect, Shape as KurboShape};

/// Flattening tolerance used when converting shapes to paths.
const PATH_TOLERANCE: f64 = 0.1;

/// Which outline a two-corner shape produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlineKind {
    Rectangle,
    /// Ellipse inscribed in the rectangle.
    Ellipse,
}

/// Rectangle spanned by two arbitrary corners, with min/max per axis.
pub fn normalized_rect(p1: Point, p2: Point) -> Rect {
    Rect::new(p1.x.min(p2.x), p1.y.min(p2.y), p1.x.max(p2.x), p1.y.max(p2.y))
}

pub fn shape_outline(rect: Rect, kind: OutlineKind) -> BezPath {
    match kind {
        OutlineKind::Rectangle => rect.to_path(PATH_TOLERANCE),
        OutlineKind::Ellipse => Ellipse::from_rect(rect).to_path(PATH_TOLERANCE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_rect_from_any_corner_order() {
        let a = Point::new(100.0, 10.0);
        let b = Point::new(20.0, 80.0);
        assert_eq!(normalized_rect(a, b), Rect::new(20.0, 10.0, 100.0, 80.0));
        assert_eq!(normalized_rect(b, a), normalized_rect(a, b));
    }

    #[test]
    fn test_rectangle_outline_is_closed() {
        let path = shape_outline(Rect::new(0.0, 0.0, 40.0, 20.0), OutlineKind::Rectangle);
        assert!(matches!(path.elements().last(), Some(kurbo::PathEl::ClosePath)));
        assert_eq!(path.bounding_box(), Rect::new(0.0, 0.0, 40.0, 20.0));
    }

    #[test]
    fn test_ellipse_is_inscribed() {
        let rect = Rect::new(10.0, 10.0, 50.0, 30.0);
        let path = shape_outline(rect, OutlineKind::Ellipse);
        let bbox = path.bounding_box();
        assert!((bbox.x0 - rect.x0).abs() < 1e-6);
        assert!((bbox.x1 - rect.x1).abs() < 1e-6);
        assert!((bbox.y0 - rect.y0).abs() < 1e-6);
        assert!((bbox.y1 - rect.y1).abs() < 1e-6);
        // The rectangle's corner lies outside the ellipse.
        assert!(!path.contains(Point::new(11.0, 11.0)));
        assert!(path.contains(rect.center()));
    }
}
