//! Input shaping for pointer-drag gestures.
//!
//! Downsamples raw samples and modulates freehand width by drawing speed.

use crate::shapes::{Stroke, StrokeKind};
use crate::tools::ToolSettings;
use kurbo::{Point, Vec2};

/// Samples closer than this to the last recorded point are dropped.
pub const MIN_SAMPLE_DISTANCE: f64 = 2.0;
/// Weight of the newest speed sample in the moving average.
const SPEED_SMOOTHING: f64 = 0.4;
/// Speed (units per second) at which the width factor would reach zero.
const SPEED_RANGE: f64 = 5000.0;
/// Lower bound of the width factor.
pub const MIN_WIDTH_FACTOR: f64 = 0.6;
/// Upper bound of the width factor.
pub const MAX_WIDTH_FACTOR: f64 = 1.4;

/// Width for a freehand sample drawn at `smoothed_speed`.
///
/// Faster motion draws thinner lines, bounded to ±40% of `base_width`.
pub fn dynamic_width(base_width: f64, smoothed_speed: f64) -> f64 {
    let factor = (1.0 - smoothed_speed / SPEED_RANGE).clamp(MIN_WIDTH_FACTOR, MAX_WIDTH_FACTOR);
    base_width * factor
}

/// Shapes the samples of one gesture into an in-progress stroke.
#[derive(Debug, Clone)]
pub struct InputShaper {
    /// Stroke being drawn.
    stroke: Option<Stroke>,
    /// Last point actually recorded into the stroke.
    last_point: Option<Point>,
    /// Exponential moving average of pointer speed.
    smoothed_speed: f64,
    /// Configured width for the active gesture.
    base_width: f64,
    min_sample_distance: f64,
}

impl Default for InputShaper {
    fn default() -> Self {
        Self::new(MIN_SAMPLE_DISTANCE)
    }
}

impl InputShaper {
    pub fn new(min_sample_distance: f64) -> Self {
        Self {
            stroke: None,
            last_point: None,
            smoothed_speed: 0.0,
            base_width: 0.0,
            min_sample_distance,
        }
    }

    /// Start a gesture, replacing any stroke still in progress.
    pub fn begin(&mut self, point: Point, kind: StrokeKind, settings: &ToolSettings) -> &Stroke {
        if self.stroke.is_some() {
            log::debug!("Gesture restarted before the previous one ended");
        }
        self.base_width = settings.width;
        self.smoothed_speed = 0.0;
        self.last_point = Some(point);
        self.stroke
            .insert(Stroke::new(kind, settings.color, settings.width, point))
    }

    /// Feed a drag sample. Returns `true` if the point was recorded.
    pub fn extend(&mut self, point: Point, velocity: Vec2) -> bool {
        let Some(stroke) = self.stroke.as_mut() else {
            return false;
        };

        self.smoothed_speed =
            (1.0 - SPEED_SMOOTHING) * self.smoothed_speed + SPEED_SMOOTHING * velocity.hypot();

        if let Some(last) = self.last_point
            && last.distance(point) < self.min_sample_distance
        {
            return false;
        }

        // Only freehand strokes get speed-dependent width.
        let width = match stroke.kind() {
            StrokeKind::Freehand => dynamic_width(self.base_width, self.smoothed_speed),
            _ => self.base_width,
        };
        stroke.push_point(point, width);
        self.last_point = Some(point);
        true
    }

    /// Finish the gesture, handing back the uncommitted stroke.
    pub fn end(&mut self) -> Option<Stroke> {
        self.last_point = None;
        self.smoothed_speed = 0.0;
        self.stroke.take()
    }

    /// Abandon the gesture without producing a stroke.
    pub fn cancel(&mut self) {
        if self.end().is_some() {
            log::debug!("Gesture cancelled");
        }
    }

    /// The stroke currently being drawn.
    pub fn current(&self) -> Option<&Stroke> {
        self.stroke.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.stroke.is_some()
    }

    pub fn smoothed_speed(&self) -> f64 {
        self.smoothed_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolKind;

    fn pencil(width: f64) -> ToolSettings {
        ToolSettings::default().with_width(width)
    }

    #[test]
    fn test_width_bounds() {
        let base = 5.0;
        for speed in [0.0, 10.0, 1000.0, 2000.0, 4999.0, 5000.0, 1e6, -1e6] {
            let width = dynamic_width(base, speed);
            assert!(width >= 0.6 * base - 1e-12, "speed {speed} gave {width}");
            assert!(width <= 1.4 * base + 1e-12, "speed {speed} gave {width}");
        }
        assert_eq!(dynamic_width(base, 0.0), base);
        assert!((dynamic_width(base, 1000.0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_downsampling_floor() {
        let mut shaper = InputShaper::default();
        shaper.begin(Point::ZERO, StrokeKind::Freehand, &pencil(3.0));

        // Dense samples every 0.3 units along a wobbly line.
        for i in 1..400 {
            let t = i as f64 * 0.3;
            shaper.extend(Point::new(t, (t * 0.2).sin() * 3.0), Vec2::ZERO);
        }

        let stroke = shaper.end().unwrap();
        assert!(stroke.points().len() > 10);
        for pair in stroke.points().windows(2) {
            assert!(pair[0].distance(pair[1]) >= MIN_SAMPLE_DISTANCE);
        }
    }

    #[test]
    fn test_close_sample_is_discarded() {
        let mut shaper = InputShaper::default();
        shaper.begin(Point::ZERO, StrokeKind::Freehand, &pencil(3.0));
        assert!(!shaper.extend(Point::new(1.0, 1.0), Vec2::ZERO));
        assert!(shaper.extend(Point::new(2.0, 0.0), Vec2::ZERO));
        assert_eq!(shaper.current().unwrap().points().len(), 2);
    }

    #[test]
    fn test_speed_is_smoothed() {
        let mut shaper = InputShaper::default();
        shaper.begin(Point::ZERO, StrokeKind::Freehand, &pencil(10.0));
        shaper.extend(Point::new(10.0, 0.0), Vec2::new(3000.0, 4000.0));
        // 0.6 * 0 + 0.4 * 5000
        assert!((shaper.smoothed_speed() - 2000.0).abs() < 1e-9);
        shaper.extend(Point::new(20.0, 0.0), Vec2::new(5000.0, 0.0));
        // 0.6 * 2000 + 0.4 * 5000
        assert!((shaper.smoothed_speed() - 3200.0).abs() < 1e-9);

        let stroke = shaper.current().unwrap();
        assert_eq!(stroke.widths().len(), 3);
        assert!((stroke.widths()[1] - 6.0).abs() < 1e-9);
        // 1 - 3200/5000 = 0.36, clamped to 0.6
        assert!((stroke.widths()[2] - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_shapes_keep_base_width() {
        let settings = pencil(4.0).with_tool(ToolKind::Rectangle);
        let mut shaper = InputShaper::default();
        shaper.begin(Point::ZERO, settings.stroke_kind().unwrap(), &settings);
        shaper.extend(Point::new(50.0, 50.0), Vec2::new(9000.0, 0.0));
        shaper.extend(Point::new(80.0, 60.0), Vec2::new(9000.0, 0.0));

        let stroke = shaper.end().unwrap();
        assert_eq!(stroke.points(), &[Point::ZERO, Point::new(80.0, 60.0)]);
        assert!(stroke.widths().iter().all(|w| *w == 4.0));
    }

    #[test]
    fn test_extend_without_begin_is_ignored() {
        let mut shaper = InputShaper::default();
        assert!(!shaper.extend(Point::new(5.0, 5.0), Vec2::ZERO));
        assert!(shaper.end().is_none());
    }

    #[test]
    fn test_cancel_drops_stroke() {
        let mut shaper = InputShaper::default();
        shaper.begin(Point::ZERO, StrokeKind::Freehand, &pencil(2.0));
        shaper.cancel();
        assert!(!shaper.is_active());
        assert!(shaper.end().is_none());
    }
}
