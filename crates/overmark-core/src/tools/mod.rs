//! Tool and style settings.

use crate::shapes::{ArrowEnds, SerializableColor, StrokeKind};
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    #[default]
    Pencil,
    Rectangle,
    Circle,
    Arrow,
    DoubleArrow,
    Text,
    /// Selection pointer; never produces a stroke.
    Select,
}

impl ToolKind {
    /// Cycle to the next tool.
    pub fn next(self) -> Self {
        match self {
            ToolKind::Pencil => ToolKind::Rectangle,
            ToolKind::Rectangle => ToolKind::Circle,
            ToolKind::Circle => ToolKind::Arrow,
            ToolKind::Arrow => ToolKind::DoubleArrow,
            ToolKind::DoubleArrow => ToolKind::Text,
            ToolKind::Text => ToolKind::Select,
            ToolKind::Select => ToolKind::Pencil,
        }
    }

    /// Whether drags with this tool accumulate points into a stroke.
    pub fn draws(self) -> bool {
        !matches!(self, ToolKind::Text | ToolKind::Select)
    }
}

/// What a pointer gesture does for a given tool.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// Accumulate samples into a stroke of this kind.
    Draw(StrokeKind),
    /// Hit-test on press and on every move.
    Select,
    /// Capture an anchor and ask the shell for text.
    PlaceText,
}

/// Style parameters applied to newly created strokes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub tool: ToolKind,
    pub color: SerializableColor,
    /// Base stroke width.
    pub width: f64,
    /// Fill rectangles and circles.
    pub filled: bool,
    /// Font size for text strokes.
    pub font_size: f64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool: ToolKind::default(),
            color: SerializableColor::red(),
            width: 4.0,
            filled: false,
            font_size: 24.0,
        }
    }
}

impl ToolSettings {
    /// What a gesture started with the current tool does.
    pub fn gesture(&self) -> Gesture {
        match self.tool {
            ToolKind::Pencil => Gesture::Draw(StrokeKind::Freehand),
            ToolKind::Rectangle => Gesture::Draw(StrokeKind::Rectangle {
                filled: self.filled,
            }),
            ToolKind::Circle => Gesture::Draw(StrokeKind::Circle {
                filled: self.filled,
            }),
            ToolKind::Arrow => Gesture::Draw(StrokeKind::Arrow {
                ends: ArrowEnds::Single,
            }),
            ToolKind::DoubleArrow => Gesture::Draw(StrokeKind::Arrow {
                ends: ArrowEnds::Double,
            }),
            ToolKind::Text => Gesture::PlaceText,
            ToolKind::Select => Gesture::Select,
        }
    }

    /// Stroke kind produced by a drag with the current tool, if any.
    pub fn stroke_kind(&self) -> Option<StrokeKind> {
        match self.gesture() {
            Gesture::Draw(kind) => Some(kind),
            Gesture::Select | Gesture::PlaceText => None,
        }
    }

    /// Builder-style tool override.
    pub fn with_tool(mut self, tool: ToolKind) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    pub fn with_color(mut self, color: SerializableColor) -> Self {
        self.color = color;
        self
    }

    pub fn with_filled(mut self, filled: bool) -> Self {
        self.filled = filled;
        self
    }

    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = font_size;
        self
    }

    /// Replace a non-positive width or font size with its default.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.width = positive_or(self.width, defaults.width, "stroke width");
        self.font_size = positive_or(self.font_size, defaults.font_size, "font size");
        self
    }
}

/// `value` if it is a finite positive size, otherwise `fallback`.
pub(crate) fn positive_or(value: f64, fallback: f64, what: &str) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        log::warn!("Invalid {what} {value}; using {fallback}");
        fallback
    }
}
