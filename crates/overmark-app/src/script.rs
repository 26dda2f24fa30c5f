//! Gesture scripts: a JSON list of canvas operations replayed in order.
//!
//! ```json
//! {
//!   "background": { "r": 255, "g": 255, "b": 255, "a": 255 },
//!   "ops": [
//!     { "op": "tool", "tool": "arrow", "width": 3 },
//!     { "op": "begin", "x": 10, "y": 10 },
//!     { "op": "extend", "x": 120, "y": 40, "vx": 800, "vy": 0 },
//!     { "op": "end" }
//!   ]
//! }
//! ```

use kurbo::{Point, Vec2};
use overmark_core::{BeginOutcome, CanvasState, Compositor, SerializableColor, ToolSettings};
use serde::Deserialize;
use std::path::Path;

use crate::AppResult;

/// One scripted canvas operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    /// Replace the tool settings; omitted fields take their defaults.
    Tool(ToolSettings),
    Begin {
        x: f64,
        y: f64,
    },
    Extend {
        x: f64,
        y: f64,
        #[serde(default)]
        vx: f64,
        #[serde(default)]
        vy: f64,
    },
    End,
    Cancel,
    Select {
        x: f64,
        y: f64,
    },
    DeleteSelected,
    Clear,
    Undo,
    Redo,
    /// Commit text at the given anchor, or at the anchor captured by the text tool.
    Text {
        text: String,
        #[serde(default)]
        x: Option<f64>,
        #[serde(default)]
        y: Option<f64>,
    },
    Resize {
        width: f64,
        height: f64,
    },
}

/// A parsed script.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Script {
    /// Frame background; transparent when absent.
    #[serde(default)]
    pub background: Option<SerializableColor>,
    pub ops: Vec<ScriptOp>,
}

impl Script {
    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let script = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded {} ops from {}", script.ops.len(), path.display());
        Ok(script)
    }
}

/// Counters gathered while replaying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub applied: usize,
    /// Ops that had no effect (undo on empty history, text without anchor, ...).
    pub ignored: usize,
}

/// Apply `ops` to `canvas` in order.
///
/// Background work is drained after every op, so a replay is deterministic
/// regardless of rebuild mode.
pub fn replay<C: Compositor>(canvas: &mut CanvasState<C>, ops: &[ScriptOp]) -> ReplayReport {
    let mut report = ReplayReport::default();

    for op in ops {
        let applied = apply(canvas, op);
        if applied {
            report.applied += 1;
        } else {
            log::debug!("Script op had no effect: {op:?}");
            report.ignored += 1;
        }
        canvas.settle();
    }

    report
}

fn apply<C: Compositor>(canvas: &mut CanvasState<C>, op: &ScriptOp) -> bool {
    match op {
        ScriptOp::Tool(settings) => {
            canvas.set_tool_settings(settings.clone());
            true
        }
        ScriptOp::Begin { x, y } => {
            let settings = canvas.settings().clone();
            match canvas.begin_stroke(Point::new(*x, *y), settings) {
                BeginOutcome::Selected(hit) => hit.is_some(),
                BeginOutcome::Drawing(_) | BeginOutcome::TextRequested(_) => true,
            }
        }
        ScriptOp::Extend { x, y, vx, vy } => {
            canvas.extend_stroke(Point::new(*x, *y), Vec2::new(*vx, *vy));
            true
        }
        ScriptOp::End => canvas.end_stroke().is_some(),
        ScriptOp::Cancel => {
            canvas.cancel_stroke();
            true
        }
        ScriptOp::Select { x, y } => canvas.select_at(Point::new(*x, *y)).is_some(),
        ScriptOp::DeleteSelected => canvas.delete_selected().is_some(),
        ScriptOp::Clear => {
            canvas.clear();
            true
        }
        ScriptOp::Undo => canvas.undo(),
        ScriptOp::Redo => canvas.redo(),
        ScriptOp::Text { text, x, y } => {
            let anchor = match (x, y) {
                (Some(x), Some(y)) => Some(Point::new(*x, *y)),
                _ => canvas.pending_text_anchor(),
            };
            let Some(anchor) = anchor else {
                log::warn!("Text op without an anchor; use the text tool or give x and y");
                return false;
            };
            let settings = canvas.settings();
            let (font_size, color) = (settings.font_size, settings.color);
            canvas
                .request_text_commit(anchor, text, font_size, color)
                .is_some()
        }
        ScriptOp::Resize { width, height } => {
            canvas.set_viewport_size(*width, *height);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overmark_core::{CanvasConfig, StrokeKind, ToolKind};
    use overmark_render::SkiaCompositor;

    fn canvas() -> CanvasState<SkiaCompositor> {
        let config = CanvasConfig {
            viewport: kurbo::Size::new(200.0, 200.0),
            ..CanvasConfig::default()
        };
        CanvasState::new(SkiaCompositor::new(), config)
    }

    #[test]
    fn test_parse_ops() {
        let script = Script::from_json(
            r#"{
                "ops": [
                    {"op": "tool", "tool": "double_arrow", "width": 3},
                    {"op": "begin", "x": 1, "y": 2},
                    {"op": "extend", "x": 40, "y": 2, "vx": 300},
                    {"op": "end"},
                    {"op": "delete_selected"},
                    {"op": "text", "text": "note"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(script.background, None);
        assert_eq!(script.ops.len(), 6);
        match &script.ops[0] {
            ScriptOp::Tool(settings) => {
                assert_eq!(settings.tool, ToolKind::DoubleArrow);
                assert_eq!(settings.width, 3.0);
                assert_eq!(settings.font_size, 24.0);
            }
            other => panic!("unexpected op {other:?}"),
        }
        assert_eq!(
            script.ops[2],
            ScriptOp::Extend {
                x: 40.0,
                y: 2.0,
                vx: 300.0,
                vy: 0.0
            }
        );
        assert_eq!(script.ops[3], ScriptOp::End);
        assert_eq!(
            script.ops[5],
            ScriptOp::Text {
                text: "note".into(),
                x: None,
                y: None
            }
        );
    }

    #[test]
    fn test_unknown_op_rejected() {
        assert!(Script::from_json(r#"{"ops": [{"op": "explode"}]}"#).is_err());
    }

    #[test]
    fn test_replay_draw_undo_redo() {
        let script = Script::from_json(
            r#"{"ops": [
                {"op": "tool", "tool": "rectangle"},
                {"op": "begin", "x": 10, "y": 10},
                {"op": "extend", "x": 50, "y": 50},
                {"op": "end"},
                {"op": "begin", "x": 100, "y": 100},
                {"op": "extend", "x": 150, "y": 150},
                {"op": "end"},
                {"op": "undo"},
                {"op": "undo"},
                {"op": "undo"},
                {"op": "redo"}
            ]}"#,
        )
        .unwrap();

        let mut canvas = canvas();
        let report = replay(&mut canvas, &script.ops);

        assert_eq!(report.ignored, 1);
        assert_eq!(canvas.strokes().len(), 1);
        assert_eq!(
            canvas.strokes()[0].kind(),
            &StrokeKind::Rectangle { filled: false }
        );
        assert!(!canvas.is_dirty());
    }

    #[test]
    fn test_text_uses_captured_anchor() {
        let script = Script::from_json(
            r#"{"ops": [
                {"op": "tool", "tool": "text", "font_size": 18},
                {"op": "begin", "x": 30, "y": 60},
                {"op": "text", "text": "hello"},
                {"op": "text", "text": "orphan"}
            ]}"#,
        )
        .unwrap();

        let mut canvas = canvas();
        let report = replay(&mut canvas, &script.ops);

        assert_eq!(report.ignored, 1);
        let stroke = &canvas.strokes()[0];
        assert_eq!(stroke.text_content(), Some("hello"));
        assert_eq!(stroke.font_size(), Some(18.0));
        assert_eq!(stroke.first_point(), Point::new(30.0, 60.0));
    }

    #[test]
    fn test_select_and_delete() {
        let script = Script::from_json(
            r#"{"ops": [
                {"op": "tool", "tool": "circle"},
                {"op": "begin", "x": 10, "y": 10},
                {"op": "extend", "x": 60, "y": 60},
                {"op": "end"},
                {"op": "select", "x": 30, "y": 30},
                {"op": "delete_selected"}
            ]}"#,
        )
        .unwrap();

        let mut canvas = canvas();
        let report = replay(&mut canvas, &script.ops);
        assert_eq!(report.ignored, 0);
        assert!(canvas.strokes().is_empty());
        assert!(canvas.can_undo());
    }
}
