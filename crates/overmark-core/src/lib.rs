//! Overmark Core Library
//!
//! Platform-agnostic annotation canvas engine: stroke model, geometry
//! builders, input shaping, selection, history and the snapshot cache.

pub mod canvas;
pub mod config;
pub mod history;
pub mod input;
pub mod selection;
pub mod shapes;
pub mod snapshot;
pub mod tools;

pub use canvas::{BeginOutcome, CanvasEvent, CanvasState, DisplayState};
pub use config::{CanvasConfig, ConfigError};
pub use history::History;
pub use input::InputShaper;
pub use shapes::{ArrowEnds, SerializableColor, Stroke, StrokeGeometry, StrokeId, StrokeKind};
pub use snapshot::{Compositor, RebuildMode, SnapshotCache};
pub use tools::{ToolKind, ToolSettings};
