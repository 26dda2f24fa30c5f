//! Canvas configuration.

use crate::history::MAX_UNDO_HISTORY;
use crate::input::MIN_SAMPLE_DISTANCE;
use crate::snapshot::RebuildMode;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Maximum number of committed strokes kept on the canvas.
pub const MAX_STROKES: usize = 500;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Tunables of a canvas. Every field has a default, so partial files work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Undo generations kept.
    pub history_limit: usize,
    /// Committed strokes kept; the oldest are evicted first.
    pub stroke_limit: usize,
    /// Samples closer than this to the previous point are dropped.
    pub min_sample_distance: f64,
    /// Size of the snapshot cache image.
    pub viewport: Size,
    /// Build gesture-end geometry on the rayon pool.
    pub offload_geometry: bool,
    /// Where snapshot cache rebuilds run.
    pub rebuild_mode: RebuildMode,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            history_limit: MAX_UNDO_HISTORY,
            stroke_limit: MAX_STROKES,
            min_sample_distance: MIN_SAMPLE_DISTANCE,
            viewport: Size::new(1920.0, 1080.0),
            offload_geometry: true,
            rebuild_mode: RebuildMode::Background,
        }
    }
}

impl CanvasConfig {
    /// Configuration that does all work on the calling thread.
    pub fn inline() -> Self {
        Self {
            offload_geometry: false,
            rebuild_mode: RebuildMode::Inline,
            ..Self::default()
        }
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded canvas configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid("history_limit must be positive".into()));
        }
        if self.stroke_limit == 0 {
            return Err(ConfigError::Invalid("stroke_limit must be positive".into()));
        }
        if !self.min_sample_distance.is_finite() || self.min_sample_distance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "min_sample_distance must be a non-negative number, got {}",
                self.min_sample_distance
            )));
        }
        if !(self.viewport.width >= 1.0 && self.viewport.height >= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "viewport must be at least 1x1, got {}x{}",
                self.viewport.width, self.viewport.height
            )));
        }
        Ok(())
    }
}
