//! Overmark headless shell.
//!
//! Replays a gesture script through a [`CanvasState`] backed by the CPU
//! compositor and writes the composited display frame as a PNG.

pub mod export;
pub mod script;

use clap::Parser;
use overmark_core::{CanvasConfig, CanvasEvent, CanvasState, ConfigError};
use overmark_render::{FrameStyle, RenderError, SkiaCompositor, render_frame, to_rgba8};
use std::path::PathBuf;
use thiserror::Error;

pub use script::{ReplayReport, Script, ScriptOp, replay};

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Script error: {0}")]
    Script(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("PNG encoding error: {0}")]
    Png(#[from] png::EncodingError),
}

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Overmark headless annotation renderer.
#[derive(Parser, Debug)]
#[command(
    name = "overmark",
    about = "Replay an annotation gesture script and export the frame as PNG"
)]
pub struct CliArgs {
    /// JSON gesture script to replay.
    #[arg(short, long, value_name = "SCRIPT.json")]
    pub script: PathBuf,

    /// Output PNG path.
    #[arg(short, long, value_name = "FILE.png")]
    pub output: PathBuf,

    /// JSON canvas configuration; defaults apply to missing fields.
    #[arg(short, long, value_name = "CONFIG.json")]
    pub config: Option<PathBuf>,

    /// TrueType/OpenType font for text strokes. Text is skipped without one.
    #[arg(short, long, value_name = "FONT.ttf")]
    pub font: Option<PathBuf>,

    /// Do all geometry and cache work on the calling thread.
    #[arg(long)]
    pub inline: bool,
}

impl CliArgs {
    /// Canvas configuration from `--config` and `--inline`.
    pub fn canvas_config(&self) -> AppResult<CanvasConfig> {
        let mut config = match &self.config {
            Some(path) => CanvasConfig::load(path)?,
            None => CanvasConfig::default(),
        };
        if self.inline {
            let inline = CanvasConfig::inline();
            config.offload_geometry = inline.offload_geometry;
            config.rebuild_mode = inline.rebuild_mode;
        }
        Ok(config)
    }
}

/// Run the headless shell.
pub fn run(args: &CliArgs) -> AppResult<()> {
    let config = args.canvas_config()?;
    let compositor = match &args.font {
        Some(path) => SkiaCompositor::load_font(path)?,
        None => SkiaCompositor::new(),
    };
    let script = Script::load(&args.script)?;

    let mut canvas = CanvasState::new(compositor, config);
    let events = canvas.subscribe();
    let report = replay(&mut canvas, &script.ops);

    let committed = events
        .try_iter()
        .filter(|e| matches!(e, CanvasEvent::StrokeCommitted(_)))
        .count();
    log::info!(
        "Replayed {} ops ({} ignored): {} strokes committed, {} on canvas",
        report.applied + report.ignored,
        report.ignored,
        committed,
        canvas.strokes().len()
    );

    let mut style = FrameStyle::default();
    if let Some(background) = script.background {
        style = style.with_background(background.into());
    }
    let frame = render_frame(
        canvas.cache().compositor(),
        &canvas.current_display_state(),
        canvas.viewport_size(),
        &style,
    )?;

    let png = export::encode_png(&to_rgba8(&frame), frame.width(), frame.height())?;
    std::fs::write(&args.output, &png)?;
    log::info!(
        "Wrote {}x{} frame to {} ({} bytes)",
        frame.width(),
        frame.height(),
        args.output.display(),
        png.len()
    );
    Ok(())
}
