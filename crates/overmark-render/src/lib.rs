//! Overmark Render Library
//!
//! CPU raster backend for the snapshot cache and per-frame composition of
//! the cache image with the live, pending and selected strokes.

mod renderer;
mod skia_impl;

pub use renderer::{FrameStyle, RenderError, RenderResult, render_frame, to_rgba8};
pub use skia_impl::{SkiaCompositor, to_skia_path};

/// Image type produced by [`SkiaCompositor`].
pub use tiny_skia::Pixmap;
