//! # clipforge
//!
//! Short-form video editing core: trimming, pixel effects, text overlays,
//! audio merging, and multi-clip composition, exporting each operation as a
//! single media file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clipforge::{config::Config, editor::VideoEditor, media::MediaProbe};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let editor = VideoEditor::new(config);
//!
//! let clip = MediaProbe::probe("clip.mp4")?;
//! let output = editor.trim(&clip, 2.0, 6.0).await?;
//! println!("trimmed clip written to {:?}", output);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The pipeline splits into synchronous assembly and one asynchronous
//! encode per job:
//!
//! - [`media`] - source handles and `ffprobe`-backed inspection
//! - [`timeline`] - orientation normalization, placement, and track
//!   sequencing
//! - [`overlay`] - fading text layer trees
//! - [`effects`] - named per-frame pixel filters
//! - [`render`] - the frame compositor and glyph rasterization
//! - [`export`] - export jobs, `ffmpeg` plumbing, and the cleanup sweep
//! - [`editor`] - the operation surface tying the above together
//!
//! ## Custom Effects
//!
//! Effects are resolved by name from a registry; callers can add their own
//! by implementing the [`Effect`](effects::Effect) trait:
//!
//! ```rust,no_run
//! use clipforge::effects::{Effect, EffectRegistry};
//! use clipforge::render::Frame;
//! use clipforge::error::Result;
//!
//! struct Washout;
//!
//! impl Effect for Washout {
//!     fn name(&self) -> &str {
//!         "washout"
//!     }
//!
//!     fn description(&self) -> &str {
//!         "Overexposed washout"
//!     }
//!
//!     fn apply(&self, frame: &mut Frame) -> Result<()> {
//!         // Your pixel work here
//!         Ok(())
//!     }
//! }
//! ```

pub mod config;
pub mod editor;
pub mod effects;
pub mod error;
pub mod export;
pub mod geometry;
pub mod media;
pub mod overlay;
pub mod render;
pub mod timeline;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    editor::VideoEditor,
    effects::{Effect, EffectRegistry},
    error::{EditError, Result},
    media::{MediaProbe, MediaSource},
    timeline::MergeStrategy,
};
