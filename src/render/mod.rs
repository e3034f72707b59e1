//! # Frame Rendering
//!
//! Owns everything that touches pixels during export: the RGB frame type,
//! the per-frame compositor that places timeline layers into the render
//! frame, and the glyph rasterizer for text overlays.

pub mod compositor;
pub mod frame;
pub mod text;

pub use compositor::FrameCompositor;
pub use frame::Frame;
pub use text::TextRasterizer;
