//! # Source Media
//!
//! Read-only handles to the caller's media files plus the `ffprobe`-backed
//! inspector that builds them. The pipeline never decodes media here; it only
//! reads stream metadata (geometry, duration, orientation, audio presence).

pub mod probe;
pub mod source;

pub use probe::MediaProbe;
pub use source::MediaSource;
