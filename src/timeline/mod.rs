//! # Timeline Assembly
//!
//! Builds a normalized multi-track composition from heterogeneous source
//! clips: orientation correction, scale-and-center placement, timed opacity
//! transitions, and silence substitution for audio-less sources.

pub mod builder;
pub mod layer;
pub mod orientation;
pub mod types;

pub use builder::TimelineBuilder;
pub use layer::{LayerInstruction, OpacityProgram};
pub use orientation::Orientation;
pub use types::{
    Composition, CompositionInstruction, MergeStrategy, RenderTarget, SegmentSource, TimelineTrack,
    TrackKind, TrackSegment,
};
