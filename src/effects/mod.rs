//! # Pixel Effect System
//!
//! Named per-frame pixel filters applied by the effect operation. Effects
//! are resolved from an opaque name by the [`EffectRegistry`]; an
//! unrecognized name resolves to no filter, and the operation degrades to a
//! pass-through rather than erroring.

pub mod registry;
pub mod tone;
pub mod texture;
pub mod traits;

pub use registry::EffectRegistry;
pub use traits::Effect;
