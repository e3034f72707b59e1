use crate::error::Result;
use crate::render::Frame;

/// Core trait for per-frame pixel filters.
pub trait Effect: Send + Sync {
    /// Returns the unique name of this effect
    fn name(&self) -> &str;

    /// Returns a human-readable description of this effect
    fn description(&self) -> &str;

    /// Apply the effect to a video frame in place.
    fn apply(&self, frame: &mut Frame) -> Result<()>;
}
