use std::path::PathBuf;

use crate::geometry::{Size, Transform};

/// Handle to a readable source video (and optionally audio) stream.
///
/// Immutable once obtained; the pipeline holds it only for the duration of a
/// single editing operation. `preferred_transform` is the raw orientation
/// metadata recorded by the capture device, untouched until the orientation
/// normalizer derives a corrected placement from it.
#[derive(Debug, Clone)]
pub struct MediaSource {
    pub path: PathBuf,
    pub natural_size: Size,
    pub duration: f64,
    pub preferred_transform: Transform,
    pub has_audio: bool,
}

impl MediaSource {
    pub fn new<P: Into<PathBuf>>(
        path: P,
        natural_size: Size,
        duration: f64,
        preferred_transform: Transform,
        has_audio: bool,
    ) -> Self {
        Self {
            path: path.into(),
            natural_size,
            duration,
            preferred_transform,
            has_audio,
        }
    }

    /// File stem used in log lines.
    pub fn name(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("source")
    }
}
