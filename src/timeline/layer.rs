use crate::geometry::{Size, TimeRange, Transform};
use crate::media::MediaSource;
use crate::timeline::orientation;

/// Timed opacity change attached to a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum OpacityProgram {
    /// Linear interpolation across `range`, holding `to` afterwards.
    Ramp { range: TimeRange, from: f32, to: f32 },

    /// Hard jump to `opacity` at `at`, holding afterwards.
    Cut { at: f64, opacity: f32 },
}

impl OpacityProgram {
    fn begins_at(&self) -> f64 {
        match self {
            OpacityProgram::Ramp { range, .. } => range.start,
            OpacityProgram::Cut { at, .. } => *at,
        }
    }
}

/// Per-track placement transform plus timed opacity programs for one
/// timeline.
///
/// The placement transform is fixed at time zero; only opacity animates.
#[derive(Debug, Clone)]
pub struct LayerInstruction {
    /// Index of the video track segment this instruction drives
    pub segment: usize,

    /// Placement transform mapping source pixels into the render frame
    pub transform: Transform,

    /// Opacity programs in begin-time order
    pub programs: Vec<OpacityProgram>,
}

impl LayerInstruction {
    /// Build the placement instruction for one source track.
    ///
    /// Scale-to-fit on the orientation-corrected width, then center on the
    /// vertical axis. The resulting transform maps the source's bounding box
    /// fully inside `[0, target.width] x [0, target.height]`.
    pub fn placed(segment: usize, source: &MediaSource, target: Size) -> Self {
        let raw = &source.preferred_transform;
        let natural = source.natural_size;
        let fixed = orientation::fixed_transform(raw, natural);

        let (fit_dim, other_dim) = if orientation::classify(raw).is_portrait() {
            (natural.height, natural.width)
        } else {
            (natural.width, natural.height)
        };

        let scale_to_fit = target.width / fit_dim;
        let new_y = target.height / 2.0 - (other_dim * scale_to_fit) / 2.0;

        let transform = fixed
            .then(&Transform::scale(scale_to_fit, scale_to_fit))
            .then(&Transform::translation(0.0, new_y));

        Self {
            segment,
            transform,
            programs: Vec::new(),
        }
    }

    /// Append an opacity ramp, keeping programs ordered by begin time.
    pub fn add_ramp(&mut self, range: TimeRange, from: f32, to: f32) {
        self.programs.push(OpacityProgram::Ramp { range, from, to });
        self.sort_programs();
    }

    /// Append a hard opacity cut, keeping programs ordered by begin time.
    pub fn add_cut(&mut self, at: f64, opacity: f32) {
        self.programs.push(OpacityProgram::Cut { at, opacity });
        self.sort_programs();
    }

    fn sort_programs(&mut self) {
        self.programs
            .sort_by(|a, b| a.begins_at().partial_cmp(&b.begins_at()).unwrap_or(std::cmp::Ordering::Equal));
    }

    /// Evaluate the layer's opacity at timeline time `t`.
    ///
    /// A layer starts fully opaque; each program in order overrides the value
    /// once its begin time has passed, and holds its final value.
    pub fn opacity_at(&self, t: f64) -> f32 {
        let mut value = 1.0;

        for program in &self.programs {
            match program {
                OpacityProgram::Ramp { range, from, to } => {
                    if t < range.start {
                        continue;
                    }
                    if t < range.end() {
                        let progress = ((t - range.start) / range.duration) as f32;
                        value = from + (to - from) * progress;
                    } else {
                        value = *to;
                    }
                }
                OpacityProgram::Cut { at, opacity } => {
                    if t >= *at {
                        value = *opacity;
                    }
                }
            }
        }

        value.clamp(0.0, 1.0)
    }
}
