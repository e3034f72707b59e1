use crate::config::RenderConfig;
use crate::error::TimelineError;
use crate::geometry::{Size, TimeRange};
use crate::media::MediaSource;
use crate::timeline::layer::LayerInstruction;

/// Media kind of a timeline track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

/// How multiple sources combine into one composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Clips placed back-to-back
    Serial,
    /// Clips overlapping, with picture-in-picture placement
    Simultaneous,
}

/// What a track segment reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentSource {
    /// Index into the composition's source list
    Clip(usize),
    /// The shared bundled silence asset
    Silence,
}

/// One source contribution to a track: a sub-range of the source placed at
/// an insert time on the timeline.
#[derive(Debug, Clone)]
pub struct TrackSegment {
    pub source: SegmentSource,
    pub source_range: TimeRange,
    pub insert_at: f64,

    /// Source is shorter than the spanned range and repeats to fill it
    /// (silence substitution only).
    pub looped: bool,
}

impl TrackSegment {
    pub fn new(source: SegmentSource, source_range: TimeRange, insert_at: f64) -> Self {
        Self {
            source,
            source_range,
            insert_at,
            looped: false,
        }
    }

    /// The window this segment occupies on the timeline.
    pub fn timeline_range(&self) -> TimeRange {
        TimeRange::new(self.insert_at, self.source_range.duration)
    }
}

/// One ordered sequence of same-kind segments within a composition.
#[derive(Debug, Clone)]
pub struct TimelineTrack {
    pub kind: TrackKind,
    pub segments: Vec<TrackSegment>,
}

impl TimelineTrack {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            segments: Vec::new(),
        }
    }

    /// Insert a segment, validating its time arithmetic.
    ///
    /// Entries must keep non-decreasing insert times; overlap is legal (the
    /// simultaneous strategy relies on it), gaps and ordering are the
    /// builder's business.
    pub fn insert(&mut self, segment: TrackSegment) -> Result<(), TimelineError> {
        if !segment.source_range.is_valid() {
            return Err(TimelineError::InvalidTimeRange {
                start: segment.source_range.start,
                end: segment.source_range.end(),
            });
        }

        if segment.insert_at < 0.0 || !segment.insert_at.is_finite() {
            return Err(TimelineError::InsertionFailed {
                at: segment.insert_at,
                duration: segment.source_range.duration,
                reason: "negative or non-finite insert time".to_string(),
            });
        }

        if let Some(last) = self.segments.last() {
            if segment.insert_at < last.insert_at {
                return Err(TimelineError::InsertionFailed {
                    at: segment.insert_at,
                    duration: segment.source_range.duration,
                    reason: "insert times must be non-decreasing".to_string(),
                });
            }
        }

        self.segments.push(segment);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Latest end time over all segments.
    pub fn end(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.timeline_range().end())
            .fold(0.0, f64::max)
    }

    /// Segments whose timeline window covers `t`, with their indices.
    pub fn active_at(&self, t: f64) -> impl Iterator<Item = (usize, &TrackSegment)> {
        self.segments
            .iter()
            .enumerate()
            .filter(move |(_, s)| s.timeline_range().contains(t))
    }
}

/// Output frame geometry and rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTarget {
    pub size: Size,
    pub fps: f64,
}

impl RenderTarget {
    pub fn new(size: Size, fps: f64) -> Self {
        Self { size, fps }
    }

    /// Pick the output preset by the wider-than-tall test of the dominant
    /// source track.
    pub fn for_source(source: &MediaSource, config: &RenderConfig) -> Self {
        let size = if source.natural_size.is_landscape() {
            config.landscape
        } else {
            config.portrait
        };
        Self::new(size, config.fps)
    }

    pub fn width_px(&self) -> u32 {
        self.size.width.round() as u32
    }

    pub fn height_px(&self) -> u32 {
        self.size.height.round() as u32
    }
}

/// Overall instruction for one timeline: its time range and the layer
/// instructions in top-to-bottom stacking order.
///
/// Exactly one of these per composition; there are no mid-timeline
/// instruction splits.
#[derive(Debug, Clone)]
pub struct CompositionInstruction {
    pub time_range: TimeRange,
    pub layers: Vec<LayerInstruction>,
}

/// The assembled multi-track timeline handed to the export step.
#[derive(Debug, Clone)]
pub struct Composition {
    /// Sources that actually contributed, in insertion order
    pub sources: Vec<MediaSource>,
    pub video: TimelineTrack,
    pub audio: TimelineTrack,
    pub instruction: CompositionInstruction,
    pub render: RenderTarget,
    pub duration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Transform;

    #[test]
    fn test_insert_rejects_bad_ranges() {
        let mut track = TimelineTrack::new(TrackKind::Video);

        let bad_range = TrackSegment::new(SegmentSource::Clip(0), TimeRange::new(0.0, 0.0), 0.0);
        assert!(track.insert(bad_range).is_err());

        let bad_insert = TrackSegment::new(SegmentSource::Clip(0), TimeRange::new(0.0, 1.0), -2.0);
        assert!(track.insert(bad_insert).is_err());

        let ok = TrackSegment::new(SegmentSource::Clip(0), TimeRange::new(0.0, 1.0), 0.0);
        assert!(track.insert(ok).is_ok());

        let backwards = TrackSegment::new(SegmentSource::Clip(1), TimeRange::new(0.0, 1.0), -0.5);
        assert!(track.insert(backwards).is_err());
    }

    #[test]
    fn test_track_end_and_active_lookup() {
        let mut track = TimelineTrack::new(TrackKind::Video);
        track
            .insert(TrackSegment::new(SegmentSource::Clip(0), TimeRange::new(0.0, 3.0), 0.0))
            .unwrap();
        track
            .insert(TrackSegment::new(SegmentSource::Clip(1), TimeRange::new(0.0, 5.0), 3.0))
            .unwrap();

        assert!((track.end() - 8.0).abs() < 1e-9);

        let active: Vec<usize> = track.active_at(4.0).map(|(i, _)| i).collect();
        assert_eq!(active, vec![1]);

        // Overlapping segments are both active.
        let mut overlapped = TimelineTrack::new(TrackKind::Video);
        overlapped
            .insert(TrackSegment::new(SegmentSource::Clip(0), TimeRange::new(0.0, 10.0), 0.0))
            .unwrap();
        overlapped
            .insert(TrackSegment::new(SegmentSource::Clip(1), TimeRange::new(0.0, 4.0), 3.0))
            .unwrap();
        let active: Vec<usize> = overlapped.active_at(5.0).map(|(i, _)| i).collect();
        assert_eq!(active, vec![0, 1]);
    }

    #[test]
    fn test_render_target_preset_choice() {
        let config = RenderConfig::default();

        let landscape = MediaSource::new(
            "a.mp4",
            Size::new(1920.0, 1080.0),
            3.0,
            Transform::IDENTITY,
            true,
        );
        let target = RenderTarget::for_source(&landscape, &config);
        assert_eq!(target.size, config.landscape);

        let portrait = MediaSource::new(
            "b.mp4",
            Size::new(720.0, 1280.0),
            3.0,
            Transform::IDENTITY,
            true,
        );
        let target = RenderTarget::for_source(&portrait, &config);
        assert_eq!(target.size, config.portrait);
        assert!((target.fps - config.fps).abs() < 1e-9);
    }
}
