use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, TimelineError};
use crate::geometry::{TimeRange, Transform};
use crate::media::MediaSource;
use crate::timeline::layer::LayerInstruction;
use crate::timeline::types::{
    Composition, CompositionInstruction, MergeStrategy, RenderTarget, SegmentSource, TimelineTrack,
    TrackKind, TrackSegment,
};

/// Sequences source tracks into a single composition.
///
/// Assembly is synchronous pure computation; per-source failures are logged
/// and the source skipped, so a partial timeline is an acceptable outcome.
/// Only an empty result aborts the build.
pub struct TimelineBuilder<'a> {
    config: &'a Config,
    strategy: MergeStrategy,
    animation: bool,
}

impl<'a> TimelineBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            strategy: MergeStrategy::Serial,
            animation: false,
        }
    }

    pub fn strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn animation(mut self, animation: bool) -> Self {
        self.animation = animation;
        self
    }

    /// Build a composition from the given sources, substituting the shared
    /// silence asset wherever a source has no audio track.
    pub fn build(&self, sources: &[MediaSource], silence: &MediaSource) -> Result<Composition> {
        let placeable: Vec<&MediaSource> = sources
            .iter()
            .filter(|source| {
                let ok = TimeRange::new(0.0, source.duration).is_valid();
                if !ok {
                    warn!(
                        "Skipping {}: unusable duration {:.3}s",
                        source.name(),
                        source.duration
                    );
                }
                ok
            })
            .collect();

        if placeable.is_empty() {
            return Err(TimelineError::EmptyTimeline.into());
        }

        match self.strategy {
            MergeStrategy::Serial => self.build_serial(&placeable, silence),
            MergeStrategy::Simultaneous => self.build_simultaneous(&placeable, silence),
        }
    }

    /// Place one video track over a separate audio source, clamping the
    /// audio to the video's duration.
    pub fn build_audio_overlay(
        &self,
        video_source: &MediaSource,
        audio_source: &MediaSource,
    ) -> Result<Composition> {
        let duration = video_source.duration;
        if !TimeRange::new(0.0, duration).is_valid() {
            return Err(TimelineError::InvalidTimeRange {
                start: 0.0,
                end: duration,
            }
            .into());
        }

        let mut sources = vec![video_source.clone()];
        let mut video = TimelineTrack::new(TrackKind::Video);
        let mut audio = TimelineTrack::new(TrackKind::Audio);

        video.insert(TrackSegment::new(
            SegmentSource::Clip(0),
            TimeRange::new(0.0, duration),
            0.0,
        ))?;

        if audio_source.has_audio {
            let clamped = audio_source.duration.min(duration);
            audio.insert(TrackSegment::new(
                SegmentSource::Clip(sources.len()),
                TimeRange::new(0.0, clamped),
                0.0,
            ))?;
            sources.push(audio_source.clone());
        } else {
            warn!("Audio source {} has no audio track", audio_source.name());
        }

        // The output keeps the video's own geometry.
        let render = RenderTarget::new(video_source.natural_size, self.config.render.fps);
        let layer = LayerInstruction::placed(0, video_source, video_source.natural_size);

        Ok(Composition {
            sources,
            video,
            audio,
            instruction: CompositionInstruction {
                time_range: TimeRange::new(0.0, duration),
                layers: vec![layer],
            },
            render,
            duration,
        })
    }

    fn build_serial(&self, sources: &[&MediaSource], silence: &MediaSource) -> Result<Composition> {
        let transition = self.config.composition.transition_duration;

        let mut included: Vec<MediaSource> = Vec::new();
        let mut video = TimelineTrack::new(TrackKind::Video);
        let mut audio = TimelineTrack::new(TrackKind::Audio);
        let mut layers: Vec<LayerInstruction> = Vec::new();
        let mut insert_time = 0.0;

        for &source in sources {
            let duration = source.duration;
            let clip = SegmentSource::Clip(included.len());
            let segment_index = video.segments.len();

            if let Err(e) = video.insert(TrackSegment::new(
                clip,
                TimeRange::new(0.0, duration),
                insert_time,
            )) {
                warn!("Load track error for {}: {}", source.name(), e);
                continue;
            }

            if let Err(e) = audio.insert(self.audio_segment(source, clip, duration, insert_time, silence)) {
                warn!("Load track error for {}: {}", source.name(), e);
                video.segments.pop();
                continue;
            }

            let target = if source.natural_size.is_landscape() {
                self.config.render.landscape
            } else {
                self.config.render.portrait
            };
            let mut layer = LayerInstruction::placed(segment_index, source, target);

            // Hide the track before changing to the next one.
            let end_time = insert_time + duration;
            if self.animation {
                layer.add_ramp(TimeRange::new(end_time, transition), 1.0, 0.0);
            } else {
                layer.add_cut(end_time, 0.0);
            }
            layers.push(layer);

            included.push(source.clone());
            debug!(
                "Placed {} at {:.3}s for {:.3}s",
                source.name(),
                insert_time,
                duration
            );
            insert_time += duration;
        }

        if included.is_empty() {
            return Err(TimelineError::EmptyTimeline.into());
        }

        let render = RenderTarget::for_source(&included[0], &self.config.render);
        info!(
            "Serial timeline: {} clips, {:.3}s total, render {}x{}",
            included.len(),
            insert_time,
            render.width_px(),
            render.height_px()
        );

        Ok(Composition {
            sources: included,
            video,
            audio,
            instruction: CompositionInstruction {
                time_range: TimeRange::new(0.0, insert_time),
                layers,
            },
            render,
            duration: insert_time,
        })
    }

    fn build_simultaneous(
        &self,
        sources: &[&MediaSource],
        silence: &MediaSource,
    ) -> Result<Composition> {
        let settings = &self.config.composition;
        let transition = settings.transition_duration;

        let mut included: Vec<MediaSource> = Vec::new();
        let mut video = TimelineTrack::new(TrackKind::Video);
        let mut audio = TimelineTrack::new(TrackKind::Audio);
        let mut layers: Vec<LayerInstruction> = Vec::new();
        let mut total_duration = 0.0;

        let last_index = sources.len() - 1;

        for (index, &source) in sources.iter().enumerate() {
            let duration = source.duration;
            // Every clip after the first starts at the fixed offset.
            let insert_at = if index == 0 { 0.0 } else { settings.simultaneous_offset };
            let clip = SegmentSource::Clip(included.len());
            let segment_index = video.segments.len();

            if let Err(e) = video.insert(TrackSegment::new(
                clip,
                TimeRange::new(0.0, duration),
                insert_at,
            )) {
                warn!("Load track error for {}: {}", source.name(), e);
                continue;
            }

            if let Err(e) = audio.insert(self.audio_segment(source, clip, duration, insert_at, silence)) {
                warn!("Load track error for {}: {}", source.name(), e);
                video.segments.pop();
                continue;
            }

            let is_last = index == last_index;
            let mut layer = if is_last {
                let target = if source.natural_size.is_landscape() {
                    self.config.render.landscape
                } else {
                    self.config.render.portrait
                };
                LayerInstruction::placed(segment_index, source, target)
            } else {
                // Reduced picture-in-picture placement at a fixed offset.
                let mut pip = LayerInstruction::placed(segment_index, source, settings.pip_size);
                pip.transform = pip
                    .transform
                    .then(&Transform::translation(settings.pip_x_offset, 0.0));
                pip
            };

            if self.animation && !is_last {
                layer.add_ramp(TimeRange::new(insert_at, transition), 0.0, 1.0);
                layer.add_ramp(TimeRange::new(settings.pip_fade_out_mark, transition), 1.0, 0.0);
            }
            layers.push(layer);

            included.push(source.clone());
            // Mirrors the serial running-time accumulation even though the
            // clips overlap.
            total_duration += duration;
        }

        if included.is_empty() {
            return Err(TimelineError::EmptyTimeline.into());
        }

        let render = RenderTarget::for_source(&included[0], &self.config.render);
        info!(
            "Simultaneous timeline: {} clips, {:.3}s total, render {}x{}",
            included.len(),
            total_duration,
            render.width_px(),
            render.height_px()
        );

        Ok(Composition {
            sources: included,
            video,
            audio,
            instruction: CompositionInstruction {
                time_range: TimeRange::new(0.0, total_duration),
                layers,
            },
            render,
            duration: total_duration,
        })
    }

    fn audio_segment(
        &self,
        source: &MediaSource,
        clip: SegmentSource,
        duration: f64,
        insert_at: f64,
        silence: &MediaSource,
    ) -> TrackSegment {
        if source.has_audio {
            TrackSegment::new(clip, TimeRange::new(0.0, duration), insert_at)
        } else {
            debug!("Substituting silence for {}", source.name());
            let mut segment = TrackSegment::new(
                SegmentSource::Silence,
                TimeRange::new(0.0, duration),
                insert_at,
            );
            segment.looped = silence.duration < duration;
            segment
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::timeline::layer::OpacityProgram;

    fn source(name: &str, duration: f64, has_audio: bool) -> MediaSource {
        MediaSource::new(
            format!("{}.mp4", name),
            Size::new(1920.0, 1080.0),
            duration,
            Transform::IDENTITY,
            has_audio,
        )
    }

    fn silence() -> MediaSource {
        let mut s = source("silence", 2.0, true);
        s.natural_size = Size::new(0.0, 0.0);
        s
    }

    fn ramps(layer: &LayerInstruction) -> Vec<(f64, f64, f32, f32)> {
        layer
            .programs
            .iter()
            .filter_map(|p| match p {
                OpacityProgram::Ramp { range, from, to } => {
                    Some((range.start, range.duration, *from, *to))
                }
                OpacityProgram::Cut { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_serial_merge_with_animation() {
        let config = Config::default();
        let a = source("a", 3.0, true);
        let b = source("b", 5.0, false);

        let composition = TimelineBuilder::new(&config)
            .animation(true)
            .build(&[a, b], &silence())
            .unwrap();

        assert!((composition.duration - 8.0).abs() < 1e-9);
        assert_eq!(composition.sources.len(), 2);
        assert_eq!(composition.video.segments.len(), 2);
        assert_eq!(composition.audio.segments.len(), 2);

        // B has no audio: the silence asset fills its slot, trimmed to B's
        // duration and looped because the silence clip is shorter.
        let b_audio = &composition.audio.segments[1];
        assert_eq!(b_audio.source, SegmentSource::Silence);
        assert!((b_audio.source_range.duration - 5.0).abs() < 1e-9);
        assert!((b_audio.insert_at - 3.0).abs() < 1e-9);
        assert!(b_audio.looped);

        // A fades out over [3, 4].
        let a_ramps = ramps(&composition.instruction.layers[0]);
        assert_eq!(a_ramps, vec![(3.0, 1.0, 1.0, 0.0)]);

        // Every ramp is exactly 1 second and begins within the timeline.
        for layer in &composition.instruction.layers {
            for (start, duration, _, _) in ramps(layer) {
                assert!((duration - 1.0).abs() < 1e-9);
                assert!(start >= 0.0 && start <= composition.duration);
            }
        }
    }

    #[test]
    fn test_serial_merge_without_animation_uses_cuts() {
        let config = Config::default();
        let a = source("a", 3.0, true);
        let b = source("b", 5.0, true);

        let composition = TimelineBuilder::new(&config)
            .build(&[a, b], &silence())
            .unwrap();

        let layer = &composition.instruction.layers[0];
        assert_eq!(layer.programs, vec![OpacityProgram::Cut { at: 3.0, opacity: 0.0 }]);
        assert!((layer.opacity_at(2.9) - 1.0).abs() < 1e-6);
        assert!((layer.opacity_at(3.0) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_serial_segments_are_contiguous() {
        let config = Config::default();
        let sources = [
            source("a", 2.0, true),
            source("b", 4.0, true),
            source("c", 1.5, true),
        ];

        let composition = TimelineBuilder::new(&config)
            .build(&sources, &silence())
            .unwrap();

        let segments = &composition.video.segments;
        for pair in segments.windows(2) {
            let end = pair[0].timeline_range().end();
            assert!((pair[1].insert_at - end).abs() < 1e-9);
        }
        assert!((composition.duration - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_unusable_source_is_skipped() {
        let config = Config::default();
        let sources = [source("a", 3.0, true), source("broken", 0.0, true)];

        let composition = TimelineBuilder::new(&config)
            .build(&sources, &silence())
            .unwrap();

        assert_eq!(composition.sources.len(), 1);
        assert!((composition.duration - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_sources_unusable_is_an_error() {
        let config = Config::default();
        let result = TimelineBuilder::new(&config).build(&[source("broken", 0.0, true)], &silence());
        assert!(result.is_err());
    }

    #[test]
    fn test_simultaneous_placement_and_fades() {
        let config = Config::default();
        let sources = [
            source("a", 6.0, true),
            source("b", 6.0, true),
            source("c", 6.0, true),
        ];

        let composition = TimelineBuilder::new(&config)
            .strategy(MergeStrategy::Simultaneous)
            .animation(true)
            .build(&sources, &silence())
            .unwrap();

        // First at zero, the rest at the fixed offset.
        let inserts: Vec<f64> = composition
            .video
            .segments
            .iter()
            .map(|s| s.insert_at)
            .collect();
        assert_eq!(inserts, vec![0.0, 3.0, 3.0]);

        // Running-sum duration, overlap notwithstanding.
        assert!((composition.duration - 18.0).abs() < 1e-9);

        // Non-last layers fade in at their start and out at the fixed mark;
        // the last layer has no opacity program.
        let first = ramps(&composition.instruction.layers[0]);
        assert_eq!(first, vec![(0.0, 1.0, 0.0, 1.0), (10.0, 1.0, 1.0, 0.0)]);
        let second = ramps(&composition.instruction.layers[1]);
        assert_eq!(second, vec![(3.0, 1.0, 0.0, 1.0), (10.0, 1.0, 1.0, 0.0)]);
        assert!(composition.instruction.layers[2].programs.is_empty());
    }

    #[test]
    fn test_simultaneous_pip_stays_inside_render_frame() {
        let config = Config::default();
        let sources = [source("a", 6.0, true), source("b", 6.0, true)];

        let composition = TimelineBuilder::new(&config)
            .strategy(MergeStrategy::Simultaneous)
            .build(&sources, &silence())
            .unwrap();

        let pip = &composition.instruction.layers[0];
        let bbox = pip.transform.map_bounding_box(composition.sources[0].natural_size);
        assert!(bbox.x >= 0.0);
        assert!(bbox.max_x() <= composition.render.size.width + 1e-6);
        assert!(bbox.width <= config.composition.pip_size.width + 1e-6);
    }

    #[test]
    fn test_audio_overlay_clamps_audio_to_video_duration() {
        let config = Config::default();
        let video = source("video", 5.0, true);
        let mut long_audio = source("music", 9.0, true);
        long_audio.path = "music.mp3".into();

        let composition = TimelineBuilder::new(&config)
            .build_audio_overlay(&video, &long_audio)
            .unwrap();

        assert!((composition.duration - 5.0).abs() < 1e-9);
        let inserted = &composition.audio.segments[0];
        assert!((inserted.source_range.duration - 5.0).abs() < 1e-9);

        // Shorter audio keeps its own length.
        let short_audio = source("stinger", 2.0, true);
        let composition = TimelineBuilder::new(&config)
            .build_audio_overlay(&video, &short_audio)
            .unwrap();
        assert!((composition.audio.segments[0].source_range.duration - 2.0).abs() < 1e-9);

        // Output keeps the video's own geometry.
        assert_eq!(composition.render.size, video.natural_size);
    }

    #[test]
    fn test_render_target_follows_dominant_source() {
        let config = Config::default();
        let mut portrait = source("p", 3.0, true);
        portrait.natural_size = Size::new(720.0, 1280.0);
        let landscape = source("l", 3.0, true);

        let composition = TimelineBuilder::new(&config)
            .build(&[portrait, landscape], &silence())
            .unwrap();
        assert_eq!(composition.render.size, config.render.portrait);
    }
}
