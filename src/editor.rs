//! # Editing Service
//!
//! The operation surface callers talk to: trim, effect application, text
//! overlay, audio merge, and multi-clip merge. Stateless by design; the
//! composition root constructs one [`VideoEditor`] from a [`Config`] and
//! passes it to every caller. Assembly runs synchronously on the caller's
//! thread; each operation submits exactly one export job and resolves with
//! the output location or an error.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::effects::EffectRegistry;
use crate::error::{ExportError, Result, TimelineError};
use crate::export::{ExportJob, Exporter};
use crate::geometry::TimeRange;
use crate::media::{MediaProbe, MediaSource};
use crate::overlay::{OverlayBuilder, TextOverlay};
use crate::render::TextRasterizer;
use crate::timeline::{MergeStrategy, TimelineBuilder};

pub struct VideoEditor {
    config: Config,
    effects: EffectRegistry,
    exporter: Exporter,
    silence: Option<MediaSource>,
    rasterizer: Option<Arc<TextRasterizer>>,
}

impl VideoEditor {
    /// Build the service, loading the shared bundled assets once.
    ///
    /// A missing asset does not fail construction; it aborts the operations
    /// that need it, with the remaining operations unaffected.
    pub fn new(config: Config) -> Self {
        let silence_path = config.resources.silence_path();
        let silence = match MediaProbe::probe_audio(&silence_path) {
            Ok(source) => Some(source),
            Err(e) => {
                warn!("Silence asset unavailable at {:?}: {}", silence_path, e);
                None
            }
        };

        let font_path = config.resources.font_path();
        let rasterizer = match TextRasterizer::load(&font_path) {
            Ok(rasterizer) => Some(Arc::new(rasterizer)),
            Err(e) => {
                warn!("Overlay font unavailable at {:?}: {}", font_path, e);
                None
            }
        };

        let exporter = Exporter::new(config.export.clone());

        Self {
            config,
            effects: EffectRegistry::new(),
            exporter,
            silence,
            rasterizer,
        }
    }

    pub fn effects(&self) -> &EffectRegistry {
        &self.effects
    }

    fn silence(&self) -> Result<&MediaSource> {
        self.silence.as_ref().ok_or_else(|| {
            ExportError::MissingResource {
                name: self.config.resources.silence.clone(),
            }
            .into()
        })
    }

    /// Trim a source to the `[start, end)` window.
    pub async fn trim(&self, source: &MediaSource, start: f64, end: f64) -> Result<PathBuf> {
        let range = TimeRange::from_start_end(start, end);
        if !range.is_valid() {
            return Err(TimelineError::InvalidTimeRange { start, end }.into());
        }

        info!("Trimming {} to [{:.2}s, {:.2}s)", source.name(), start, end);
        self.exporter
            .export(ExportJob::trim(source.clone(), range))
            .await
    }

    /// Apply a named pixel effect to a source.
    ///
    /// An unrecognized name resolves to no filter and the output is written
    /// as an untouched copy of the input.
    pub async fn apply_effect(&self, source: &MediaSource, effect_name: &str) -> Result<PathBuf> {
        let effect = self.effects.resolve(effect_name);

        info!("Applying effect '{}' to {}", effect_name, source.name());
        self.exporter
            .export(ExportJob::effect(
                source.clone(),
                effect,
                self.config.render.fps,
            ))
            .await
    }

    /// Merge sources serially and burn fading text overlays into the output.
    ///
    /// Requires the bundled silence clip, black background clip, and overlay
    /// font; a missing one aborts before any track work.
    pub async fn add_text(
        &self,
        sources: &[MediaSource],
        overlays: &[TextOverlay],
    ) -> Result<PathBuf> {
        let silence = self.silence()?;

        let background = self.config.resources.background_path();
        if !background.exists() {
            return Err(ExportError::MissingResource {
                name: self.config.resources.background.clone(),
            }
            .into());
        }

        let rasterizer = self.rasterizer.clone().ok_or_else(|| ExportError::MissingResource {
            name: self.config.resources.font.clone(),
        })?;

        let composition = TimelineBuilder::new(&self.config)
            .animation(true)
            .build(sources, silence)?;
        let tree = OverlayBuilder::new(&self.config.overlay).build(composition.render.size, overlays);

        info!(
            "Adding {} overlay(s) over {} clip(s)",
            overlays.len(),
            composition.sources.len()
        );
        let job = ExportJob::composition(
            "addText",
            composition,
            Some(self.config.resources.silence_path()),
        )
        .with_overlays(tree, rasterizer);
        self.exporter.export(job).await
    }

    /// Replace a video's audio with a separate audio source, clamped to the
    /// video's duration.
    pub async fn merge_audio(
        &self,
        video: &MediaSource,
        audio: &MediaSource,
    ) -> Result<PathBuf> {
        let composition = TimelineBuilder::new(&self.config).build_audio_overlay(video, audio)?;

        info!("Merging audio {} into {}", audio.name(), video.name());
        self.exporter
            .export(ExportJob::composition("mergeAudio", composition, None))
            .await
    }

    /// Combine multiple sources into one output using the given strategy.
    pub async fn merge(
        &self,
        sources: &[MediaSource],
        strategy: MergeStrategy,
        animation: bool,
    ) -> Result<PathBuf> {
        let silence = self.silence()?;

        let composition = TimelineBuilder::new(&self.config)
            .strategy(strategy)
            .animation(animation)
            .build(sources, silence)?;

        info!(
            "Merging {} clip(s), {:?}, animation: {}",
            composition.sources.len(),
            strategy,
            animation
        );
        let job = ExportJob::composition(
            "mergeVideos",
            composition,
            Some(self.config.resources.silence_path()),
        );
        self.exporter.export(job).await
    }

    /// Destructive sweep of the shared temp directory (and, when
    /// configured, the persisted output directory). Callers must serialize
    /// this against any job whose output is still referenced.
    pub fn cleanup_temp(&self) -> Result<()> {
        self.exporter.cleanup()
    }
}
