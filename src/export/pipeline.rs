use std::path::PathBuf;
use std::sync::Arc;

use tokio::task;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ExportConfig;
use crate::effects::Effect;
use crate::error::{ExportError, Result};
use crate::export::encoder;
use crate::geometry::TimeRange;
use crate::media::MediaSource;
use crate::overlay::LayerTree;
use crate::render::TextRasterizer;
use crate::timeline::Composition;

/// One asynchronous unit of work producing exactly one output file or one
/// error. Created fresh per call; never reused or mutated after submission.
pub struct ExportJob {
    /// Operation kind label, namespacing the output file name
    pub kind: String,
    pub payload: JobPayload,
}

pub enum JobPayload {
    Trim {
        source: MediaSource,
        range: TimeRange,
    },
    Effect {
        source: MediaSource,
        /// `None` when the requested name resolved to no filter; the job
        /// then degrades to a pass-through copy.
        effect: Option<Box<dyn Effect>>,
        fps: f64,
    },
    Composition {
        composition: Composition,
        overlays: Option<LayerTree>,
        rasterizer: Option<Arc<TextRasterizer>>,
        silence: Option<PathBuf>,
    },
}

impl ExportJob {
    pub fn trim(source: MediaSource, range: TimeRange) -> Self {
        Self {
            kind: "trim".to_string(),
            payload: JobPayload::Trim { source, range },
        }
    }

    pub fn effect(source: MediaSource, effect: Option<Box<dyn Effect>>, fps: f64) -> Self {
        Self {
            kind: "addEffect".to_string(),
            payload: JobPayload::Effect { source, effect, fps },
        }
    }

    pub fn composition(kind: &str, composition: Composition, silence: Option<PathBuf>) -> Self {
        Self {
            kind: kind.to_string(),
            payload: JobPayload::Composition {
                composition,
                overlays: None,
                rasterizer: None,
                silence,
            },
        }
    }

    pub fn with_overlays(mut self, overlays: LayerTree, rasterizer: Arc<TextRasterizer>) -> Self {
        if let JobPayload::Composition {
            overlays: slot,
            rasterizer: raster_slot,
            ..
        } = &mut self.payload
        {
            *slot = Some(overlays);
            *raster_slot = Some(rasterizer);
        }
        self
    }
}

/// Stateless export service.
///
/// Constructed once by the composition root and passed to every caller;
/// the only cross-job side effect it owns is the cleanup sweep.
pub struct Exporter {
    config: ExportConfig,
}

impl Exporter {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Allocate a fresh, globally-unique output path for an operation kind.
    ///
    /// A fresh identifier per call guarantees concurrent jobs never collide.
    pub fn unique_output_path(&self, kind: &str) -> PathBuf {
        self.config
            .temp_root
            .join(format!("{}{}.mp4", kind, Uuid::new_v4()))
    }

    /// Run one export job to its single terminal outcome.
    ///
    /// Assembly already happened on the caller's thread; this schedules the
    /// encode as one background unit of work and resolves once with either
    /// the output location or the error. No cancellation, no retry, no
    /// progress events.
    pub async fn export(&self, job: ExportJob) -> Result<PathBuf> {
        if !encoder::ffmpeg_available() {
            return Err(ExportError::EncoderUnavailable {
                command: "ffmpeg".to_string(),
            }
            .into());
        }

        std::fs::create_dir_all(&self.config.temp_root)?;
        let output = self.unique_output_path(&job.kind);
        info!("Exporting {} -> {:?}", job.kind, output);

        let config = self.config.clone();
        let job_output = output.clone();
        task::spawn_blocking(move || run_job(&config, job, &job_output))
            .await
            .map_err(|e| ExportError::EncodeFailed {
                reason: format!("export task aborted: {}", e),
            })??;

        if !output.exists() {
            return Err(ExportError::OutputMissing { path: output }.into());
        }

        info!("Export complete: {:?}", output);
        Ok(output)
    }

    /// Destructive sweep: removes every file currently present in the temp
    /// root and, when configured, the persisted output directory.
    ///
    /// Unscoped to any particular job; callers must only invoke it when no
    /// previously exported file is still in use.
    pub fn cleanup(&self) -> Result<()> {
        sweep_directory(&self.config.temp_root);
        if self.config.sweep_output_dir {
            if let Some(output_dir) = &self.config.output_dir {
                sweep_directory(output_dir);
            }
        }
        Ok(())
    }
}

fn sweep_directory(dir: &std::path::Path) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    let mut removed = 0usize;
    for entry in entries.flatten() {
        let path = entry.path();
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };

        match result {
            Ok(()) => removed += 1,
            Err(e) => warn!("Failed to delete {:?}: {}", path, e),
        }
    }

    info!("Swept {} entries from {:?}", removed, dir);
}

fn run_job(config: &ExportConfig, job: ExportJob, output: &std::path::Path) -> Result<()> {
    match job.payload {
        JobPayload::Trim { source, range } => {
            encoder::encode_trim(config, &source.path, range, output)
        }
        JobPayload::Effect { source, effect, fps } => match effect {
            Some(effect) => encoder::encode_effect(config, &source, effect.as_ref(), fps, output),
            None => encoder::encode_copy(&source.path, output),
        },
        JobPayload::Composition {
            composition,
            overlays,
            rasterizer,
            silence,
        } => encoder::encode_composition(
            config,
            &composition,
            overlays.as_ref(),
            rasterizer.as_deref(),
            silence.as_deref(),
            output,
        ),
    }
}
