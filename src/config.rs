use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    geometry::Size,
};

/// Main configuration for clipforge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Output frame geometry presets
    pub render: RenderConfig,

    /// Timeline assembly settings
    pub composition: CompositionConfig,

    /// Text overlay settings
    pub overlay: OverlayConfig,

    /// Encoder and filesystem settings
    pub export: ExportConfig,

    /// Bundled resource locations
    pub resources: ResourceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            composition: CompositionConfig::default(),
            overlay: OverlayConfig::default(),
            export: ExportConfig::default(),
            resources: ResourceConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|_| ConfigError::ParseFailed {
            path: path.display().to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.render.validate()?;
        self.composition.validate()?;
        self.overlay.validate()?;
        self.export.validate()?;
        Ok(())
    }
}

/// Output frame geometry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Preset used when the dominant source is taller than wide
    pub portrait: Size,

    /// Preset used when the dominant source is wider than tall
    pub landscape: Size,

    /// Output frame rate
    pub fps: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            portrait: Size::new(720.0, 1280.0),
            landscape: Size::new(1920.0, 1080.0),
            fps: 30.0,
        }
    }
}

impl RenderConfig {
    fn validate(&self) -> Result<()> {
        for (key, size) in [("render.portrait", self.portrait), ("render.landscape", self.landscape)] {
            if size.width <= 0.0 || size.height <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: format!("{}x{}", size.width, size.height),
                }
                .into());
            }
        }

        if self.fps <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "render.fps".to_string(),
                value: self.fps.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Timeline assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositionConfig {
    /// Duration of the opacity ramp between serial clips (seconds)
    pub transition_duration: f64,

    /// Start offset for every clip after the first in a simultaneous merge
    pub simultaneous_offset: f64,

    /// Timestamp at which picture-in-picture clips start fading out
    pub pip_fade_out_mark: f64,

    /// Picture-in-picture placement size
    pub pip_size: Size,

    /// Fixed horizontal offset of the picture-in-picture placement
    pub pip_x_offset: f64,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            transition_duration: 1.0,
            simultaneous_offset: 3.0,
            pip_fade_out_mark: 10.0,
            pip_size: Size::new(480.0, 270.0),
            pip_x_offset: 40.0,
        }
    }
}

impl CompositionConfig {
    fn validate(&self) -> Result<()> {
        if self.transition_duration <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "composition.transition_duration".to_string(),
                value: self.transition_duration.to_string(),
            }
            .into());
        }

        if self.simultaneous_offset < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "composition.simultaneous_offset".to_string(),
                value: self.simultaneous_offset.to_string(),
            }
            .into());
        }

        if self.pip_size.width <= 0.0 || self.pip_size.height <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "composition.pip_size".to_string(),
                value: format!("{}x{}", self.pip_size.width, self.pip_size.height),
            }
            .into());
        }

        Ok(())
    }
}

/// Text overlay configuration
///
/// Overlay rectangles and font sizes arrive in the display units the caller
/// authored them in; they are rescaled to the render size using these
/// reference dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Display width the overlay rectangles were authored against
    pub reference_width: f64,

    /// Display height the overlay rectangles were authored against
    pub reference_height: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            reference_width: 390.0,
            reference_height: 300.0,
        }
    }
}

impl OverlayConfig {
    fn validate(&self) -> Result<()> {
        if self.reference_width <= 0.0 || self.reference_height <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "overlay.reference_size".to_string(),
                value: format!("{}x{}", self.reference_width, self.reference_height),
            }
            .into());
        }

        Ok(())
    }
}

/// Encoder and filesystem configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory that receives freshly exported files
    pub temp_root: PathBuf,

    /// Persisted output directory, also removed by the cleanup sweep when
    /// `sweep_output_dir` is set
    pub output_dir: Option<PathBuf>,

    /// Include `output_dir` in the cleanup sweep
    pub sweep_output_dir: bool,

    /// Video codec passed to the encoder
    pub codec: String,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,

    /// Number of parallel frame-processing threads
    pub processing_threads: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir().join("clipforge"),
            output_dir: None,
            sweep_output_dir: false,
            codec: "libx264".to_string(),
            quality: 90,
            processing_threads: num_cpus::get(),
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "export.quality".to_string(),
                value: self.quality.to_string(),
            }
            .into());
        }

        if self.processing_threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "export.processing_threads".to_string(),
                value: self.processing_threads.to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Bundled resource configuration
///
/// The silence clip substitutes for missing audio tracks, the background
/// clip backs the text-overlay operation, and the font file drives overlay
/// rasterization. A missing file aborts only the operations that need it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Directory holding the bundled assets
    pub dir: PathBuf,

    /// Silent audio clip file name
    pub silence: String,

    /// Black background video file name
    pub background: String,

    /// Overlay font file name
    pub font: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("resources"),
            silence: "silence.mp3".to_string(),
            background: "black.mp4".to_string(),
            font: "overlay.ttf".to_string(),
        }
    }
}

impl ResourceConfig {
    pub fn silence_path(&self) -> PathBuf {
        self.dir.join(&self.silence)
    }

    pub fn background_path(&self) -> PathBuf {
        self.dir.join(&self.background)
    }

    pub fn font_path(&self) -> PathBuf {
        self.dir.join(&self.font)
    }
}
