use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the clipforge library
#[derive(Error, Debug)]
pub enum EditError {
    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while inspecting source media
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to probe media file {path}: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },

    #[error("No video track in {path}")]
    MissingVideoTrack { path: PathBuf },

    #[error("Unsupported media format: {path}")]
    UnsupportedFormat { path: PathBuf },
}

/// Errors raised while assembling a composition timeline
#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("Track insertion failed at {at:.3}s for {duration:.3}s: {reason}")]
    InsertionFailed {
        at: f64,
        duration: f64,
        reason: String,
    },

    #[error("No source contributed to the timeline")]
    EmptyTimeline,

    #[error("Invalid time range [{start:.3}s, {end:.3}s)")]
    InvalidTimeRange { start: f64, end: f64 },
}

/// Errors raised by the export pipeline
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Missing bundled resource: {name}")]
    MissingResource { name: String },

    #[error("Bundled resource {name} is unusable: {reason}")]
    InvalidResource { name: String, reason: String },

    #[error("External encoder not found on PATH: {command}")]
    EncoderUnavailable { command: String },

    #[error("Encode failed: {reason}")]
    EncodeFailed { reason: String },

    #[error("Encoder finished but produced no output at {path}")]
    OutputMissing { path: PathBuf },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using EditError
pub type Result<T> = std::result::Result<T, EditError>;
