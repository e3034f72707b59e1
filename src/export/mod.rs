//! # Export Pipeline
//!
//! Wraps one asynchronous encode per job: allocates a fresh output location,
//! translates the assembled composition into external `ffmpeg` processes,
//! streams composited frames to the encoder, and reports exactly one
//! terminal outcome. Also owns the destructive temp-directory sweep.

pub mod encoder;
pub mod pipeline;

pub use pipeline::{ExportJob, Exporter, JobPayload};
