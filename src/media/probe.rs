use std::path::Path;
use std::process::Command;

use tracing::{debug, warn};

use crate::error::{MediaError, Result};
use crate::geometry::{Size, Transform};
use crate::media::source::MediaSource;

/// `ffprobe`-backed media inspector.
///
/// Collaborators that hold only a file path use this to obtain the
/// [`MediaSource`] attributes the pipeline needs: natural size, duration,
/// orientation metadata, and audio presence.
pub struct MediaProbe;

impl MediaProbe {
    pub fn available() -> bool {
        Command::new("ffprobe")
            .arg("-version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Inspect a media file and build a [`MediaSource`] for it.
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<MediaSource> {
        let path = path.as_ref();

        let output = Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .map_err(|e| MediaError::ProbeFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(MediaError::ProbeFailed {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let json: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(|e| MediaError::ProbeFailed {
                path: path.to_path_buf(),
                reason: format!("unparseable ffprobe output: {}", e),
            })?;

        Self::from_probe_json(path, &json)
    }

    /// Inspect an audio-only file (e.g. a music track for the audio-merge
    /// operation). The returned handle has a zero natural size and an
    /// identity transform; only duration and audio presence matter.
    pub fn probe_audio<P: AsRef<Path>>(path: P) -> Result<MediaSource> {
        let path = path.as_ref();

        let output = Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .map_err(|e| MediaError::ProbeFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(MediaError::ProbeFailed {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let json: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(|e| MediaError::ProbeFailed {
                path: path.to_path_buf(),
                reason: format!("unparseable ffprobe output: {}", e),
            })?;

        Self::audio_from_probe_json(path, &json)
    }

    fn audio_from_probe_json(path: &Path, json: &serde_json::Value) -> Result<MediaSource> {
        let streams = json["streams"].as_array().cloned().unwrap_or_default();

        let has_audio = streams
            .iter()
            .any(|s| s["codec_type"].as_str() == Some("audio"));
        if !has_audio {
            return Err(MediaError::UnsupportedFormat {
                path: path.to_path_buf(),
            }
            .into());
        }

        let duration = json["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);

        Ok(MediaSource::new(
            path,
            Size::new(0.0, 0.0),
            duration,
            Transform::IDENTITY,
            true,
        ))
    }

    fn from_probe_json(path: &Path, json: &serde_json::Value) -> Result<MediaSource> {
        let streams = json["streams"].as_array().cloned().unwrap_or_default();

        let video = streams
            .iter()
            .find(|s| s["codec_type"].as_str() == Some("video"))
            .ok_or_else(|| MediaError::MissingVideoTrack {
                path: path.to_path_buf(),
            })?;

        let has_audio = streams
            .iter()
            .any(|s| s["codec_type"].as_str() == Some("audio"));

        let width = video["width"].as_u64().unwrap_or(0) as f64;
        let height = video["height"].as_u64().unwrap_or(0) as f64;
        if width <= 0.0 || height <= 0.0 {
            return Err(MediaError::UnsupportedFormat {
                path: path.to_path_buf(),
            }
            .into());
        }

        // Container duration is the more reliable figure; fall back to the
        // video stream's own.
        let duration = json["format"]["duration"]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| {
                video["duration"]
                    .as_str()
                    .and_then(|s| s.parse::<f64>().ok())
            })
            .unwrap_or(0.0);

        let rotation = Self::rotation_of(video);
        let preferred_transform = Self::transform_for_rotation(rotation);

        debug!(
            "Probed {:?}: {}x{}, {:.2}s, rotation {}, audio: {}",
            path, width, height, duration, rotation, has_audio
        );

        Ok(MediaSource::new(
            path,
            Size::new(width, height),
            duration,
            preferred_transform,
            has_audio,
        ))
    }

    /// Rotation in degrees from the stream's display-matrix side data, or
    /// the legacy `rotate` tag.
    fn rotation_of(video: &serde_json::Value) -> i64 {
        if let Some(side_data) = video["side_data_list"].as_array() {
            for entry in side_data {
                if let Some(rotation) = entry["rotation"].as_i64() {
                    return rotation;
                }
                if let Some(rotation) = entry["rotation"].as_f64() {
                    return rotation.round() as i64;
                }
            }
        }

        video["tags"]["rotate"]
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0)
    }

    /// Map a probed rotation onto the canonical capture transforms.
    ///
    /// Rotations that are not a multiple of a quarter turn are left as
    /// identity, matching the orientation normalizer's fallback.
    fn transform_for_rotation(rotation: i64) -> Transform {
        match rotation.rem_euclid(360) {
            90 => Transform::new(0.0, -1.0, 1.0, 0.0, 0.0, 0.0),
            180 => Transform::new(-1.0, 0.0, 0.0, -1.0, 0.0, 0.0),
            270 => Transform::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0),
            0 => Transform::IDENTITY,
            other => {
                warn!("Non-canonical rotation {} degrees, treating as upright", other);
                Transform::IDENTITY
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_json(streams: serde_json::Value, duration: &str) -> serde_json::Value {
        serde_json::json!({
            "streams": streams,
            "format": { "duration": duration }
        })
    }

    #[test]
    fn test_probe_json_extracts_attributes() {
        let json = probe_json(
            serde_json::json!([
                { "codec_type": "video", "width": 1920, "height": 1080 },
                { "codec_type": "audio" }
            ]),
            "12.5",
        );

        let source = MediaProbe::from_probe_json(Path::new("a.mp4"), &json).unwrap();
        assert_eq!(source.natural_size, Size::new(1920.0, 1080.0));
        assert!((source.duration - 12.5).abs() < 1e-9);
        assert!(source.has_audio);
        assert_eq!(source.preferred_transform, Transform::IDENTITY);
    }

    #[test]
    fn test_probe_json_requires_video_stream() {
        let json = probe_json(serde_json::json!([{ "codec_type": "audio" }]), "3.0");
        let result = MediaProbe::from_probe_json(Path::new("a.mp3"), &json);
        assert!(result.is_err());
    }

    #[test]
    fn test_display_matrix_rotation_maps_to_canonical_transform() {
        let json = probe_json(
            serde_json::json!([
                {
                    "codec_type": "video",
                    "width": 1920,
                    "height": 1080,
                    "side_data_list": [ { "rotation": -90 } ]
                }
            ]),
            "4.0",
        );

        let source = MediaProbe::from_probe_json(Path::new("a.mp4"), &json).unwrap();
        assert_eq!(
            source.preferred_transform.linear(),
            (0.0, 1.0, -1.0, 0.0)
        );
    }

    #[test]
    fn test_audio_probe_accepts_audio_only_files() {
        let json = probe_json(serde_json::json!([{ "codec_type": "audio" }]), "9.25");
        let source = MediaProbe::audio_from_probe_json(Path::new("music.mp3"), &json).unwrap();
        assert!(source.has_audio);
        assert!((source.duration - 9.25).abs() < 1e-9);

        let json = probe_json(serde_json::json!([{ "codec_type": "video" }]), "9.25");
        assert!(MediaProbe::audio_from_probe_json(Path::new("clip.mp4"), &json).is_err());
    }

    #[test]
    fn test_odd_rotation_falls_back_to_identity() {
        assert_eq!(MediaProbe::transform_for_rotation(45), Transform::IDENTITY);
        assert_eq!(MediaProbe::transform_for_rotation(0), Transform::IDENTITY);
        assert_eq!(
            MediaProbe::transform_for_rotation(180).linear(),
            (-1.0, 0.0, 0.0, -1.0)
        );
    }
}
