//! External-encoder plumbing.
//!
//! Decoding and encoding are both delegated to `ffmpeg` child processes;
//! this module only moves raw RGB frames between them and assembles the
//! audio filter graph from the composition's audio track.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, warn};

use crate::config::ExportConfig;
use crate::error::{ExportError, Result};
use crate::media::MediaSource;
use crate::overlay::LayerTree;
use crate::render::{Frame, FrameCompositor, TextRasterizer};
use crate::effects::Effect;
use crate::geometry::TimeRange;
use crate::timeline::{Composition, SegmentSource};

pub fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Map the 0-100 quality setting onto the encoder's CRF scale.
pub fn quality_to_crf(quality: u8) -> u8 {
    (51 - ((quality as f32 / 100.0) * 51.0) as u8).clamp(0, 51)
}

fn run_and_check(mut cmd: Command, context: &str) -> Result<()> {
    debug!("Running {:?}", cmd);
    let output = cmd.output().map_err(|e| ExportError::EncodeFailed {
        reason: format!("{}: failed to launch ffmpeg: {}", context, e),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExportError::EncodeFailed {
            reason: format!("{}: {}", context, stderr.trim()),
        }
        .into());
    }

    Ok(())
}

fn common_output_args(cmd: &mut Command, config: &ExportConfig) {
    cmd.args(["-c:v", &config.codec]);
    cmd.args(["-crf", &quality_to_crf(config.quality).to_string()]);
    cmd.args(["-pix_fmt", "yuv420p"]);
    // Network-transfer optimization on the output container.
    cmd.args(["-movflags", "+faststart"]);
}

/// Re-encode a sub-range of the input.
pub fn encode_trim(
    config: &ExportConfig,
    input: &Path,
    range: TimeRange,
    output: &Path,
) -> Result<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-ss", &format!("{:.6}", range.start)]);
    cmd.args(["-to", &format!("{:.6}", range.end())]);
    cmd.arg("-i").arg(input);
    common_output_args(&mut cmd, config);
    cmd.args(["-c:a", "aac"]);
    cmd.arg("-y").arg(output);

    run_and_check(cmd, "trim")
}

/// Remux the input untouched. Used when an effect name resolves to no
/// filter: the output stays pixel-identical to the input.
pub fn encode_copy(input: &Path, output: &Path) -> Result<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-i").arg(input);
    cmd.args(["-c", "copy"]);
    cmd.args(["-movflags", "+faststart"]);
    cmd.arg("-y").arg(output);

    run_and_check(cmd, "copy")
}

/// Decode the source, run the pixel filter over every frame, and re-encode,
/// carrying the source's audio across when it has any.
pub fn encode_effect(
    config: &ExportConfig,
    source: &MediaSource,
    effect: &dyn Effect,
    fps: f64,
    output: &Path,
) -> Result<()> {
    let width = source.natural_size.width.round() as u32;
    let height = source.natural_size.height.round() as u32;
    let frame_len = width as usize * height as usize * 3;

    let mut decoder = spawn_raw_decoder(&source.path, 0.0, fps, width, height)?;
    let mut decoder_out = decoder.stdout.take().ok_or_else(|| ExportError::EncodeFailed {
        reason: "decoder produced no stdout pipe".to_string(),
    })?;

    let mut cmd = Command::new("ffmpeg");
    raw_input_args(&mut cmd, width, height, fps);
    if source.has_audio {
        cmd.arg("-i").arg(&source.path);
        cmd.args(["-map", "0:v", "-map", "1:a", "-c:a", "aac", "-shortest"]);
    } else {
        cmd.args(["-map", "0:v", "-an"]);
    }
    common_output_args(&mut cmd, config);
    cmd.arg("-y").arg(output);
    cmd.stdin(Stdio::piped()).stdout(Stdio::null()).stderr(Stdio::piped());

    debug!("Running {:?}", cmd);
    let mut child = cmd.spawn().map_err(|e| ExportError::EncodeFailed {
        reason: format!("effect: failed to launch encoder: {}", e),
    })?;
    let mut stdin = child.stdin.take().ok_or_else(|| ExportError::EncodeFailed {
        reason: "encoder accepted no stdin pipe".to_string(),
    })?;

    let mut buffer = vec![0u8; frame_len];
    let mut frames = 0u64;
    loop {
        match decoder_out.read_exact(&mut buffer) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                return Err(ExportError::EncodeFailed {
                    reason: format!("effect: decoder pipe failed: {}", e),
                }
                .into())
            }
        }

        let mut frame = Frame::from_rgb_bytes(width, height, std::mem::take(&mut buffer))
            .ok_or_else(|| ExportError::EncodeFailed {
                reason: "decoder produced a short frame".to_string(),
            })?;
        effect.apply(&mut frame)?;

        stdin
            .write_all(frame.as_bytes())
            .map_err(|e| ExportError::EncodeFailed {
                reason: format!("effect: encoder pipe closed: {}", e),
            })?;

        buffer = vec![0u8; frame_len];
        frames += 1;
    }

    drop(stdin);
    let _ = decoder.wait();
    finish_encoder(child, "effect")?;

    debug!("Filtered {} frames with '{}'", frames, effect.name());
    Ok(())
}

/// Render a composition: per output timestamp, decode the active segments,
/// compose the frame, and stream it into the encoder alongside the audio
/// filter graph built from the audio track.
pub fn encode_composition(
    config: &ExportConfig,
    composition: &Composition,
    overlays: Option<&LayerTree>,
    rasterizer: Option<&TextRasterizer>,
    silence: Option<&Path>,
    output: &Path,
) -> Result<()> {
    let render = composition.render;
    let fps = render.fps;
    let (width, height) = (render.width_px(), render.height_px());

    let mut cmd = Command::new("ffmpeg");
    raw_input_args(&mut cmd, width, height, fps);
    append_audio_graph(&mut cmd, composition, silence)?;
    common_output_args(&mut cmd, config);
    cmd.args(["-t", &format!("{:.6}", composition.duration)]);
    cmd.arg("-y").arg(output);
    cmd.stdin(Stdio::piped()).stdout(Stdio::null()).stderr(Stdio::piped());

    debug!("Running {:?}", cmd);
    let mut child = cmd.spawn().map_err(|e| ExportError::EncodeFailed {
        reason: format!("composition: failed to launch encoder: {}", e),
    })?;
    let mut stdin = child.stdin.take().ok_or_else(|| ExportError::EncodeFailed {
        reason: "encoder accepted no stdin pipe".to_string(),
    })?;

    let mut compositor = FrameCompositor::new(composition);
    if let (Some(tree), Some(rasterizer)) = (overlays, rasterizer) {
        compositor = compositor.with_overlays(tree, rasterizer);
    }

    let layers = &composition.instruction.layers;
    let mut decoders: Vec<Option<SegmentDecoder>> =
        (0..composition.video.segments.len()).map(|_| None).collect();

    let frame_count = (composition.duration * fps).round() as u64;
    for frame_index in 0..frame_count {
        let t = frame_index as f64 / fps;

        // Advance every active segment's decoder to this timestamp.
        for layer in layers {
            let segment = &composition.video.segments[layer.segment];
            if !segment.timeline_range().contains(t) {
                continue;
            }

            if decoders[layer.segment].is_none() {
                let source = match segment.source {
                    SegmentSource::Clip(idx) => &composition.sources[idx],
                    SegmentSource::Silence => continue,
                };
                let w = source.natural_size.width.round() as u32;
                let h = source.natural_size.height.round() as u32;
                decoders[layer.segment] = Some(SegmentDecoder::spawn(
                    &source.path,
                    segment.source_range.start,
                    fps,
                    w,
                    h,
                )?);
            }

            let wanted = ((t - segment.insert_at) * fps).round() as i64;
            if let Some(decoder) = decoders[layer.segment].as_mut() {
                decoder.advance_to(wanted);
            }
        }

        let frames: Vec<Option<&Frame>> = layers
            .iter()
            .map(|layer| {
                let segment = &composition.video.segments[layer.segment];
                if !segment.timeline_range().contains(t) {
                    return None;
                }
                decoders[layer.segment].as_ref().and_then(|d| d.current())
            })
            .collect();

        let out_frame = compositor.compose(t, &frames);
        stdin
            .write_all(out_frame.as_bytes())
            .map_err(|e| ExportError::EncodeFailed {
                reason: format!("composition: encoder pipe closed: {}", e),
            })?;
    }

    drop(stdin);
    finish_encoder(child, "composition")
}

/// Build the encoder's audio inputs and `filter_complex` graph: per audio
/// segment an `atrim` + `adelay` chain, mixed down to a single stream.
fn append_audio_graph(
    cmd: &mut Command,
    composition: &Composition,
    silence: Option<&Path>,
) -> Result<()> {
    let mut filters: Vec<String> = Vec::new();
    let mut labels = String::new();
    let mut input_index = 1usize;

    for (i, segment) in composition.audio.segments.iter().enumerate() {
        let path: PathBuf = match segment.source {
            SegmentSource::Clip(idx) => composition.sources[idx].path.clone(),
            SegmentSource::Silence => silence
                .map(Path::to_path_buf)
                .ok_or_else(|| ExportError::MissingResource {
                    name: "silence".to_string(),
                })?,
        };

        // A looped substitute repeats until atrim cuts it.
        if segment.looped {
            cmd.args(["-stream_loop", "-1"]);
        }
        cmd.arg("-i").arg(path);

        let delay_ms = (segment.insert_at * 1000.0).round() as i64;
        filters.push(format!(
            "[{}:a]atrim={:.6}:{:.6},asetpts=PTS-STARTPTS,adelay={}|{}[a{}]",
            input_index,
            segment.source_range.start,
            segment.source_range.end(),
            delay_ms,
            delay_ms,
            i
        ));
        labels.push_str(&format!("[a{}]", i));
        input_index += 1;
    }

    if filters.is_empty() {
        cmd.args(["-map", "0:v", "-an"]);
        return Ok(());
    }

    filters.push(format!(
        "{}amix=inputs={}:duration=longest:normalize=0[aout]",
        labels,
        composition.audio.segments.len()
    ));
    cmd.args(["-filter_complex", &filters.join(";")]);
    cmd.args(["-map", "0:v", "-map", "[aout]", "-c:a", "aac"]);
    Ok(())
}

fn raw_input_args(cmd: &mut Command, width: u32, height: u32, fps: f64) {
    cmd.args(["-f", "rawvideo", "-pix_fmt", "rgb24"]);
    cmd.args(["-s", &format!("{}x{}", width, height)]);
    cmd.args(["-r", &format!("{}", fps)]);
    cmd.args(["-i", "pipe:0"]);
}

fn finish_encoder(child: Child, context: &str) -> Result<()> {
    let output = child
        .wait_with_output()
        .map_err(|e| ExportError::EncodeFailed {
            reason: format!("{}: encoder did not exit: {}", context, e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExportError::EncodeFailed {
            reason: format!("{}: {}", context, stderr.trim()),
        }
        .into());
    }

    Ok(())
}

fn spawn_raw_decoder(
    path: &Path,
    start_offset: f64,
    fps: f64,
    width: u32,
    height: u32,
) -> Result<Child> {
    let mut cmd = Command::new("ffmpeg");
    // Keep the raw buffer orientation; the placement transform handles
    // rotation itself.
    cmd.arg("-noautorotate");
    if start_offset > 0.0 {
        cmd.args(["-ss", &format!("{:.6}", start_offset)]);
    }
    cmd.arg("-i").arg(path);
    cmd.args(["-vf", &format!("fps={},scale={}:{}", fps, width, height)]);
    cmd.args(["-f", "rawvideo", "-pix_fmt", "rgb24"]);
    cmd.args(["-v", "error"]);
    cmd.arg("pipe:1");
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::null());

    debug!("Running {:?}", cmd);
    cmd.spawn()
        .map_err(|e| {
            ExportError::EncodeFailed {
                reason: format!("failed to launch decoder for {:?}: {}", path, e),
            }
            .into()
        })
}

/// Streams one video segment's frames out of a decoder process, holding the
/// most recent frame so the compositor can freeze on it at stream end.
struct SegmentDecoder {
    child: Child,
    stdout: ChildStdout,
    frame_len: usize,
    width: u32,
    height: u32,
    next_index: i64,
    current: Option<Frame>,
    finished: bool,
}

impl SegmentDecoder {
    fn spawn(path: &Path, start_offset: f64, fps: f64, width: u32, height: u32) -> Result<Self> {
        let mut child = spawn_raw_decoder(path, start_offset, fps, width, height)?;
        let stdout = child.stdout.take().ok_or_else(|| ExportError::EncodeFailed {
            reason: "decoder produced no stdout pipe".to_string(),
        })?;

        Ok(Self {
            child,
            stdout,
            frame_len: width as usize * height as usize * 3,
            width,
            height,
            next_index: 0,
            current: None,
            finished: false,
        })
    }

    /// Read forward until the frame at `index` is current. Past stream end
    /// the last decoded frame stays current.
    fn advance_to(&mut self, index: i64) {
        while self.next_index <= index && !self.finished {
            let mut buffer = vec![0u8; self.frame_len];
            match self.stdout.read_exact(&mut buffer) {
                Ok(()) => {
                    self.current = Frame::from_rgb_bytes(self.width, self.height, buffer);
                    self.next_index += 1;
                }
                Err(e) => {
                    if e.kind() != std::io::ErrorKind::UnexpectedEof {
                        warn!("Decoder pipe failed: {}", e);
                    }
                    self.finished = true;
                }
            }
        }
    }

    fn current(&self) -> Option<&Frame> {
        self.current.as_ref()
    }
}

impl Drop for SegmentDecoder {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_to_crf_mapping() {
        assert_eq!(quality_to_crf(100), 0);
        assert_eq!(quality_to_crf(0), 51);
        assert!(quality_to_crf(90) < quality_to_crf(50));
    }

    #[test]
    fn test_audio_graph_for_silence_substitution() {
        use crate::config::Config;
        use crate::geometry::{Size, Transform};
        use crate::media::MediaSource;
        use crate::timeline::TimelineBuilder;

        let config = Config::default();
        let a = MediaSource::new("a.mp4", Size::new(1920.0, 1080.0), 3.0, Transform::IDENTITY, true);
        let b = MediaSource::new("b.mp4", Size::new(1920.0, 1080.0), 5.0, Transform::IDENTITY, false);
        let silence = MediaSource::new("silence.mp3", Size::new(0.0, 0.0), 2.0, Transform::IDENTITY, true);

        let composition = TimelineBuilder::new(&config)
            .build(&[a, b], &silence)
            .unwrap();

        let mut cmd = Command::new("ffmpeg");
        append_audio_graph(&mut cmd, &composition, Some(Path::new("silence.mp3"))).unwrap();

        let rendered: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        let joined = rendered.join(" ");

        // The silence substitute loops, is trimmed to B's duration, and is
        // delayed to B's insert time.
        assert!(joined.contains("-stream_loop -1"));
        assert!(joined.contains("atrim=0.000000:5.000000"));
        assert!(joined.contains("adelay=3000|3000"));
        assert!(joined.contains("amix=inputs=2"));
    }

    #[test]
    fn test_audio_graph_without_silence_asset_fails() {
        use crate::config::Config;
        use crate::geometry::{Size, Transform};
        use crate::media::MediaSource;
        use crate::timeline::TimelineBuilder;

        let config = Config::default();
        let muted = MediaSource::new("b.mp4", Size::new(1920.0, 1080.0), 5.0, Transform::IDENTITY, false);
        let silence = MediaSource::new("silence.mp3", Size::new(0.0, 0.0), 2.0, Transform::IDENTITY, true);

        let composition = TimelineBuilder::new(&config)
            .build(&[muted], &silence)
            .unwrap();

        let mut cmd = Command::new("ffmpeg");
        let result = append_audio_graph(&mut cmd, &composition, None);
        assert!(result.is_err());
    }
}
