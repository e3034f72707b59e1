use rayon::prelude::*;
use tracing::warn;

use crate::geometry::Size;
use crate::overlay::LayerTree;
use crate::render::frame::Frame;
use crate::render::text::TextRasterizer;
use crate::timeline::{Composition, LayerInstruction};

/// Composes one output frame per timestamp from decoded layer frames.
///
/// Layer instructions are stacked top-to-bottom, so drawing happens in
/// reverse instruction order; each source sample is placed through the
/// layer's inverse transform and blended at the layer's opacity for the
/// timestamp. Text overlays rasterize last, on top of the video layers.
pub struct FrameCompositor<'a> {
    composition: &'a Composition,
    overlays: Option<(&'a LayerTree, &'a TextRasterizer)>,
}

impl<'a> FrameCompositor<'a> {
    pub fn new(composition: &'a Composition) -> Self {
        Self {
            composition,
            overlays: None,
        }
    }

    pub fn with_overlays(mut self, tree: &'a LayerTree, rasterizer: &'a TextRasterizer) -> Self {
        self.overlays = Some((tree, rasterizer));
        self
    }

    /// Compose the output frame for timeline time `t`.
    ///
    /// `layer_frames` holds, per instruction layer, the decoded source frame
    /// for this timestamp; `None` means the layer's segment is inactive or
    /// its decoder produced nothing.
    pub fn compose(&self, t: f64, layer_frames: &[Option<&Frame>]) -> Frame {
        let render = self.composition.render;
        let mut out = Frame::new_black(render.width_px(), render.height_px());

        let layers = &self.composition.instruction.layers;
        for (layer, source_frame) in layers.iter().zip(layer_frames.iter()).rev() {
            let Some(source_frame) = *source_frame else {
                continue;
            };

            let segment = &self.composition.video.segments[layer.segment];
            if !segment.timeline_range().contains(t) {
                continue;
            }

            let alpha = layer.opacity_at(t);
            if alpha <= 0.0 {
                continue;
            }

            Self::draw_layer(&mut out, source_frame, layer, alpha);
        }

        if let Some((tree, rasterizer)) = self.overlays {
            for overlay in &tree.overlays {
                let alpha = overlay.opacity_at(t);
                if alpha <= 0.0 {
                    continue;
                }
                rasterizer.draw(
                    &mut out,
                    &overlay.text,
                    overlay.font_size,
                    overlay.color,
                    overlay.frame,
                    alpha,
                );
            }
        }

        out
    }

    fn draw_layer(out: &mut Frame, source: &Frame, layer: &LayerInstruction, alpha: f32) {
        let Some(inverse) = layer.transform.invert() else {
            warn!("Singular placement transform, skipping layer {}", layer.segment);
            return;
        };

        let out_width = out.width() as usize;
        let out_height = out.height() as usize;

        // Only touch the rows the mapped source can reach.
        let bbox = layer.transform.map_bounding_box(Size::new(
            source.width() as f64,
            source.height() as f64,
        ));
        let y_start = bbox.y.floor().max(0.0) as usize;
        let y_end = (bbox.max_y().ceil() as usize).min(out_height);
        let x_start = bbox.x.floor().max(0.0) as usize;
        let x_end = (bbox.max_x().ceil() as usize).min(out_width);
        if y_start >= y_end || x_start >= x_end {
            return;
        }

        out.as_bytes_mut()
            .par_chunks_mut(out_width * 3)
            .enumerate()
            .skip(y_start)
            .take(y_end - y_start)
            .for_each(|(y, row)| {
                for x in x_start..x_end {
                    let (sx, sy) = inverse.apply(x as f64 + 0.5, y as f64 + 0.5);
                    let Some(sample) = source.sample_bilinear(sx, sy) else {
                        continue;
                    };

                    let offset = x * 3;
                    for channel in 0..3 {
                        let src = sample[channel] as f32;
                        let dst = row[offset + channel] as f32;
                        row[offset + channel] = (src * alpha + dst * (1.0 - alpha)).round() as u8;
                    }
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Size, TimeRange, Transform};
    use crate::media::MediaSource;
    use crate::timeline::{
        CompositionInstruction, RenderTarget, SegmentSource, TimelineTrack, TrackKind, TrackSegment,
    };

    fn tiny_source(width: f64, height: f64) -> MediaSource {
        MediaSource::new(
            "clip.mp4",
            Size::new(width, height),
            4.0,
            Transform::IDENTITY,
            true,
        )
    }

    fn composition_with_layers(
        layers: Vec<LayerInstruction>,
        segments: Vec<TrackSegment>,
        render_size: Size,
    ) -> Composition {
        let mut video = TimelineTrack::new(TrackKind::Video);
        for segment in segments {
            video.insert(segment).unwrap();
        }
        let duration = video.end();

        Composition {
            sources: vec![tiny_source(render_size.width, render_size.height)],
            video,
            audio: TimelineTrack::new(TrackKind::Audio),
            instruction: CompositionInstruction {
                time_range: TimeRange::new(0.0, duration),
                layers,
            },
            render: RenderTarget::new(render_size, 30.0),
            duration,
        }
    }

    fn solid_frame(width: u32, height: u32, color: [u8; 3]) -> Frame {
        let mut frame = Frame::new_black(width, height);
        for y in 0..height {
            for x in 0..width {
                frame.set_pixel(x, y, color);
            }
        }
        frame
    }

    fn identity_layer(segment: usize) -> LayerInstruction {
        LayerInstruction {
            segment,
            transform: Transform::IDENTITY,
            programs: Vec::new(),
        }
    }

    #[test]
    fn test_identity_layer_copies_source() {
        let size = Size::new(4.0, 4.0);
        let composition = composition_with_layers(
            vec![identity_layer(0)],
            vec![TrackSegment::new(SegmentSource::Clip(0), TimeRange::new(0.0, 4.0), 0.0)],
            size,
        );

        let source = solid_frame(4, 4, [200, 120, 40]);
        let out = FrameCompositor::new(&composition).compose(1.0, &[Some(&source)]);
        assert_eq!(out.get_pixel(0, 0), [200, 120, 40]);
        assert_eq!(out.get_pixel(3, 3), [200, 120, 40]);
    }

    #[test]
    fn test_layer_opacity_blends_toward_black() {
        let size = Size::new(4.0, 4.0);
        let mut layer = identity_layer(0);
        layer.add_cut(0.0, 0.5);

        let composition = composition_with_layers(
            vec![layer],
            vec![TrackSegment::new(SegmentSource::Clip(0), TimeRange::new(0.0, 4.0), 0.0)],
            size,
        );

        let source = solid_frame(4, 4, [200, 100, 50]);
        let out = FrameCompositor::new(&composition).compose(1.0, &[Some(&source)]);
        assert_eq!(out.get_pixel(2, 2), [100, 50, 25]);
    }

    #[test]
    fn test_inactive_segment_leaves_black() {
        let size = Size::new(4.0, 4.0);
        let composition = composition_with_layers(
            vec![identity_layer(0)],
            vec![TrackSegment::new(SegmentSource::Clip(0), TimeRange::new(0.0, 2.0), 0.0)],
            size,
        );

        let source = solid_frame(4, 4, [255, 255, 255]);
        let out = FrameCompositor::new(&composition).compose(3.0, &[Some(&source)]);
        assert_eq!(out.get_pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_first_instruction_stacks_on_top() {
        let size = Size::new(4.0, 4.0);
        let composition = composition_with_layers(
            vec![identity_layer(0), identity_layer(1)],
            vec![
                TrackSegment::new(SegmentSource::Clip(0), TimeRange::new(0.0, 4.0), 0.0),
                TrackSegment::new(SegmentSource::Clip(0), TimeRange::new(0.0, 4.0), 0.0),
            ],
            size,
        );

        let top = solid_frame(4, 4, [10, 10, 10]);
        let bottom = solid_frame(4, 4, [240, 240, 240]);
        let out = FrameCompositor::new(&composition).compose(1.0, &[Some(&top), Some(&bottom)]);
        assert_eq!(out.get_pixel(1, 1), [10, 10, 10]);
    }

    #[test]
    fn test_scaling_layer_fills_target() {
        let size = Size::new(4.0, 4.0);
        let mut layer = identity_layer(0);
        layer.transform = Transform::scale(2.0, 2.0);

        let composition = composition_with_layers(
            vec![layer],
            vec![TrackSegment::new(SegmentSource::Clip(0), TimeRange::new(0.0, 4.0), 0.0)],
            size,
        );

        let source = solid_frame(2, 2, [90, 90, 90]);
        let out = FrameCompositor::new(&composition).compose(0.0, &[Some(&source)]);
        assert_eq!(out.get_pixel(0, 0), [90, 90, 90]);
        assert_eq!(out.get_pixel(3, 3), [90, 90, 90]);
    }
}
