//! # Text Overlays
//!
//! Builds the layered render tree for the text-overlay operation: one base
//! video layer at the full render size plus one independently-timed, fading
//! text layer per overlay. Layer opacity is an evaluable function of time;
//! the export pipeline's frame compositor samples it per output frame.

use tracing::debug;

use crate::config::OverlayConfig;
use crate::geometry::{Rect, Size};

/// Fade-in length for text layers (seconds).
pub const FADE_IN_DURATION: f64 = 0.5;

/// Fade-out length for text layers (seconds).
pub const FADE_OUT_DURATION: f64 = 1.0;

/// Caller-supplied overlay description, in display units.
///
/// `hide_time == 0` means the text never fades out.
#[derive(Debug, Clone)]
pub struct TextOverlay {
    pub text: String,
    pub font_size: f64,
    pub color: [u8; 3],
    pub frame: Rect,
    pub show_time: f64,
    pub hide_time: f64,
}

/// One timed opacity animation. Holds its final value; it does not
/// auto-revert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeAnimation {
    pub begins_at: f64,
    pub duration: f64,
    pub from: f32,
    pub to: f32,
}

impl FadeAnimation {
    /// Value at time `t`, or `None` before the animation begins.
    fn value_at(&self, t: f64) -> Option<f32> {
        if t < self.begins_at {
            return None;
        }
        if t < self.begins_at + self.duration {
            let progress = ((t - self.begins_at) / self.duration) as f32;
            Some(self.from + (self.to - self.from) * progress)
        } else {
            Some(self.to)
        }
    }
}

/// A text layer scaled into render units, with its fade programs attached.
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    pub text: String,
    pub font_size: f32,
    pub color: [u8; 3],
    pub frame: Rect,
    pub fade_in: FadeAnimation,
    pub fade_out: Option<FadeAnimation>,
}

impl OverlayLayer {
    /// Evaluate the layer's opacity at time `t`. Text layers start hidden.
    pub fn opacity_at(&self, t: f64) -> f32 {
        let mut value = 0.0;
        if let Some(v) = self.fade_in.value_at(t) {
            value = v;
        }
        if let Some(fade_out) = &self.fade_out {
            if let Some(v) = fade_out.value_at(t) {
                value = v;
            }
        }
        value.clamp(0.0, 1.0)
    }
}

/// The layered render tree handed to the frame compositor.
#[derive(Debug, Clone)]
pub struct LayerTree {
    /// Base video layer, always the full render size
    pub base: Rect,
    pub render_size: Size,
    pub overlays: Vec<OverlayLayer>,
}

/// Builds a [`LayerTree`] from caller-supplied overlays.
pub struct OverlayBuilder<'a> {
    config: &'a OverlayConfig,
}

impl<'a> OverlayBuilder<'a> {
    pub fn new(config: &'a OverlayConfig) -> Self {
        Self { config }
    }

    /// Rescale overlay geometry from display units to the render size and
    /// attach the fade programs.
    pub fn build(&self, render_size: Size, overlays: &[TextOverlay]) -> LayerTree {
        let sx = render_size.width / self.config.reference_width;
        let sy = render_size.height / self.config.reference_height;

        let layers = overlays
            .iter()
            .map(|overlay| {
                let fade_in = FadeAnimation {
                    begins_at: overlay.show_time,
                    duration: FADE_IN_DURATION,
                    from: 0.0,
                    to: 1.0,
                };

                let fade_out = (overlay.hide_time > 0.0).then(|| FadeAnimation {
                    begins_at: overlay.hide_time,
                    duration: FADE_OUT_DURATION,
                    from: 1.0,
                    to: 0.0,
                });

                debug!(
                    "Overlay '{}' visible from {:.2}s{}",
                    overlay.text,
                    overlay.show_time,
                    if overlay.hide_time > 0.0 {
                        format!(" to {:.2}s", overlay.hide_time)
                    } else {
                        String::new()
                    }
                );

                OverlayLayer {
                    text: overlay.text.clone(),
                    font_size: (overlay.font_size * sy) as f32,
                    color: overlay.color,
                    frame: overlay.frame.scaled(sx, sy),
                    fade_in,
                    fade_out,
                }
            })
            .collect();

        LayerTree {
            base: Rect::new(0.0, 0.0, render_size.width, render_size.height),
            render_size,
            overlays: layers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay(show: f64, hide: f64) -> TextOverlay {
        TextOverlay {
            text: "Hello".to_string(),
            font_size: 40.0,
            color: [0, 255, 0],
            frame: Rect::new(0.0, 0.0, 390.0, 150.0),
            show_time: show,
            hide_time: hide,
        }
    }

    #[test]
    fn test_overlay_opacity_curve() {
        let config = OverlayConfig::default();
        let tree = OverlayBuilder::new(&config).build(Size::new(1920.0, 1080.0), &[overlay(1.0, 4.0)]);
        let layer = &tree.overlays[0];

        // Hidden before the show time, fully visible by show + 0.5s, holds,
        // then gone one second after the hide time.
        assert!((layer.opacity_at(0.5) - 0.0).abs() < 1e-6);
        assert!((layer.opacity_at(1.25) - 0.5).abs() < 1e-6);
        assert!((layer.opacity_at(1.5) - 1.0).abs() < 1e-6);
        assert!((layer.opacity_at(3.9) - 1.0).abs() < 1e-6);
        assert!((layer.opacity_at(4.5) - 0.5).abs() < 1e-6);
        assert!((layer.opacity_at(5.0) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_hide_time_never_fades_out() {
        let config = OverlayConfig::default();
        let tree = OverlayBuilder::new(&config).build(Size::new(1920.0, 1080.0), &[overlay(1.0, 0.0)]);
        let layer = &tree.overlays[0];

        assert!(layer.fade_out.is_none());
        assert!((layer.opacity_at(600.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_geometry_rescaled_to_render_units() {
        let config = OverlayConfig {
            reference_width: 390.0,
            reference_height: 300.0,
        };
        let tree = OverlayBuilder::new(&config).build(Size::new(780.0, 600.0), &[overlay(0.0, 0.0)]);
        let layer = &tree.overlays[0];

        assert!((layer.frame.width - 780.0).abs() < 1e-6);
        assert!((layer.frame.height - 300.0).abs() < 1e-6);
        assert!((layer.font_size - 80.0).abs() < 1e-3);

        // Base layer spans the full render frame.
        assert!((tree.base.width - 780.0).abs() < 1e-6);
        assert!((tree.base.height - 600.0).abs() < 1e-6);
    }
}
