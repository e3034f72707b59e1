//! Color-mapping effects: per-pixel tone transforms with no neighborhood
//! sampling.

use crate::error::Result;
use crate::effects::traits::Effect;
use crate::render::Frame;

fn luminance(pixel: [u8; 3]) -> f32 {
    0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32
}

fn for_each_pixel<F: Fn([u8; 3]) -> [u8; 3]>(frame: &mut Frame, map: F) {
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            let mapped = map(frame.get_pixel(x, y));
            frame.set_pixel(x, y, mapped);
        }
    }
}

/// High-contrast black-and-white.
pub struct NoirEffect;

impl NoirEffect {
    pub fn new() -> Self {
        Self
    }
}

impl Effect for NoirEffect {
    fn name(&self) -> &str {
        "noir"
    }

    fn description(&self) -> &str {
        "High-contrast black-and-white"
    }

    fn apply(&self, frame: &mut Frame) -> Result<()> {
        for_each_pixel(frame, |pixel| {
            let luma = luminance(pixel) / 255.0;
            // Steepen the curve around mid-gray.
            let contrasted = ((luma - 0.5) * 1.4 + 0.5).clamp(0.0, 1.0);
            let value = (contrasted * 255.0) as u8;
            [value, value, value]
        });
        Ok(())
    }
}

/// Warm brown-tinted monochrome.
pub struct SepiaEffect;

impl SepiaEffect {
    pub fn new() -> Self {
        Self
    }
}

impl Effect for SepiaEffect {
    fn name(&self) -> &str {
        "sepia"
    }

    fn description(&self) -> &str {
        "Warm sepia tone"
    }

    fn apply(&self, frame: &mut Frame) -> Result<()> {
        for_each_pixel(frame, |pixel| {
            let luma = luminance(pixel);
            [
                (luma * 1.07).min(255.0) as u8,
                (luma * 0.74).min(255.0) as u8,
                (luma * 0.43).min(255.0) as u8,
            ]
        });
        Ok(())
    }
}

/// Neutral grayscale.
pub struct MonoEffect;

impl MonoEffect {
    pub fn new() -> Self {
        Self
    }
}

impl Effect for MonoEffect {
    fn name(&self) -> &str {
        "mono"
    }

    fn description(&self) -> &str {
        "Neutral grayscale"
    }

    fn apply(&self, frame: &mut Frame) -> Result<()> {
        for_each_pixel(frame, |pixel| {
            let value = luminance(pixel) as u8;
            [value, value, value]
        });
        Ok(())
    }
}

/// Channel inversion.
pub struct InvertEffect;

impl InvertEffect {
    pub fn new() -> Self {
        Self
    }
}

impl Effect for InvertEffect {
    fn name(&self) -> &str {
        "invert"
    }

    fn description(&self) -> &str {
        "Inverted colors"
    }

    fn apply(&self, frame: &mut Frame) -> Result<()> {
        for_each_pixel(frame, |pixel| [255 - pixel[0], 255 - pixel[1], 255 - pixel[2]]);
        Ok(())
    }
}

/// Quantize each channel to a few levels.
pub struct PosterizeEffect {
    levels: u8,
}

impl PosterizeEffect {
    pub fn new() -> Self {
        Self { levels: 4 }
    }
}

impl Effect for PosterizeEffect {
    fn name(&self) -> &str {
        "posterize"
    }

    fn description(&self) -> &str {
        "Flat poster-style color bands"
    }

    fn apply(&self, frame: &mut Frame) -> Result<()> {
        let step = 255.0 / (self.levels - 1) as f32;
        for_each_pixel(frame, |pixel| {
            let quantize = |v: u8| ((v as f32 / step).round() * step).min(255.0) as u8;
            [quantize(pixel[0]), quantize(pixel[1]), quantize(pixel[2])]
        });
        Ok(())
    }
}

/// Washed-out, lifted-black look.
pub struct FadeEffect;

impl FadeEffect {
    pub fn new() -> Self {
        Self
    }
}

impl Effect for FadeEffect {
    fn name(&self) -> &str {
        "fade"
    }

    fn description(&self) -> &str {
        "Washed-out faded print"
    }

    fn apply(&self, frame: &mut Frame) -> Result<()> {
        for_each_pixel(frame, |pixel| {
            let fade = |v: u8| (v as f32 * 0.8 + 40.0).min(255.0) as u8;
            [fade(pixel[0]), fade(pixel[1]), fade(pixel[2])]
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame() -> Frame {
        let mut frame = Frame::new_black(4, 1);
        frame.set_pixel(0, 0, [0, 0, 0]);
        frame.set_pixel(1, 0, [255, 0, 0]);
        frame.set_pixel(2, 0, [0, 255, 0]);
        frame.set_pixel(3, 0, [255, 255, 255]);
        frame
    }

    #[test]
    fn test_mono_flattens_channels() {
        let mut frame = gradient_frame();
        MonoEffect::new().apply(&mut frame).unwrap();

        for x in 0..4 {
            let [r, g, b] = frame.get_pixel(x, 0);
            assert_eq!(r, g);
            assert_eq!(g, b);
        }
        assert_eq!(frame.get_pixel(0, 0), [0, 0, 0]);
        assert!(frame.get_pixel(3, 0)[0] >= 254);
    }

    #[test]
    fn test_invert_is_an_involution() {
        let mut frame = gradient_frame();
        let effect = InvertEffect::new();
        effect.apply(&mut frame).unwrap();
        assert_eq!(frame.get_pixel(1, 0), [0, 255, 255]);
        effect.apply(&mut frame).unwrap();
        assert_eq!(frame.get_pixel(1, 0), [255, 0, 0]);
    }

    #[test]
    fn test_sepia_orders_channels_warm() {
        let mut frame = gradient_frame();
        SepiaEffect::new().apply(&mut frame).unwrap();

        let [r, g, b] = frame.get_pixel(3, 0);
        assert!(r > g && g > b);
    }

    #[test]
    fn test_posterize_reduces_distinct_levels() {
        let mut frame = Frame::new_black(256, 1);
        for x in 0..256 {
            frame.set_pixel(x, 0, [x as u8, x as u8, x as u8]);
        }
        PosterizeEffect::new().apply(&mut frame).unwrap();

        let mut levels: Vec<u8> = (0..256).map(|x| frame.get_pixel(x, 0)[0]).collect();
        levels.sort_unstable();
        levels.dedup();
        assert_eq!(levels.len(), 4);
    }

    #[test]
    fn test_fade_lifts_blacks() {
        let mut frame = gradient_frame();
        FadeEffect::new().apply(&mut frame).unwrap();
        assert_eq!(frame.get_pixel(0, 0), [40, 40, 40]);
    }
}
