//! Neighborhood and noise effects.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::effects::traits::Effect;
use crate::render::Frame;

/// 3x3 unsharp-style luminance sharpening.
pub struct SharpenEffect {
    strength: f32,
}

impl SharpenEffect {
    pub fn new() -> Self {
        Self { strength: 0.6 }
    }
}

impl Effect for SharpenEffect {
    fn name(&self) -> &str {
        "sharpen"
    }

    fn description(&self) -> &str {
        "Crisper edges via a 3x3 kernel"
    }

    fn apply(&self, frame: &mut Frame) -> Result<()> {
        let width = frame.width();
        let height = frame.height();
        if width < 3 || height < 3 {
            return Ok(());
        }

        let original = frame.clone();

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let center = original.get_pixel(x, y);
                let neighbors = [
                    original.get_pixel(x, y - 1),
                    original.get_pixel(x, y + 1),
                    original.get_pixel(x - 1, y),
                    original.get_pixel(x + 1, y),
                ];

                let pixel = frame.get_pixel_mut(x, y);
                for channel in 0..3 {
                    let neighbor_sum: f32 =
                        neighbors.iter().map(|n| n[channel] as f32).sum();
                    let sharpened = center[channel] as f32
                        + self.strength * (4.0 * center[channel] as f32 - neighbor_sum);
                    pixel[channel] = sharpened.clamp(0.0, 255.0) as u8;
                }
            }
        }

        Ok(())
    }
}

/// Additive monochrome film grain.
pub struct GrainEffect {
    amount: f32,
}

impl GrainEffect {
    pub fn new() -> Self {
        Self { amount: 18.0 }
    }
}

impl Effect for GrainEffect {
    fn name(&self) -> &str {
        "grain"
    }

    fn description(&self) -> &str {
        "Film grain noise"
    }

    fn apply(&self, frame: &mut Frame) -> Result<()> {
        let mut rng = SmallRng::from_entropy();

        for y in 0..frame.height() {
            for x in 0..frame.width() {
                let noise = rng.gen_range(-self.amount..=self.amount);
                let pixel = frame.get_pixel_mut(x, y);
                for channel in 0..3 {
                    pixel[channel] = (pixel[channel] as f32 + noise).clamp(0.0, 255.0) as u8;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sharpen_boosts_edge_contrast() {
        let mut frame = Frame::new_black(5, 5);
        for y in 0..5 {
            for x in 0..5 {
                let value = if x < 2 { 50 } else { 200 };
                frame.set_pixel(x, y, [value, value, value]);
            }
        }

        SharpenEffect::new().apply(&mut frame).unwrap();

        // The dark side of the edge gets darker, the bright side brighter.
        assert!(frame.get_pixel(1, 2)[0] < 50);
        assert!(frame.get_pixel(2, 2)[0] > 200);
        // Flat regions are untouched.
        assert_eq!(frame.get_pixel(0, 0), [50, 50, 50]);
    }

    #[test]
    fn test_sharpen_skips_tiny_frames() {
        let mut frame = Frame::new_black(2, 2);
        frame.set_pixel(0, 0, [10, 10, 10]);
        SharpenEffect::new().apply(&mut frame).unwrap();
        assert_eq!(frame.get_pixel(0, 0), [10, 10, 10]);
    }

    #[test]
    fn test_grain_stays_in_range() {
        let mut frame = Frame::new_black(8, 8);
        GrainEffect::new().apply(&mut frame).unwrap();

        for y in 0..8 {
            for x in 0..8 {
                let [r, g, b] = frame.get_pixel(x, y);
                // Monochrome noise over black stays equal across channels.
                assert_eq!(r, g);
                assert_eq!(g, b);
            }
        }
    }
}
