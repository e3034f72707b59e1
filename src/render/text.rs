use std::path::Path;

use fontdue::{Font, FontSettings};
use tracing::debug;

use crate::error::{ExportError, Result};
use crate::geometry::Rect;
use crate::render::frame::Frame;

/// Rasterizes overlay text onto frame buffers.
///
/// Glyphs are laid out centered in the overlay rectangle, with the same
/// vertical bias the overlay geometry was authored against: the text block
/// sits at `(height - font_size) / 2 - font_size / 10` from the top.
pub struct TextRasterizer {
    font: Font,
}

impl TextRasterizer {
    /// Load the bundled overlay font.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|_| ExportError::MissingResource {
            name: path.display().to_string(),
        })?;

        let font =
            Font::from_bytes(data, FontSettings::default()).map_err(|reason| {
                ExportError::InvalidResource {
                    name: path.display().to_string(),
                    reason: reason.to_string(),
                }
            })?;

        debug!("Loaded overlay font from {:?}", path);
        Ok(Self { font })
    }

    /// Draw `text` into `frame`, centered in `rect`, blended at `alpha`.
    pub fn draw(
        &self,
        frame: &mut Frame,
        text: &str,
        font_size: f32,
        color: [u8; 3],
        rect: Rect,
        alpha: f32,
    ) {
        if alpha <= 0.0 || text.is_empty() || font_size <= 0.0 {
            return;
        }

        let total_advance: f32 = text
            .chars()
            .map(|ch| self.font.metrics(ch, font_size).advance_width)
            .sum();

        let ascent = self
            .font
            .horizontal_line_metrics(font_size)
            .map(|m| m.ascent)
            .unwrap_or(font_size);

        let y_diff = (rect.height as f32 - font_size) / 2.0 - font_size / 10.0;
        let baseline = rect.y as f32 + y_diff + ascent;
        let mut pen_x = rect.x as f32 + (rect.width as f32 - total_advance) / 2.0;

        for ch in text.chars() {
            let (metrics, bitmap) = self.font.rasterize(ch, font_size);

            let glyph_left = pen_x + metrics.xmin as f32;
            let glyph_top = baseline - metrics.ymin as f32 - metrics.height as f32;

            for row in 0..metrics.height {
                for col in 0..metrics.width {
                    let coverage = bitmap[row * metrics.width + col];
                    if coverage == 0 {
                        continue;
                    }

                    let x = glyph_left + col as f32;
                    let y = glyph_top + row as f32;
                    if x < 0.0 || y < 0.0 || x >= frame.width() as f32 || y >= frame.height() as f32
                    {
                        continue;
                    }

                    let glyph_alpha = alpha * coverage as f32 / 255.0;
                    frame.blend_pixel(x as u32, y as u32, color, glyph_alpha);
                }
            }

            pen_x += metrics.advance_width;
        }
    }
}
