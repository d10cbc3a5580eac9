//! Text watermark rendering with the `font8x8` bitmap font.
//!
//! Glyphs are 8×8 bit rows, scaled by nearest neighbor. Glyphs are separated
//! by a gap of `scale` pixels with no trailing gap. The result is a
//! transparent buffer with the text drawn in a solid color, ready for
//! [`composite_overlay`](super::geometry::composite_overlay).

use super::backend::ImagingError;
use super::buffer::PixelBuffer;
use super::params::Rgba;
use font8x8::{BASIC_FONTS, UnicodeFonts};

const GLYPH_SIZE: u32 = 8;

/// Largest accepted font-bit size.
pub const MAX_TEXT_SCALE: u32 = 64;

/// Widest rendered text line in pixels.
pub const MAX_TEXT_WIDTH: u32 = 16_384;

fn glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Render `text` as a single line. `scale` is the pixel size of one font bit.
pub fn render_text(text: &str, scale: u32, color: Rgba) -> Result<PixelBuffer, ImagingError> {
    if text.is_empty() {
        return Err(ImagingError::InvalidParameter(
            "watermark text is empty".into(),
        ));
    }
    let scale = scale.max(1);
    if scale > MAX_TEXT_SCALE {
        return Err(ImagingError::InvalidParameter(format!(
            "text scale {scale} exceeds {MAX_TEXT_SCALE}"
        )));
    }
    let glyph_px = GLYPH_SIZE * scale;
    let width = u32::try_from(text.chars().count())
        .ok()
        .and_then(|count| {
            count
                .checked_mul(glyph_px)?
                .checked_add((count - 1).checked_mul(scale)?)
        })
        .filter(|&w| w <= MAX_TEXT_WIDTH)
        .ok_or_else(|| {
            ImagingError::InvalidParameter(format!(
                "watermark text is wider than {MAX_TEXT_WIDTH}px at scale {scale}"
            ))
        })?;
    let height = glyph_px;

    let mut canvas = PixelBuffer::filled(width, height, Rgba::TRANSPARENT)?.into_bytes();
    let stride = width as usize * 4;

    for (idx, ch) in text.chars().enumerate() {
        let origin_x = idx as u32 * (glyph_px + scale);
        for (row, bits) in glyph(ch).iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if (bits >> col) & 1 == 0 {
                    continue;
                }
                let x0 = origin_x + col * scale;
                let y0 = row as u32 * scale;
                for dy in 0..scale {
                    let line = (y0 + dy) as usize * stride;
                    for dx in 0..scale {
                        let i = line + (x0 + dx) as usize * 4;
                        canvas[i..i + 4].copy_from_slice(&color.0);
                    }
                }
            }
        }
    }

    PixelBuffer::new(width, height, canvas)
}
