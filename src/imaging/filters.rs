//! Color and neighborhood filters.
//!
//! Every filter returns a new buffer of the same size; the input is never
//! touched. Color filters leave alpha alone. Blur is the only filter that
//! averages alpha along with the color channels.
//!
//! | Filter | Formula |
//! |---|---|
//! | grayscale | `0.299R + 0.587G + 0.114B` into all three channels |
//! | sepia | fixed 3×3 matrix, each row capped at 255 |
//! | invert | `255 - C` |
//! | brightness | `C * (intensity * 2)` |
//! | contrast | `(C - 128) * (intensity * 2) + 128` |
//! | blur | box average, radius `round(intensity * 10)`, window clipped at edges |

use super::buffer::PixelBuffer;
use super::params::{FilterKind, Intensity};
use rayon::prelude::*;

/// Apply a filter, producing a new buffer of identical dimensions.
pub fn apply_filter(buffer: &PixelBuffer, kind: FilterKind, intensity: Intensity) -> PixelBuffer {
    match kind {
        FilterKind::Grayscale => map_rgb(buffer, |[r, g, b]| {
            let gray = to_byte(0.299 * r + 0.587 * g + 0.114 * b);
            [gray, gray, gray]
        }),
        FilterKind::Sepia => map_rgb(buffer, |[r, g, b]| {
            [
                to_byte(0.393 * r + 0.769 * g + 0.189 * b),
                to_byte(0.349 * r + 0.686 * g + 0.168 * b),
                to_byte(0.272 * r + 0.534 * g + 0.131 * b),
            ]
        }),
        FilterKind::Invert => map_rgb(buffer, |[r, g, b]| {
            [to_byte(255.0 - r), to_byte(255.0 - g), to_byte(255.0 - b)]
        }),
        FilterKind::Brightness => {
            let factor = intensity.value() * 2.0;
            map_rgb(buffer, |rgb| rgb.map(|c| to_byte(c * factor)))
        }
        FilterKind::Contrast => {
            let factor = intensity.value() * 2.0;
            map_rgb(buffer, |rgb| rgb.map(|c| to_byte((c - 128.0) * factor + 128.0)))
        }
        FilterKind::Blur => box_blur(buffer, blur_radius(intensity)),
    }
}

/// Blur radius in pixels for a given intensity.
pub fn blur_radius(intensity: Intensity) -> u32 {
    (intensity.value() * 10.0).round() as u32
}

/// Round and clamp a channel value to a byte.
fn to_byte(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Run `f` over the RGB channels of every pixel, keeping alpha.
fn map_rgb(buffer: &PixelBuffer, f: impl Fn([f32; 3]) -> [u8; 3] + Sync) -> PixelBuffer {
    let mut pixels = buffer.as_bytes().to_vec();
    pixels.par_chunks_exact_mut(4).for_each(|px| {
        let [r, g, b] = f([px[0] as f32, px[1] as f32, px[2] as f32]);
        px[0] = r;
        px[1] = g;
        px[2] = b;
    });
    buffer.with_pixels(pixels)
}

/// Box blur over a square window, clipped at the buffer edges.
///
/// The window sum is separable, so it runs as a horizontal pass into
/// integer sums followed by a vertical pass. Both passes read from data
/// that is never written during the pass.
fn box_blur(buffer: &PixelBuffer, radius: u32) -> PixelBuffer {
    if radius == 0 {
        return buffer.clone();
    }
    let w = buffer.width() as usize;
    let h = buffer.height() as usize;
    let r = radius as usize;
    let src = buffer.as_bytes();

    let mut horizontal = vec![0u32; w * h * 4];
    horizontal
        .par_chunks_mut(w * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let line = &src[y * w * 4..(y + 1) * w * 4];
            for x in 0..w {
                let lo = x.saturating_sub(r);
                let hi = (x + r).min(w - 1);
                let mut acc = [0u32; 4];
                for nx in lo..=hi {
                    for (c, sum) in acc.iter_mut().enumerate() {
                        *sum += line[nx * 4 + c] as u32;
                    }
                }
                row[x * 4..x * 4 + 4].copy_from_slice(&acc);
            }
        });

    let mut out = vec![0u8; w * h * 4];
    out.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        let lo = y.saturating_sub(r);
        let hi = (y + r).min(h - 1);
        let rows = (hi - lo + 1) as u32;
        for x in 0..w {
            let cols = ((x + r).min(w - 1) - x.saturating_sub(r) + 1) as u32;
            let count = rows * cols;
            for c in 0..4 {
                let sum: u32 = (lo..=hi).map(|ny| horizontal[(ny * w + x) * 4 + c]).sum();
                row[x * 4 + c] = ((sum + count / 2) / count) as u8;
            }
        }
    });

    buffer.with_pixels(out)
}
