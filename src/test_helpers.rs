//! Shared test utilities.
//!
//! Deterministic pixel buffers and small encoded images built in memory, so
//! no test depends on fixture files.

use crate::imaging::PixelBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};

/// Opaque RGBA gradient: red follows x, green follows y, blue mixes both.
pub fn gradient_buffer(width: u32, height: u32) -> PixelBuffer {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[
                (x * 255 / width.max(2).saturating_sub(1)).min(255) as u8,
                (y * 255 / height.max(2).saturating_sub(1)).min(255) as u8,
                ((x + y) * 7 % 256) as u8,
                255,
            ]);
        }
    }
    PixelBuffer::new(width, height, pixels).unwrap()
}

/// Baseline JPEG of a `width × height` gradient.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 90)
        .encode_image(&img)
        .unwrap();
    out
}

/// PNG encoding of a buffer, alpha included.
pub fn png_bytes(buffer: &PixelBuffer) -> Vec<u8> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(
            buffer.as_bytes(),
            buffer.width(),
            buffer.height(),
            ExtendedColorType::Rgba8,
        )
        .unwrap();
    out
}
