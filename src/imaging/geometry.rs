//! Transforms that change buffer dimensions or place one buffer onto another.
//!
//! | Operation | Implementation |
//! |---|---|
//! | Resize | `image::imageops::resize` with `Triangle` (bilinear) |
//! | Thumbnail | fit-resize, then centered `imageops::overlay` on a filled canvas |
//! | Crop | clipped row copy |
//! | Overlay | straight-alpha source-over blend at an anchor |
//!
//! Invalid requests fail with [`ImagingError::InvalidGeometry`] before any
//! pixels are produced.

use super::backend::ImagingError;
use super::buffer::PixelBuffer;
use super::calculations::{centered_origin, clip_rect, fit_dimensions, overlay_origin};
use super::params::{Anchor, CropRect, Rgba};
use image::RgbaImage;
use image::imageops::{self, FilterType};

fn require_positive(width: u32, height: u32) -> Result<(), ImagingError> {
    if width == 0 || height == 0 {
        return Err(ImagingError::InvalidGeometry(format!(
            "target dimensions must be positive, got {width}x{height}"
        )));
    }
    Ok(())
}

/// Scale to exact dimensions. Aspect ratio is the caller's concern.
pub fn resize(buffer: &PixelBuffer, width: u32, height: u32) -> Result<PixelBuffer, ImagingError> {
    require_positive(width, height)?;
    if buffer.dimensions() == (width, height) {
        return Ok(buffer.clone());
    }
    let resized = imageops::resize(&buffer.to_image(), width, height, FilterType::Triangle);
    PixelBuffer::from_image(resized)
}

/// Produce exactly `box_w × box_h`: the image fitted inside, centered, and
/// the uncovered area filled with `fill`.
pub fn thumbnail(
    buffer: &PixelBuffer,
    box_w: u32,
    box_h: u32,
    fill: Rgba,
) -> Result<PixelBuffer, ImagingError> {
    require_positive(box_w, box_h)?;
    let (w, h) = fit_dimensions(buffer.dimensions(), (box_w, box_h));
    let scaled = resize(buffer, w, h)?;

    let mut canvas = RgbaImage::from_pixel(box_w, box_h, image::Rgba(fill.0));
    let (x, y) = centered_origin((box_w, box_h), (w, h));
    imageops::overlay(&mut canvas, &scaled.to_image(), x as i64, y as i64);
    PixelBuffer::from_image(canvas)
}

/// Extract a sub-rectangle, clipped to the buffer.
pub fn crop(buffer: &PixelBuffer, rect: CropRect) -> Result<PixelBuffer, ImagingError> {
    let (x, y, w, h) = clip_rect(rect, buffer.dimensions()).ok_or_else(|| {
        ImagingError::InvalidGeometry(format!(
            "crop {}x{} at ({}, {}) does not intersect the {}x{} image",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            buffer.width(),
            buffer.height()
        ))
    })?;

    let stride = buffer.width() as usize * 4;
    let src = buffer.as_bytes();
    let mut pixels = Vec::with_capacity(w as usize * h as usize * 4);
    for row in y..y + h {
        let start = row as usize * stride + x as usize * 4;
        pixels.extend_from_slice(&src[start..start + w as usize * 4]);
    }
    PixelBuffer::new(w, h, pixels)
}

/// Blend `overlay` onto a copy of `base` at `anchor`.
///
/// Effective alpha is `overlay_alpha / 255 * opacity`. Pixels outside the
/// overlay footprint are unchanged; overlay pixels falling outside the base
/// are dropped.
pub fn composite_overlay(
    base: &PixelBuffer,
    overlay: &PixelBuffer,
    anchor: Anchor,
    opacity: f32,
    padding: u32,
) -> PixelBuffer {
    let opacity = if opacity.is_nan() {
        0.0
    } else {
        opacity.clamp(0.0, 1.0)
    };
    let mut pixels = base.as_bytes().to_vec();
    if opacity == 0.0 {
        return base.with_pixels(pixels);
    }

    let (base_w, base_h) = (base.width() as i64, base.height() as i64);
    let (ox, oy) = overlay_origin(base.dimensions(), overlay.dimensions(), anchor, padding);
    let src = overlay.as_bytes();
    let over_w = overlay.width() as i64;

    for sy in 0..overlay.height() as i64 {
        let ty = oy + sy;
        if ty < 0 || ty >= base_h {
            continue;
        }
        for sx in 0..over_w {
            let tx = ox + sx;
            if tx < 0 || tx >= base_w {
                continue;
            }
            let si = ((sy * over_w + sx) * 4) as usize;
            let di = ((ty * base_w + tx) * 4) as usize;
            blend_over(&mut pixels[di..di + 4], &src[si..si + 4], opacity);
        }
    }

    base.with_pixels(pixels)
}

/// Straight-alpha "source over" for one pixel.
fn blend_over(dst: &mut [u8], src: &[u8], opacity: f32) {
    let a = src[3] as f32 / 255.0 * opacity;
    if a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = a + dst_a * (1.0 - a);
    for c in 0..3 {
        let blended = (src[c] as f32 * a + dst[c] as f32 * dst_a * (1.0 - a)) / out_a;
        dst[c] = blended.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
