//! Lay out several images on one canvas.
//!
//! Per-image scaling runs on the rayon pool and is joined before the canvas
//! is drawn, so a failure in any image means no composite at all.

use super::backend::ImagingError;
use super::buffer::PixelBuffer;
use super::calculations::{
    centered_origin, fit_dimensions, grid_cell_height, grid_shape, scale_to_height, scale_to_width,
};
use super::geometry::resize;
use super::params::{Layout, Rgba};
use image::RgbaImage;
use image::imageops;
use rayon::prelude::*;

/// Canvas settings shared by every layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeOptions {
    /// Grid cell width. Only the grid layout uses it.
    pub cell_width: u32,
    pub background: Rgba,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            cell_width: 300,
            background: Rgba::WHITE,
        }
    }
}

/// A scaled image and where it goes on the canvas.
struct Placement {
    buffer: PixelBuffer,
    x: u32,
    y: u32,
}

/// Compose `images` (in order) into one buffer.
pub fn merge_images(
    images: &[&PixelBuffer],
    layout: Layout,
    options: &MergeOptions,
) -> Result<PixelBuffer, ImagingError> {
    if images.len() < 2 {
        return Err(ImagingError::InvalidParameter(format!(
            "merge needs at least 2 images, got {}",
            images.len()
        )));
    }

    let (canvas_w, canvas_h, placements) = match layout {
        Layout::Grid => grid(images, options.cell_width)?,
        Layout::Horizontal => horizontal(images)?,
        Layout::Vertical => vertical(images)?,
    };

    let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, image::Rgba(options.background.0));
    for p in &placements {
        imageops::overlay(&mut canvas, &p.buffer.to_image(), p.x as i64, p.y as i64);
    }
    PixelBuffer::from_image(canvas)
}

/// Scale every image to its target size in parallel, keeping input order.
fn scale_all(
    images: &[&PixelBuffer],
    targets: &[(u32, u32)],
) -> Result<Vec<PixelBuffer>, ImagingError> {
    images
        .par_iter()
        .zip(targets.par_iter())
        .map(|(img, &(w, h))| resize(img, w, h))
        .collect()
}

type Plan = (u32, u32, Vec<Placement>);

fn grid(images: &[&PixelBuffer], cell_w: u32) -> Result<Plan, ImagingError> {
    if cell_w == 0 {
        return Err(ImagingError::InvalidGeometry(
            "grid cell width must be positive".into(),
        ));
    }
    let (cols, rows) = grid_shape(images.len());
    let min_aspect = images
        .iter()
        .map(|img| img.aspect_ratio())
        .fold(f64::INFINITY, f64::min);
    let cell_h = grid_cell_height(cell_w, min_aspect);

    let targets: Vec<_> = images
        .iter()
        .map(|img| fit_dimensions(img.dimensions(), (cell_w, cell_h)))
        .collect();
    let scaled = scale_all(images, &targets)?;

    let placements = scaled
        .into_iter()
        .enumerate()
        .map(|(i, buffer)| {
            let (col, row) = (i as u32 % cols, i as u32 / cols);
            let (ox, oy) = centered_origin((cell_w, cell_h), buffer.dimensions());
            Placement {
                buffer,
                x: col * cell_w + ox,
                y: row * cell_h + oy,
            }
        })
        .collect();
    Ok((cols * cell_w, rows * cell_h, placements))
}

fn horizontal(images: &[&PixelBuffer]) -> Result<Plan, ImagingError> {
    let height = images.iter().map(|img| img.height()).min().unwrap_or(1);
    let targets: Vec<_> = images
        .iter()
        .map(|img| (scale_to_height(img.dimensions(), height), height))
        .collect();
    let scaled = scale_all(images, &targets)?;

    let mut x = 0;
    let placements = scaled
        .into_iter()
        .map(|buffer| {
            let p = Placement { x, y: 0, buffer };
            x += p.buffer.width();
            p
        })
        .collect();
    Ok((x, height, placements))
}

fn vertical(images: &[&PixelBuffer]) -> Result<Plan, ImagingError> {
    let width = images.iter().map(|img| img.width()).min().unwrap_or(1);
    let targets: Vec<_> = images
        .iter()
        .map(|img| (width, scale_to_width(img.dimensions(), width)))
        .collect();
    let scaled = scale_all(images, &targets)?;

    let mut y = 0;
    let placements = scaled
        .into_iter()
        .map(|buffer| {
            let p = Placement { x: 0, y, buffer };
            y += p.buffer.height();
            p
        })
        .collect();
    Ok((width, y, placements))
}
