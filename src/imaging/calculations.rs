//! Pure calculation functions for image geometry.
//!
//! All functions here are pure and testable without any pixels or I/O.

use super::params::{Anchor, CropRect, Orientation, PageSize};

/// Points per CSS pixel: PDF works in 1/72 inch, screens in 1/96 inch.
const POINTS_PER_PIXEL: f32 = 72.0 / 96.0;

/// Fit `source` inside `bounds`, preserving aspect ratio.
///
/// If the source is wider than the box it is width-bound, otherwise
/// height-bound. One side always matches the box exactly.
///
/// # Examples
/// ```
/// # use image_desk::imaging::calculations::fit_dimensions;
/// // 2:1 source into a square box → width-bound
/// assert_eq!(fit_dimensions((400, 200), (150, 150)), (150, 75));
///
/// // 1:2 source into a square box → height-bound
/// assert_eq!(fit_dimensions((200, 400), (150, 150)), (75, 150));
/// ```
pub fn fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (box_w, box_h) = bounds;

    let src_aspect = src_w as f64 / src_h as f64;
    let box_aspect = box_w as f64 / box_h as f64;

    if src_aspect > box_aspect {
        // Source is wider: width matches, height shrinks
        let h = (box_w as f64 / src_aspect).round().max(1.0) as u32;
        (box_w, h)
    } else {
        // Source is taller (or same shape): height matches
        let w = (box_h as f64 * src_aspect).round().max(1.0) as u32;
        (w, box_h)
    }
}

/// Derive resize dimensions when the aspect ratio is locked.
///
/// Width wins when both are given; the missing side is computed from the
/// source aspect ratio. Returns `None` when neither side is given.
pub fn locked_dimensions(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> Option<(u32, u32)> {
    let aspect = source.0 as f64 / source.1 as f64;
    match (width, height) {
        (Some(w), _) => Some((w, (w as f64 / aspect).round() as u32)),
        (None, Some(h)) => Some(((h as f64 * aspect).round() as u32, h)),
        (None, None) => None,
    }
}

/// Top-left corner of an overlay placed on a base image.
///
/// Corner anchors keep `padding` pixels from both adjacent edges; `Center`
/// ignores padding. The result can be negative when the overlay is larger
/// than the base.
pub fn overlay_origin(
    base: (u32, u32),
    overlay: (u32, u32),
    anchor: Anchor,
    padding: u32,
) -> (i64, i64) {
    let (bw, bh) = (base.0 as i64, base.1 as i64);
    let (ow, oh) = (overlay.0 as i64, overlay.1 as i64);
    let pad = padding as i64;

    match anchor {
        Anchor::TopLeft => (pad, pad),
        Anchor::TopRight => (bw - ow - pad, pad),
        Anchor::BottomLeft => (pad, bh - oh - pad),
        Anchor::BottomRight => (bw - ow - pad, bh - oh - pad),
        Anchor::Center => ((bw - ow) / 2, (bh - oh) / 2),
    }
}

/// Offset that centers `inner` inside `outer`.
pub fn centered_origin(outer: (u32, u32), inner: (u32, u32)) -> (u32, u32) {
    (
        outer.0.saturating_sub(inner.0) / 2,
        outer.1.saturating_sub(inner.1) / 2,
    )
}

/// Grid shape for `count` cells: `cols = ceil(sqrt(n))`, `rows = ceil(n / cols)`.
pub fn grid_shape(count: usize) -> (u32, u32) {
    if count == 0 {
        return (0, 0);
    }
    let mut cols = (count as f64).sqrt() as usize;
    // float ceil can overshoot on perfect squares
    while cols * cols < count {
        cols += 1;
    }
    let rows = count.div_ceil(cols);
    (cols as u32, rows as u32)
}

/// Grid cell height from the most portrait aspect ratio (width / height).
pub fn grid_cell_height(cell_width: u32, min_aspect: f64) -> u32 {
    (cell_width as f64 / min_aspect).round().max(1.0) as u32
}

/// Width of `source` when scaled to `height`, aspect preserved.
pub fn scale_to_height(source: (u32, u32), height: u32) -> u32 {
    (source.0 as f64 * height as f64 / source.1 as f64)
        .round()
        .max(1.0) as u32
}

/// Height of `source` when scaled to `width`, aspect preserved.
pub fn scale_to_width(source: (u32, u32), width: u32) -> u32 {
    (source.1 as f64 * width as f64 / source.0 as f64)
        .round()
        .max(1.0) as u32
}

/// Intersect a crop selection with the image bounds.
///
/// Returns `(x, y, width, height)` of the clipped rectangle, or `None` when
/// the intersection is empty.
pub fn clip_rect(rect: CropRect, bounds: (u32, u32)) -> Option<(u32, u32, u32, u32)> {
    let left = rect.x.max(0);
    let top = rect.y.max(0);
    let right = (rect.x + rect.width as i64).min(bounds.0 as i64);
    let bottom = (rect.y + rect.height as i64).min(bounds.1 as i64);

    if right <= left || bottom <= top {
        return None;
    }
    Some((
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    ))
}

/// Where an image lands on a PDF page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub page_width: f32,
    pub page_height: f32,
    /// Lower-left corner of the image (PDF origin is bottom-left).
    pub image_x: f32,
    pub image_y: f32,
    pub image_width: f32,
    pub image_height: f32,
}

/// Compute the page and image placement for a single-page PDF.
///
/// Fixed page sizes fit the image inside `margin` on every side, centered
/// and aspect-preserved. [`PageSize::Fit`] sizes the page to the image's
/// physical size at 96 DPI with no margin; orientation is ignored for it.
pub fn page_layout(
    image: (u32, u32),
    page: PageSize,
    orientation: Orientation,
    margin: f32,
) -> PageLayout {
    let img_w = image.0 as f32 * POINTS_PER_PIXEL;
    let img_h = image.1 as f32 * POINTS_PER_PIXEL;

    let Some((portrait_w, portrait_h)) = page.points() else {
        return PageLayout {
            page_width: img_w,
            page_height: img_h,
            image_x: 0.0,
            image_y: 0.0,
            image_width: img_w,
            image_height: img_h,
        };
    };

    let (page_w, page_h) = match orientation {
        Orientation::Portrait => (portrait_w, portrait_h),
        Orientation::Landscape => (portrait_h, portrait_w),
    };
    let avail_w = (page_w - 2.0 * margin).max(1.0);
    let avail_h = (page_h - 2.0 * margin).max(1.0);
    let scale = (avail_w / img_w).min(avail_h / img_h);
    let (draw_w, draw_h) = (img_w * scale, img_h * scale);

    PageLayout {
        page_width: page_w,
        page_height: page_h,
        image_x: (page_w - draw_w) / 2.0,
        image_y: (page_h - draw_h) / 2.0,
        image_width: draw_w,
        image_height: draw_h,
    }
}
