//! Image processing: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / encode** | `image` crate codecs behind [`ImageBackend`] |
//! | **Filters** | per-pixel maps and separable box blur, parallel with `rayon` |
//! | **Resize / thumbnail** | `imageops::resize` with `Triangle` |
//! | **Merge** | `rayon` fan-out scale, then `imageops::overlay` |
//! | **Text watermark** | `font8x8` bitmap glyphs |
//! | **PDF** | built-in single-page writer embedding the JPEG stream |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Engines**: `filters`, `geometry`, `merge`, `text` over [`PixelBuffer`]
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: [`Operation`] dispatch combining engines and encoding

pub mod backend;
pub mod buffer;
pub mod calculations;
pub mod filters;
pub mod geometry;
pub mod merge;
pub mod operations;
mod params;
pub mod pdf;
pub mod rust_backend;
pub mod text;

pub use backend::{Decoded, ImageBackend, ImagingError};
pub use buffer::PixelBuffer;
pub use merge::MergeOptions;
pub use operations::{Operation, SourceFile, Watermark, WatermarkSource};
pub use params::{
    Anchor, CropRect, FilterKind, Intensity, Layout, Orientation, OutputFormat, PageSize, Quality,
    Rgba,
};
pub use pdf::{BuiltinPdf, PdfPage, PdfRenderer};
pub use rust_backend::RustBackend;
