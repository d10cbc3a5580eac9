//! High-level image operations.
//!
//! An [`Operation`] is one user-selected tool with its parameters. It knows
//! how to transform pixels (dispatching to the filter and geometry engines),
//! how its result should be encoded, and which prefix its artifacts carry.
//! The same value drives the interactive session and the batch runner.

use super::backend::{Decoded, ImageBackend, ImagingError};
use super::buffer::PixelBuffer;
use super::calculations::locked_dimensions;
use super::filters::apply_filter;
use super::geometry::{composite_overlay, crop, resize, thumbnail};
use super::merge::{MergeOptions, merge_images};
use super::params::{Anchor, CropRect, FilterKind, Intensity, Layout, OutputFormat, Quality, Rgba};
use super::text::render_text;
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImagingError>;

/// What gets stamped onto the image.
#[derive(Debug, Clone, PartialEq)]
pub enum WatermarkSource {
    Text { text: String, scale: u32, color: Rgba },
    Image(Arc<PixelBuffer>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
    pub source: WatermarkSource,
    pub anchor: Anchor,
    pub opacity: f32,
    pub padding: u32,
}

/// One tool application.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Without `keep_aspect` both sides are required. With it, width wins
    /// and the other side follows the source aspect ratio.
    Resize {
        width: Option<u32>,
        height: Option<u32>,
        keep_aspect: bool,
    },
    Thumbnail {
        width: u32,
        height: u32,
        fill: Rgba,
    },
    Crop(CropRect),
    Filter {
        kind: FilterKind,
        intensity: Intensity,
    },
    Watermark(Watermark),
    Compress {
        quality: Quality,
    },
    Convert {
        format: OutputFormat,
        quality: Quality,
    },
    StripMetadata,
}

impl Operation {
    /// Short verb used in progress output.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Resize { .. } => "resize",
            Operation::Thumbnail { .. } => "thumbnail",
            Operation::Crop(_) => "crop",
            Operation::Filter { .. } => "filter",
            Operation::Watermark(_) => "watermark",
            Operation::Compress { .. } => "compress",
            Operation::Convert { .. } => "convert",
            Operation::StripMetadata => "strip",
        }
    }

    /// Artifact name prefix: `<prefix>_<stem>.<ext>`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Operation::Resize { .. } => "resized",
            Operation::Thumbnail { .. } => "thumbnail",
            Operation::Crop(_) => "cropped",
            Operation::Filter { .. } => "filtered",
            Operation::Watermark(_) => "watermarked",
            Operation::Compress { .. } => "compressed",
            Operation::Convert { .. } => "converted",
            Operation::StripMetadata => "stripped",
        }
    }

    /// Operations whose effect is entirely in the encoding step.
    pub fn is_encode_only(&self) -> bool {
        matches!(
            self,
            Operation::Compress { .. } | Operation::Convert { .. } | Operation::StripMetadata
        )
    }

    /// Format and quality for this operation's artifact.
    ///
    /// Pixel operations keep the source format; metadata stripping
    /// re-encodes the source format at maximum quality.
    pub fn encoding(&self, source_mime: &str, default_quality: Quality) -> (OutputFormat, Quality) {
        match self {
            Operation::Compress { quality } => (OutputFormat::Jpeg, *quality),
            Operation::Convert { format, quality } => (*format, *quality),
            Operation::StripMetadata => (OutputFormat::from_mime(source_mime), Quality::MAX),
            _ => (OutputFormat::from_mime(source_mime), default_quality),
        }
    }

    /// Apply the pixel part of the operation.
    ///
    /// Encode-only operations hand back the same buffer without copying.
    pub fn transform(&self, buffer: &Arc<PixelBuffer>) -> Result<Arc<PixelBuffer>> {
        let out = match self {
            Operation::Resize {
                width,
                height,
                keep_aspect,
            } => {
                let (w, h) = resize_target(buffer.dimensions(), *width, *height, *keep_aspect)?;
                resize(buffer, w, h)?
            }
            Operation::Thumbnail {
                width,
                height,
                fill,
            } => thumbnail(buffer, *width, *height, *fill)?,
            Operation::Crop(rect) => crop(buffer, *rect)?,
            Operation::Filter { kind, intensity } => apply_filter(buffer, *kind, *intensity),
            Operation::Watermark(mark) => {
                let overlay = match &mark.source {
                    WatermarkSource::Text { text, scale, color } => {
                        Arc::new(render_text(text, *scale, *color)?)
                    }
                    WatermarkSource::Image(image) => Arc::clone(image),
                };
                composite_overlay(buffer, &overlay, mark.anchor, mark.opacity, mark.padding)
            }
            Operation::Compress { .. } | Operation::Convert { .. } | Operation::StripMetadata => {
                return Ok(Arc::clone(buffer));
            }
        };
        Ok(Arc::new(out))
    }
}

fn resize_target(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
    keep_aspect: bool,
) -> Result<(u32, u32)> {
    let target = if keep_aspect {
        locked_dimensions(source, width, height)
    } else {
        width.zip(height)
    };
    target.ok_or_else(|| {
        ImagingError::InvalidParameter(if keep_aspect {
            "resize needs a width or a height".into()
        } else {
            "resize needs both width and height unless the aspect ratio is locked".into()
        })
    })
}

/// Encoded source bytes plus the name they were loaded under.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, naming it by its file name.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// Decode every source in parallel; the first failure fails the whole set.
pub fn decode_all(backend: &impl ImageBackend, sources: &[SourceFile]) -> Result<Vec<Decoded>> {
    sources
        .par_iter()
        .map(|src| backend.decode(&src.name, &src.bytes))
        .collect()
}

/// Decode all sources, wait for every decode, then compose them.
pub fn merge_sources(
    backend: &impl ImageBackend,
    sources: &[SourceFile],
    layout: Layout,
    options: &MergeOptions,
) -> Result<PixelBuffer> {
    if sources.len() < 2 {
        return Err(ImagingError::InvalidParameter(format!(
            "merge needs at least 2 images, got {}",
            sources.len()
        )));
    }
    let decoded = decode_all(backend, sources)?;
    let buffers: Vec<&PixelBuffer> = decoded.iter().map(|d| &d.buffer).collect();
    merge_images(&buffers, layout, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp, mock_bytes};
    use crate::test_helpers::gradient_buffer;

    fn arc(w: u32, h: u32) -> Arc<PixelBuffer> {
        Arc::new(gradient_buffer(w, h))
    }

    // =========================================================================
    // Resize targets
    // =========================================================================

    #[test]
    fn resize_exact_needs_both_sides() {
        let op = Operation::Resize {
            width: Some(400),
            height: None,
            keep_aspect: false,
        };
        assert!(matches!(
            op.transform(&arc(80, 60)),
            Err(ImagingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn resize_locked_derives_height() {
        let op = Operation::Resize {
            width: Some(40),
            height: None,
            keep_aspect: true,
        };
        assert_eq!(op.transform(&arc(80, 60)).unwrap().dimensions(), (40, 30));
    }

    #[test]
    fn resize_locked_derives_width_from_height() {
        let op = Operation::Resize {
            width: None,
            height: Some(30),
            keep_aspect: true,
        };
        assert_eq!(op.transform(&arc(80, 60)).unwrap().dimensions(), (40, 30));
    }

    #[test]
    fn resize_zero_is_invalid_geometry() {
        let op = Operation::Resize {
            width: Some(0),
            height: Some(10),
            keep_aspect: false,
        };
        assert!(matches!(
            op.transform(&arc(8, 8)),
            Err(ImagingError::InvalidGeometry(_))
        ));
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    #[test]
    fn encode_only_operations_share_the_buffer() {
        let buf = arc(4, 4);
        for op in [
            Operation::Compress {
                quality: Quality::new(0.5),
            },
            Operation::Convert {
                format: OutputFormat::Png,
                quality: Quality::default(),
            },
            Operation::StripMetadata,
        ] {
            assert!(op.is_encode_only());
            assert!(Arc::ptr_eq(&op.transform(&buf).unwrap(), &buf));
        }
    }

    #[test]
    fn filter_dispatches_to_engine() {
        let op = Operation::Filter {
            kind: FilterKind::Invert,
            intensity: Intensity::default(),
        };
        let buf = arc(3, 3);
        let out = op.transform(&buf).unwrap();
        let [r, g, b, a] = buf.pixel(1, 1);
        assert_eq!(out.pixel(1, 1), [255 - r, 255 - g, 255 - b, a]);
    }

    #[test]
    fn text_watermark_changes_pixels_in_corner() {
        let base = Arc::new(PixelBuffer::filled(100, 60, Rgba::BLACK).unwrap());
        let op = Operation::Watermark(Watermark {
            source: WatermarkSource::Text {
                text: "HI".into(),
                scale: 2,
                color: Rgba::WHITE,
            },
            anchor: Anchor::TopLeft,
            opacity: 1.0,
            padding: 20,
        });
        let out = op.transform(&base).unwrap();
        assert_eq!(out.dimensions(), (100, 60));
        let touched = (20..36)
            .flat_map(|y| (20..54).map(move |x| (x, y)))
            .any(|(x, y)| out.pixel(x, y) != [0, 0, 0, 255]);
        assert!(touched);
        assert_eq!(out.pixel(99, 59), [0, 0, 0, 255]);
    }

    #[test]
    fn empty_text_watermark_fails() {
        let op = Operation::Watermark(Watermark {
            source: WatermarkSource::Text {
                text: String::new(),
                scale: 2,
                color: Rgba::WHITE,
            },
            anchor: Anchor::Center,
            opacity: 0.5,
            padding: 20,
        });
        assert!(matches!(
            op.transform(&arc(10, 10)),
            Err(ImagingError::InvalidParameter(_))
        ));
    }

    #[test]
    fn huge_text_scale_watermark_fails() {
        let op = Operation::Watermark(Watermark {
            source: WatermarkSource::Text {
                text: "AB".into(),
                scale: 1 << 28,
                color: Rgba::WHITE,
            },
            anchor: Anchor::Center,
            opacity: 0.5,
            padding: 20,
        });
        assert!(matches!(
            op.transform(&arc(10, 10)),
            Err(ImagingError::InvalidParameter(_))
        ));
    }

    // =========================================================================
    // Naming and encoding
    // =========================================================================

    #[test]
    fn prefixes() {
        assert_eq!(
            Operation::Compress {
                quality: Quality::default()
            }
            .prefix(),
            "compressed"
        );
        assert_eq!(Operation::Crop(CropRect::new(0, 0, 1, 1)).prefix(), "cropped");
        assert_eq!(Operation::StripMetadata.prefix(), "stripped");
    }

    #[test]
    fn encoding_rules() {
        let q = Quality::new(0.7);
        let compress = Operation::Compress {
            quality: Quality::new(0.8),
        };
        assert_eq!(
            compress.encoding("image/png", q),
            (OutputFormat::Jpeg, Quality::new(0.8))
        );
        assert_eq!(
            Operation::StripMetadata.encoding("image/webp", q),
            (OutputFormat::Webp, Quality::MAX)
        );
        let filter = Operation::Filter {
            kind: FilterKind::Sepia,
            intensity: Intensity::default(),
        };
        assert_eq!(filter.encoding("image/gif", q), (OutputFormat::Png, q));
    }

    // =========================================================================
    // Merge fan-out
    // =========================================================================

    #[test]
    fn merge_sources_decodes_everything_then_composes() {
        let backend = MockBackend::new();
        let sources = vec![
            SourceFile::new("a.png", mock_bytes(&gradient_buffer(30, 30))),
            SourceFile::new("b.png", mock_bytes(&gradient_buffer(30, 30))),
            SourceFile::new("c.png", mock_bytes(&gradient_buffer(30, 30))),
        ];
        let merged = merge_sources(
            &backend,
            &sources,
            Layout::Grid,
            &MergeOptions {
                cell_width: 30,
                background: Rgba::WHITE,
            },
        )
        .unwrap();
        assert_eq!(merged.dimensions(), (60, 60));

        let mut decoded: Vec<String> = backend
            .get_operations()
            .into_iter()
            .filter_map(|op| match op {
                RecordedOp::Decode(name) => Some(name),
                _ => None,
            })
            .collect();
        decoded.sort();
        assert_eq!(decoded, vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn merge_sources_fails_without_partial_result() {
        let backend = MockBackend::new();
        let sources = vec![
            SourceFile::new("good.png", mock_bytes(&gradient_buffer(10, 10))),
            SourceFile::new("bad.png", b"garbage".to_vec()),
        ];
        let result = merge_sources(&backend, &sources, Layout::Horizontal, &MergeOptions::default());
        assert!(matches!(
            result,
            Err(ImagingError::DecodeFailure { name, .. }) if name == "bad.png"
        ));
    }

    #[test]
    fn merge_sources_needs_two() {
        let backend = MockBackend::new();
        let sources = vec![SourceFile::new("a.png", mock_bytes(&gradient_buffer(4, 4)))];
        assert!(matches!(
            merge_sources(&backend, &sources, Layout::Grid, &MergeOptions::default()),
            Err(ImagingError::InvalidParameter(_))
        ));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn source_file_read_uses_file_name() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        std::fs::write(&path, b"bytes").unwrap();
        let src = SourceFile::read(&path).unwrap();
        assert_eq!(src.name, "photo.jpg");
        assert_eq!(src.bytes, b"bytes");
    }
}
