//! Pure Rust codec backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP, GIF, BMP) | `image::ImageReader` with guessed format |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (alpha flattened onto white) |
//! | Encode → PNG | `image::codecs::png::PngEncoder` |
//! | Encode → WebP | `image::codecs::webp::WebPEncoder` (lossless, quality via quantization) |
//! | Encode → BMP | `image::codecs::bmp::BmpEncoder` |
//!
//! Decoding to pixels and re-encoding drops every metadata chunk (EXIF,
//! IPTC, ICC), which is what metadata stripping relies on.

use super::backend::{Decoded, ImageBackend, ImagingError};
use super::buffer::PixelBuffer;
use super::params::{OutputFormat, Quality};
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;
use std::sync::LazyLock;

/// Extensions we try to decode, paired with the format used as a fallback
/// when magic-byte detection fails.
const INPUT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
    ("bmp", ImageFormat::Bmp),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    INPUT_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether `path` has one of the [`supported_input_extensions`].
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

fn format_from_name(name: &str) -> Option<ImageFormat> {
    let ext = Path::new(name).extension()?.to_str()?;
    INPUT_CANDIDATES
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(ext))
        .map(|(_, fmt)| *fmt)
}

fn mime_of(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Bmp => "image/bmp",
        _ => "image/png",
    }
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<Decoded, ImagingError> {
        let failure = |reason: String| ImagingError::DecodeFailure {
            name: name.to_string(),
            reason,
        };

        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| failure(e.to_string()))?;
        if reader.format().is_none() {
            match format_from_name(name) {
                Some(fmt) => reader.set_format(fmt),
                None => return Err(failure("unrecognized image format".into())),
            }
        }
        let format = reader
            .format()
            .ok_or_else(|| failure("unrecognized image format".into()))?;

        let image = reader.decode().map_err(|e| failure(e.to_string()))?;
        let buffer = PixelBuffer::from_image(image.to_rgba8()).map_err(|e| failure(e.to_string()))?;
        Ok(Decoded {
            buffer,
            mime_type: mime_of(format),
        })
    }

    fn encode(
        &self,
        buffer: &PixelBuffer,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, ImagingError> {
        let (width, height) = buffer.dimensions();
        let mut out = Vec::new();
        let result = match format {
            OutputFormat::Jpeg => {
                let rgb = flatten_onto_white(buffer.as_bytes());
                JpegEncoder::new_with_quality(&mut out, quality.percent()).write_image(
                    &rgb,
                    width,
                    height,
                    ExtendedColorType::Rgb8,
                )
            }
            OutputFormat::Png => PngEncoder::new(&mut out).write_image(
                buffer.as_bytes(),
                width,
                height,
                ExtendedColorType::Rgba8,
            ),
            OutputFormat::Webp => {
                let mut data = buffer.as_bytes().to_vec();
                quantize_rgb(&mut data, quality.percent());
                WebPEncoder::new_lossless(&mut out).encode(
                    &data,
                    width,
                    height,
                    ExtendedColorType::Rgba8,
                )
            }
            OutputFormat::Bmp => BmpEncoder::new(&mut out).write_image(
                buffer.as_bytes(),
                width,
                height,
                ExtendedColorType::Rgba8,
            ),
            OutputFormat::Pdf => {
                return Err(ImagingError::EncodeFailure(
                    "PDF is not a raster format; export it through a PDF renderer".into(),
                ));
            }
        };
        result.map_err(|e| {
            ImagingError::EncodeFailure(format!("{} encode failed: {e}", format.extension()))
        })?;
        Ok(out)
    }
}

/// Drop alpha for JPEG, compositing translucent pixels over white.
fn flatten_onto_white(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let a = px[3] as u32;
        for &c in &px[..3] {
            rgb.push(((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8);
        }
    }
    rgb
}

/// Snap RGB channels to a reduced set of levels so the lossless WebP
/// encoder compresses harder. Alpha is untouched; 100 leaves data as is.
fn quantize_rgb(data: &mut [u8], quality: u8) {
    if quality >= 100 {
        return;
    }
    let step = 255.0 / (webp_levels(quality) as f32 - 1.0);
    for pixel in data.chunks_exact_mut(4) {
        for channel in pixel.iter_mut().take(3) {
            let bucket = (f32::from(*channel) / step).round();
            *channel = (bucket * step).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Levels per channel for a quality: coarse at low quality, near-full at high.
fn webp_levels(quality: u8) -> u16 {
    if quality >= 100 {
        return 256;
    }
    let normalized = (quality as f32).clamp(1.0, 100.0) / 100.0;
    (2.0 + normalized * normalized * 254.0).round().clamp(2.0, 256.0) as u16
}
