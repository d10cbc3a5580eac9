//! Codec backend trait and shared error type.
//!
//! The [`ImageBackend`] trait is the seam between pixel work (which is pure
//! and lives in the engine modules) and byte formats. Every backend must
//! support two operations: decode bytes into a [`PixelBuffer`] and encode a
//! buffer into one of the raster [`OutputFormat`]s.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend) — pure Rust decoders and
//! encoders from the `image` crate. PDF is not a raster format and is handled
//! by [`PdfRenderer`](super::pdf::PdfRenderer) on top of a JPEG encode.

use super::buffer::PixelBuffer;
use super::params::{OutputFormat, Quality};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Failed to decode {name}: {reason}")]
    DecodeFailure { name: String, reason: String },
    #[error("Encode failed: {0}")]
    EncodeFailure(String),
    #[error("{0} is not available")]
    DependencyUnavailable(String),
}

/// Result of a decode: the pixels plus the detected source MIME type.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub buffer: PixelBuffer,
    pub mime_type: &'static str,
}

/// Trait for codec backends.
///
/// `Sync` so one backend can serve a rayon fan-out (merge decode, batch).
pub trait ImageBackend: Sync {
    /// Decode an image. `name` is used for format fallback and error messages.
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<Decoded, ImagingError>;

    /// Encode a buffer as a raster format. Quality is ignored by lossless formats.
    fn encode(
        &self,
        buffer: &PixelBuffer,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, ImagingError>;
}
