//! Single-page PDF output.
//!
//! PDF rendering is a capability: anything implementing [`PdfRenderer`] can
//! turn a [`PageLayout`] plus JPEG bytes into a document. [`BuiltinPdf`]
//! ships with the crate and writes a minimal PDF 1.4 file that embeds the
//! JPEG stream unchanged (`/DCTDecode`), so no re-encoding happens.

use super::backend::ImagingError;
use super::calculations::PageLayout;
use super::params::{Orientation, PageSize};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Page settings for a PDF export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdfPage {
    pub size: PageSize,
    pub orientation: Orientation,
    /// Margin in points on every side. Ignored for `fit`.
    pub margin: f32,
}

impl Default for PdfPage {
    fn default() -> Self {
        Self {
            size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin: 20.0,
        }
    }
}

/// An encoded baseline JPEG and its pixel size.
#[derive(Debug, Clone, Copy)]
pub struct JpegImage<'a> {
    pub bytes: &'a [u8],
    pub width: u32,
    pub height: u32,
}

/// Renders one image onto one page.
pub trait PdfRenderer: Send + Sync {
    fn render(&self, layout: &PageLayout, image: &JpegImage<'_>) -> Result<Vec<u8>, ImagingError>;
}

/// Dependency-free writer for single-image documents.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinPdf;

impl PdfRenderer for BuiltinPdf {
    fn render(&self, layout: &PageLayout, image: &JpegImage<'_>) -> Result<Vec<u8>, ImagingError> {
        if image.bytes.is_empty() || image.width == 0 || image.height == 0 {
            return Err(ImagingError::EncodeFailure(
                "PDF page needs a non-empty JPEG image".into(),
            ));
        }
        Ok(write_single_page(layout, image))
    }
}

/// Accumulates objects and remembers their byte offsets for the xref table.
struct PdfWriter {
    out: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut out = Vec::new();
        // Binary marker comment so transfer tools treat the file as binary
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            out,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, dictionary: &str, stream: Option<&[u8]>) {
        self.offsets.push(self.out.len());
        let id = self.offsets.len();
        self.out
            .extend_from_slice(format!("{id} 0 obj\n{dictionary}\n").as_bytes());
        if let Some(data) = stream {
            self.out.extend_from_slice(b"stream\n");
            self.out.extend_from_slice(data);
            self.out.extend_from_slice(b"\nendstream\n");
        }
        self.out.extend_from_slice(b"endobj\n");
    }

    fn finish(mut self, root: usize) -> Vec<u8> {
        let xref_at = self.out.len();
        let mut table = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for offset in &self.offsets {
            let _ = write!(table, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            table,
            "trailer\n<< /Size {} /Root {root} 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            self.offsets.len() + 1
        );
        self.out.extend_from_slice(table.as_bytes());
        self.out
    }
}

/// Write the five objects of a one-image document.
fn write_single_page(layout: &PageLayout, image: &JpegImage<'_>) -> Vec<u8> {
    let mut pdf = PdfWriter::new();

    pdf.object("<< /Type /Catalog /Pages 2 0 R >>", None);
    pdf.object("<< /Type /Pages /Kids [3 0 R] /Count 1 >>", None);
    pdf.object(
        &format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
             /Resources << /XObject << /Im0 4 0 R >> >> /Contents 5 0 R >>",
            layout.page_width, layout.page_height
        ),
        None,
    );
    pdf.object(
        &format!(
            "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceRGB \
             /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>",
            image.width,
            image.height,
            image.bytes.len()
        ),
        Some(image.bytes),
    );
    let content = format!(
        "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/Im0 Do\nQ",
        layout.image_width, layout.image_height, layout.image_x, layout.image_y
    );
    pdf.object(
        &format!("<< /Length {} >>", content.len()),
        Some(content.as_bytes()),
    );

    pdf.finish(1)
}
