//! Encoding buffers into named artifacts and delivering them.
//!
//! Raster formats go straight to the [`ImageBackend`]. PDF wraps a JPEG
//! encode of the buffer in a single page through a [`PdfRenderer`]; when
//! none is configured the export fails with `DependencyUnavailable`.
//!
//! An [`Artifact`] is delivered either to the preview channel (returned to
//! the caller, nothing written) or to an [`ArtifactSink`] for download.

use crate::imaging::calculations::page_layout;
use crate::imaging::pdf::JpegImage;
use crate::imaging::{
    BuiltinPdf, ImageBackend, ImagingError, OutputFormat, PdfPage, PdfRenderer, PixelBuffer,
    Quality,
};
use crate::naming::artifact_name;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// Encoded output plus its suggested file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: &'static str,
}

/// Receives downloaded artifacts.
pub trait ArtifactSink: Sync {
    fn save(&self, artifact: &Artifact) -> io::Result<()>;
}

/// Where an export goes.
#[derive(Clone, Copy)]
pub enum ExportTarget<'a> {
    /// Hand the artifact back for display.
    Preview,
    /// Save through a sink.
    Download(&'a dyn ArtifactSink),
}

/// Writes artifacts into a directory, creating it on first save.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactSink for DirectorySink {
    fn save(&self, artifact: &Artifact) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.dir.join(&artifact.file_name), &artifact.bytes)
    }
}

/// Collects artifacts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Mutex<Vec<Artifact>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Artifacts saved so far, in save order.
    pub fn artifacts(&self) -> Vec<Artifact> {
        self.saved
            .lock()
            .map(|saved| saved.clone())
            .unwrap_or_default()
    }
}

impl ArtifactSink for MemorySink {
    fn save(&self, artifact: &Artifact) -> io::Result<()> {
        self.saved
            .lock()
            .map_err(|_| io::Error::other("memory sink poisoned"))?
            .push(artifact.clone());
        Ok(())
    }
}

/// Turns buffers into artifacts.
pub struct Exporter {
    pdf: Option<Box<dyn PdfRenderer>>,
    page: PdfPage,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(PdfPage::default())
    }
}

impl Exporter {
    /// Exporter with the built-in PDF writer.
    pub fn new(page: PdfPage) -> Self {
        Self {
            pdf: Some(Box::new(BuiltinPdf)),
            page,
        }
    }

    /// Exporter with a caller-supplied PDF renderer, or none at all.
    pub fn with_renderer(page: PdfPage, renderer: Option<Box<dyn PdfRenderer>>) -> Self {
        Self {
            pdf: renderer,
            page,
        }
    }

    /// Encode `buffer` in `format`. Quality is ignored by lossless formats.
    pub fn encode(
        &self,
        backend: &impl ImageBackend,
        buffer: &PixelBuffer,
        format: OutputFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, ImagingError> {
        if format.is_raster() {
            return backend.encode(buffer, format, quality);
        }
        let renderer = self
            .pdf
            .as_deref()
            .ok_or_else(|| ImagingError::DependencyUnavailable("PDF renderer".into()))?;
        let jpeg = backend.encode(buffer, OutputFormat::Jpeg, quality)?;
        let layout = page_layout(
            buffer.dimensions(),
            self.page.size,
            self.page.orientation,
            self.page.margin,
        );
        renderer.render(
            &layout,
            &JpegImage {
                bytes: &jpeg,
                width: buffer.width(),
                height: buffer.height(),
            },
        )
    }

    /// Encode and name an artifact `<prefix>_<stem>.<ext>`.
    pub fn artifact(
        &self,
        backend: &impl ImageBackend,
        buffer: &PixelBuffer,
        format: OutputFormat,
        quality: Quality,
        prefix: &str,
        source_name: &str,
    ) -> Result<Artifact, ImagingError> {
        let bytes = self.encode(backend, buffer, format, quality)?;
        Ok(Artifact {
            bytes,
            file_name: artifact_name(prefix, source_name, format.extension()),
            mime_type: format.mime(),
        })
    }
}

/// Route an artifact to its target. The artifact is handed back either way.
pub fn deliver(artifact: Artifact, target: ExportTarget<'_>) -> Result<Artifact, ImagingError> {
    if let ExportTarget::Download(sink) = target {
        sink.save(&artifact)?;
    }
    Ok(artifact)
}
