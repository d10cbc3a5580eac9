//! Interactive editing session.
//!
//! ```text
//! Empty ──load──▶ Loaded ──apply──▶ Transforming ──▶ Previewing
//!   ▲                ▲                                   │
//!   │                └────────────── reset ──────────────┤
//!   └──────────────────────────── clear ─────────────────┘
//! ```
//!
//! The session owns the current and original records, a bounded
//! [`History`], the zoom level and the recent-files list. All mutation goes
//! through `&mut self`, so a transform can never start reading the current
//! buffer before the previous one has been pushed onto the history.
//!
//! Every operation is all-or-nothing: on error the session is exactly as it
//! was before the call.

use crate::export::{Artifact, ExportTarget, Exporter, deliver};
use crate::history::{self, History};
use crate::imaging::{ImageBackend, ImagingError, Operation, OutputFormat, Quality};
use crate::recent::{RecentFiles, RecentStore};
use crate::types::ImageRecord;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use thiserror::Error;

pub const ZOOM_STEP: f32 = 1.25;
pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 10.0;

/// Prefix for whole-session exports.
const EXPORT_PREFIX: &str = "edited";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No image loaded")]
    NoImageLoaded,
    #[error(transparent)]
    Imaging(#[from] ImagingError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Loaded,
    /// Only observable while an operation is running.
    Transforming,
    Previewing,
}

/// Progress and outcome notifications for front ends.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Loaded {
        name: String,
        width: u32,
        height: u32,
        byte_size: usize,
    },
    Applied {
        operation: &'static str,
        width: u32,
        height: u32,
        history_len: usize,
    },
    Exported {
        file_name: String,
        byte_size: usize,
    },
    Undone {
        cursor: usize,
    },
    Redone {
        cursor: usize,
    },
    Reset,
    Cleared,
    Failed {
        action: &'static str,
        message: String,
    },
    Warning(String),
}

/// Session tunables, usually taken from the config file.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub history_capacity: usize,
    /// Quality used when an operation keeps the source format.
    pub default_quality: Quality,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            history_capacity: history::DEFAULT_CAPACITY,
            default_quality: Quality::default(),
        }
    }
}

/// Loaded image plus everything that depends on it.
struct Workspace {
    original: ImageRecord,
    history: History,
}

pub struct ImageSession<B: ImageBackend> {
    backend: B,
    exporter: Exporter,
    settings: SessionSettings,
    state: SessionState,
    workspace: Option<Workspace>,
    zoom: f32,
    recent: RecentFiles,
    store: Option<Box<dyn RecentStore>>,
    events: Option<Sender<SessionEvent>>,
}

impl<B: ImageBackend> ImageSession<B> {
    pub fn new(backend: B, settings: SessionSettings) -> Self {
        Self {
            backend,
            exporter: Exporter::default(),
            settings,
            state: SessionState::Empty,
            workspace: None,
            zoom: 1.0,
            recent: RecentFiles::default(),
            store: None,
            events: None,
        }
    }

    pub fn with_exporter(mut self, exporter: Exporter) -> Self {
        self.exporter = exporter;
        self
    }

    /// Attach a recent-files store and load its entries.
    pub fn with_recent_store(mut self, store: Box<dyn RecentStore>, capacity: usize) -> Self {
        self.recent = RecentFiles::from_entries(store.load(), capacity);
        self.store = Some(store);
        self
    }

    pub fn with_events(mut self, events: Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current(&self) -> Option<&ImageRecord> {
        self.workspace.as_ref().map(|ws| ws.history.current())
    }

    pub fn original(&self) -> Option<&ImageRecord> {
        self.workspace.as_ref().map(|ws| &ws.original)
    }

    pub fn history(&self) -> Option<&History> {
        self.workspace.as_ref().map(|ws| &ws.history)
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn recent(&self) -> &RecentFiles {
        &self.recent
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            tx.send(event).ok();
        }
    }

    fn fail<T>(&self, action: &'static str, err: SessionError) -> Result<T, SessionError> {
        self.emit(SessionEvent::Failed {
            action,
            message: err.to_string(),
        });
        Err(err)
    }

    fn remember(&mut self, record: &ImageRecord) {
        self.recent.touch(record.summary());
        if let Some(store) = &self.store
            && let Err(e) = store.persist(self.recent.entries())
        {
            self.emit(SessionEvent::Warning(format!(
                "could not save recent files: {e}"
            )));
        }
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    /// Decode `bytes` and make it the current and original image.
    ///
    /// A decode failure leaves the previous image (if any) in place.
    pub fn load(&mut self, name: &str, bytes: &[u8]) -> Result<&ImageRecord, SessionError> {
        let decoded = match self.backend.decode(name, bytes) {
            Ok(d) => d,
            Err(e) => return self.fail("load", e.into()),
        };
        let record = ImageRecord::from_decoded(name, bytes.len(), decoded);
        self.remember(&record);
        self.emit(SessionEvent::Loaded {
            name: record.name.clone(),
            width: record.width,
            height: record.height,
            byte_size: record.byte_size,
        });

        self.workspace = Some(Workspace {
            history: History::new(record.clone(), self.settings.history_capacity),
            original: record,
        });
        self.zoom = 1.0;
        self.state = SessionState::Loaded;
        self.current().ok_or(SessionError::NoImageLoaded)
    }

    /// Run `operation` on the current image and commit the result.
    pub fn apply(&mut self, operation: &Operation) -> Result<&ImageRecord, SessionError> {
        let Some(ws) = &self.workspace else {
            return self.fail(operation.name(), SessionError::NoImageLoaded);
        };
        let current = ws.history.current().clone();

        let previous = self.state;
        self.state = SessionState::Transforming;
        let next = match self.transform(operation, &current) {
            Ok(record) => record,
            Err(e) => {
                self.state = previous;
                return self.fail(operation.name(), e);
            }
        };

        let Some(ws) = self.workspace.as_mut() else {
            self.state = previous;
            return Err(SessionError::NoImageLoaded);
        };
        let (width, height) = (next.width, next.height);
        ws.history.push(next);
        let history_len = ws.history.len();
        self.state = SessionState::Previewing;

        self.emit(SessionEvent::Applied {
            operation: operation.name(),
            width,
            height,
            history_len,
        });
        self.current().ok_or(SessionError::NoImageLoaded)
    }

    /// Produce the successor record without touching session state.
    ///
    /// Encode-type operations go through the codec and back so the preview
    /// shows exactly what the artifact will contain.
    fn transform(
        &self,
        operation: &Operation,
        current: &ImageRecord,
    ) -> Result<ImageRecord, SessionError> {
        let buffer = operation.transform(&current.buffer)?;
        if !operation.is_encode_only() {
            return Ok(current.derive(buffer, None, &current.mime_type));
        }

        let (format, quality) =
            operation.encoding(&current.mime_type, self.settings.default_quality);
        if !format.is_raster() {
            return Err(ImagingError::InvalidParameter(
                "PDF can only be exported, not previewed".into(),
            )
            .into());
        }
        let bytes = self.backend.encode(&buffer, format, quality)?;
        let decoded = self.backend.decode(&current.name, &bytes)?;
        Ok(current.derive(Arc::new(decoded.buffer), Some(bytes.len()), format.mime()))
    }

    /// Run `operation` on the current image and deliver the result directly,
    /// leaving the history untouched.
    pub fn download(
        &mut self,
        operation: &Operation,
        target: ExportTarget<'_>,
    ) -> Result<Artifact, SessionError> {
        let Some(current) = self.current().cloned() else {
            return self.fail(operation.name(), SessionError::NoImageLoaded);
        };
        let result = operation.transform(&current.buffer).and_then(|buffer| {
            let (format, quality) =
                operation.encoding(&current.mime_type, self.settings.default_quality);
            let artifact = self.exporter.artifact(
                &self.backend,
                &buffer,
                format,
                quality,
                operation.prefix(),
                &current.name,
            )?;
            deliver(artifact, target)
        });
        self.finish_export(operation.name(), &current, result)
    }

    /// Export the current image as `edited_<stem>.<ext>`. Never touches history.
    pub fn export(
        &mut self,
        format: OutputFormat,
        quality: Quality,
        target: ExportTarget<'_>,
    ) -> Result<Artifact, SessionError> {
        let Some(current) = self.current().cloned() else {
            return self.fail("export", SessionError::NoImageLoaded);
        };
        let result = self
            .exporter
            .artifact(
                &self.backend,
                &current.buffer,
                format,
                quality,
                EXPORT_PREFIX,
                &current.name,
            )
            .and_then(|artifact| deliver(artifact, target));
        self.finish_export("export", &current, result)
    }

    fn finish_export(
        &mut self,
        action: &'static str,
        current: &ImageRecord,
        result: Result<Artifact, ImagingError>,
    ) -> Result<Artifact, SessionError> {
        match result {
            Ok(artifact) => {
                self.remember(current);
                self.emit(SessionEvent::Exported {
                    file_name: artifact.file_name.clone(),
                    byte_size: artifact.bytes.len(),
                });
                Ok(artifact)
            }
            Err(e) => self.fail(action, e.into()),
        }
    }

    /// Drop the image and its history. Recent files are kept.
    pub fn clear(&mut self) {
        self.workspace = None;
        self.zoom = 1.0;
        self.state = SessionState::Empty;
        self.emit(SessionEvent::Cleared);
    }

    /// Go back to the image as loaded: history of one, zoom 1.0.
    pub fn reset(&mut self) -> Result<&ImageRecord, SessionError> {
        let Some(ws) = self.workspace.as_mut() else {
            return self.fail("reset", SessionError::NoImageLoaded);
        };
        ws.history.reset(ws.original.clone());
        self.zoom = 1.0;
        self.state = SessionState::Loaded;
        self.emit(SessionEvent::Reset);
        self.current().ok_or(SessionError::NoImageLoaded)
    }

    /// Step back in history. Returns whether the cursor moved.
    pub fn undo(&mut self) -> Result<bool, SessionError> {
        let Some(ws) = self.workspace.as_mut() else {
            return self.fail("undo", SessionError::NoImageLoaded);
        };
        let moved = ws.history.undo().is_some();
        let cursor = ws.history.cursor();
        if moved {
            self.state = SessionState::Previewing;
            self.emit(SessionEvent::Undone { cursor });
        }
        Ok(moved)
    }

    /// Step forward in history. Returns whether the cursor moved.
    pub fn redo(&mut self) -> Result<bool, SessionError> {
        let Some(ws) = self.workspace.as_mut() else {
            return self.fail("redo", SessionError::NoImageLoaded);
        };
        let moved = ws.history.redo().is_some();
        let cursor = ws.history.cursor();
        if moved {
            self.state = SessionState::Previewing;
            self.emit(SessionEvent::Redone { cursor });
        }
        Ok(moved)
    }

    // =========================================================================
    // Zoom
    // =========================================================================

    /// Set the zoom level, clamped to `[MIN_ZOOM, MAX_ZOOM]`.
    pub fn set_zoom(&mut self, zoom: f32) -> Result<f32, SessionError> {
        if self.workspace.is_none() {
            return self.fail("zoom", SessionError::NoImageLoaded);
        }
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
        Ok(self.zoom)
    }

    pub fn zoom_in(&mut self) -> Result<f32, SessionError> {
        self.set_zoom(self.zoom * ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> Result<f32, SessionError> {
        self.set_zoom(self.zoom / ZOOM_STEP)
    }
}
