//! Shared types used by the session, batch runner and exporter.
//!
//! Records are immutable values. A transform never edits a record; it
//! builds a new one that shares nothing mutable with the old, while the
//! pixel data itself is reference-counted so history snapshots are cheap.

use crate::imaging::{
    Decoded, ImagingError, Layout, MergeOptions, PixelBuffer, merge::merge_images,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One loaded or produced image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub buffer: Arc<PixelBuffer>,
    pub name: String,
    /// Encoded size in bytes when known, raw buffer size otherwise.
    pub byte_size: usize,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

impl ImageRecord {
    /// Record for freshly decoded source bytes.
    pub fn from_decoded(name: &str, byte_size: usize, decoded: Decoded) -> Self {
        let (width, height) = decoded.buffer.dimensions();
        Self {
            buffer: Arc::new(decoded.buffer),
            name: name.to_string(),
            byte_size,
            mime_type: decoded.mime_type.to_string(),
            width,
            height,
        }
    }

    /// Successor record holding `buffer`. Name is kept.
    pub fn derive(&self, buffer: Arc<PixelBuffer>, byte_size: Option<usize>, mime_type: &str) -> Self {
        let (width, height) = buffer.dimensions();
        Self {
            byte_size: byte_size.unwrap_or(buffer.as_bytes().len()),
            buffer,
            name: self.name.clone(),
            mime_type: mime_type.to_string(),
            width,
            height,
        }
    }

    /// Metadata without the pixels, for the recent-files list.
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            name: self.name.clone(),
            byte_size: self.byte_size,
            mime_type: self.mime_type.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

/// Record metadata as persisted in the recent-files store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSummary {
    pub name: String,
    pub byte_size: usize,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
}

/// Ordered, user-curated list of images queued for compositing.
#[derive(Debug, Clone, Default)]
pub struct MergeSet {
    items: Vec<ImageRecord>,
}

impl MergeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ImageRecord) {
        self.items.push(record);
    }

    /// Remove the record at `index`. Out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) -> Option<ImageRecord> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Swap with the previous entry. Returns whether anything moved.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.items.len() {
            return false;
        }
        self.items.swap(index - 1, index);
        true
    }

    /// Swap with the next entry. Returns whether anything moved.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.items.len() {
            return false;
        }
        self.items.swap(index, index + 1);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.items
    }

    /// Compose the set in its current order.
    pub fn compose(&self, layout: Layout, options: &MergeOptions) -> Result<PixelBuffer, ImagingError> {
        let buffers: Vec<&PixelBuffer> = self.items.iter().map(|r| r.buffer.as_ref()).collect();
        merge_images(&buffers, layout, options)
    }
}
