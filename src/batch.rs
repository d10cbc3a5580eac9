//! One operation over many images.
//!
//! Each source is decoded, transformed, encoded and delivered on its own,
//! in parallel on the rayon pool. Items share no pixel state; the only
//! shared state is the progress counter and the cancel flag.
//!
//! ## Outcomes
//!
//! ```text
//! a.jpg  → compressed_a.jpg     Saved
//! b.txt  → decode failure       Failed     (run continues)
//! c.png  → (cancel raised)      Cancelled  (never started)
//! ```
//!
//! The report lists outcomes in input order regardless of completion order.
//!
//! ## Progress
//!
//! A [`BatchEvent::ItemFinished`] is sent after every attempted item. The
//! counter is bumped and the event sent under one lock, so `processed` is
//! strictly increasing on the receiving side.

use crate::export::{Artifact, ExportTarget, Exporter, deliver};
use crate::imaging::{ImageBackend, ImagingError, Operation, Quality, SourceFile};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

/// Run options.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Quality for operations that keep the source format.
    pub default_quality: Quality,
    /// Raised by another thread to stop before the next item starts.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl BatchOptions {
    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// What happened to one source.
#[derive(Debug)]
pub enum BatchOutcome {
    Saved { source: String, artifact: Artifact },
    Failed { source: String, error: ImagingError },
    Cancelled { source: String },
}

impl BatchOutcome {
    pub fn source(&self) -> &str {
        match self {
            BatchOutcome::Saved { source, .. }
            | BatchOutcome::Failed { source, .. }
            | BatchOutcome::Cancelled { source } => source,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, BatchOutcome::Saved { .. })
    }
}

/// Short status carried by progress events.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemStatus {
    Saved { file_name: String, byte_size: usize },
    Failed(String),
}

/// Progress notifications from a run.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    Started {
        operation: &'static str,
        total: usize,
    },
    ItemFinished {
        processed: usize,
        total: usize,
        source: String,
        status: ItemStatus,
    },
    Cancelled {
        remaining: usize,
    },
}

#[derive(Debug)]
pub struct BatchReport {
    /// One outcome per source, in input order.
    pub outcomes: Vec<BatchOutcome>,
    /// Items attempted (saved or failed).
    pub processed: usize,
    pub total: usize,
}

impl BatchReport {
    pub fn saved(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_saved()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, BatchOutcome::Failed { .. }))
            .count()
    }

    pub fn cancelled(&self) -> usize {
        self.total - self.processed
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.outcomes.iter().filter_map(|o| match o {
            BatchOutcome::Saved { artifact, .. } => Some(artifact),
            _ => None,
        })
    }
}

/// Run `operation` over every source.
///
/// Never fails as a whole: per-item errors end up in the report.
pub fn run(
    backend: &impl ImageBackend,
    exporter: &Exporter,
    sources: &[SourceFile],
    operation: &Operation,
    options: &BatchOptions,
    target: ExportTarget<'_>,
    events: Option<Sender<BatchEvent>>,
) -> BatchReport {
    let total = sources.len();
    let emit = |event: BatchEvent| {
        if let Some(tx) = &events {
            tx.send(event).ok();
        }
    };
    emit(BatchEvent::Started {
        operation: operation.name(),
        total,
    });

    // Holding the sender inside the lock keeps event order equal to count order.
    let progress = Mutex::new((0usize, events.clone()));

    let outcomes: Vec<BatchOutcome> = sources
        .par_iter()
        .map(|source| {
            if options.cancelled() {
                return BatchOutcome::Cancelled {
                    source: source.name.clone(),
                };
            }

            let result = process_item(backend, exporter, source, operation, options, target);
            let status = match &result {
                Ok(artifact) => ItemStatus::Saved {
                    file_name: artifact.file_name.clone(),
                    byte_size: artifact.bytes.len(),
                },
                Err(e) => ItemStatus::Failed(e.to_string()),
            };

            if let Ok(mut guard) = progress.lock() {
                guard.0 += 1;
                let processed = guard.0;
                if let Some(tx) = &guard.1 {
                    tx.send(BatchEvent::ItemFinished {
                        processed,
                        total,
                        source: source.name.clone(),
                        status,
                    })
                    .ok();
                }
            }

            match result {
                Ok(artifact) => BatchOutcome::Saved {
                    source: source.name.clone(),
                    artifact,
                },
                Err(error) => BatchOutcome::Failed {
                    source: source.name.clone(),
                    error,
                },
            }
        })
        .collect();

    let processed = progress.lock().map(|guard| guard.0).unwrap_or(0);
    if processed < total {
        emit(BatchEvent::Cancelled {
            remaining: total - processed,
        });
    }

    BatchReport {
        outcomes,
        processed,
        total,
    }
}

fn process_item(
    backend: &impl ImageBackend,
    exporter: &Exporter,
    source: &SourceFile,
    operation: &Operation,
    options: &BatchOptions,
    target: ExportTarget<'_>,
) -> Result<Artifact, ImagingError> {
    let decoded = backend.decode(&source.name, &source.bytes)?;
    let buffer = operation.transform(&Arc::new(decoded.buffer))?;
    let (format, quality) = operation.encoding(decoded.mime_type, options.default_quality);
    let artifact = exporter.artifact(
        backend,
        &buffer,
        format,
        quality,
        operation.prefix(),
        &source.name,
    )?;
    deliver(artifact, target)
}
