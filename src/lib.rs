//! # image-desk
//!
//! A raster image editing pipeline: decode an image, run it through filters
//! and geometry tools with a bounded undo history, then export it as JPEG,
//! PNG, WebP, BMP or a one-page PDF. The same operations run in parallel
//! over many files in batch mode, and several images can be merged into one
//! canvas.
//!
//! # Architecture
//!
//! ```text
//!  bytes ──decode──▶ PixelBuffer ──Operation──▶ PixelBuffer ──encode──▶ Artifact
//!                         │                          │
//!                   ImageSession (history, zoom)  BatchRunner (rayon, progress)
//! ```
//!
//! Pixel work is pure and synchronous: every engine function takes a buffer
//! and returns a new one. Codecs sit behind the
//! [`ImageBackend`](imaging::ImageBackend) trait so tests can swap in a
//! recording mock.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Pixel buffers, filters, geometry, merge, text, codecs, PDF writer |
//! | [`session`] | Interactive editing state machine with undo/redo and zoom |
//! | [`batch`] | One operation over many sources, parallel, ordered outcomes |
//! | [`export`] | Encoding into named artifacts, preview or download delivery |
//! | [`history`] | Bounded linear undo history |
//! | [`recent`] | Most-recently-used file list and its JSON store |
//! | [`types`] | Image records and the merge set |
//! | [`naming`] | `<prefix>_<stem>.<ext>` artifact names |
//! | [`config`] | Layered `config.toml` loading and validation |
//! | [`output`] | CLI output formatting for session and batch events |
//! | [`steps`] | `--step NAME=ARGS` parsing for the `edit` and `batch` commands |
//!
//! # Design Decisions
//!
//! ## Immutable Records
//!
//! A transform never edits an [`ImageRecord`](types::ImageRecord); it
//! builds a new one. Pixels live behind `Arc`, so the undo history holds
//! shared snapshots instead of copies, and a failed operation cannot leave
//! a half-written image behind.
//!
//! ## Pure-Rust Codecs
//!
//! Decoding and encoding use the `image` crate only. The PDF writer is a
//! small built-in that embeds the JPEG encode as-is, so no system libraries
//! are needed for any output format.
//!
//! ## Events, Not Logging
//!
//! Long-running work reports progress as typed events over an `mpsc`
//! channel. The library never prints; the CLI renders events through the
//! pure `format_*` functions in [`output`].

pub mod batch;
pub mod config;
pub mod export;
pub mod history;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod recent;
pub mod session;
pub mod steps;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
