//! CLI output formatting.
//!
//! Every entity is shown by what it is first (name, dimensions, size) with
//! details as indented context lines below it.
//!
//! # Output Format
//!
//! ## Batch
//!
//! ```text
//! Batch compress (3 images)
//!     001/003 a.jpg → compressed_a.jpg (48.1 KB)
//!     002/003 b.txt failed
//!         Error: Failed to decode b.txt: unsupported format
//!     003/003 c.png → compressed_c.jpg (12.0 KB)
//! Saved 2, failed 1, cancelled 0
//! ```
//!
//! ## Edit session
//!
//! ```text
//! Loaded a.jpg (800×600, 52.3 KB)
//!     resize → 400×300 (history 2)
//!     Exported edited_a.webp (20.9 KB)
//! ```
//!
//! # Architecture
//!
//! Each event or result has a `format_*` function (returns `Vec<String>`)
//! for testability and, where the CLI prints it directly, a `print_*`
//! wrapper. Format functions are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchOutcome, BatchReport, ItemStatus};
use crate::recent::RecentFiles;
use crate::session::SessionEvent;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte size.
///
/// ```text
/// 512 B
/// 48.1 KB
/// 3.2 MB
/// ```
pub fn format_size(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

fn dimensions(width: u32, height: u32) -> String {
    format!("{}\u{d7}{}", width, height)
}

/// Recent files, newest first.
pub fn format_recent(recent: &RecentFiles) -> Vec<String> {
    if recent.is_empty() {
        return vec!["No recent files".to_string()];
    }
    let mut lines = vec!["Recent files".to_string()];
    for (i, entry) in recent.entries().iter().enumerate() {
        lines.push(format!(
            "{}{} {} ({}, {})",
            indent(1),
            format_index(i + 1),
            entry.name,
            dimensions(entry.width, entry.height),
            format_size(entry.byte_size)
        ));
    }
    lines
}

pub fn print_recent(recent: &RecentFiles) {
    for line in format_recent(recent) {
        println!("{}", line);
    }
}

// ============================================================================
// Session
// ============================================================================

/// Format a session event as display lines.
pub fn format_session_event(event: &SessionEvent) -> Vec<String> {
    match event {
        SessionEvent::Loaded {
            name,
            width,
            height,
            byte_size,
        } => vec![format!(
            "Loaded {} ({}, {})",
            name,
            dimensions(*width, *height),
            format_size(*byte_size)
        )],
        SessionEvent::Applied {
            operation,
            width,
            height,
            history_len,
        } => vec![format!(
            "{}{} \u{2192} {} (history {})",
            indent(1),
            operation,
            dimensions(*width, *height),
            history_len
        )],
        SessionEvent::Exported {
            file_name,
            byte_size,
        } => vec![format!(
            "{}Exported {} ({})",
            indent(1),
            file_name,
            format_size(*byte_size)
        )],
        SessionEvent::Undone { cursor } => vec![format!("{}undo (at {})", indent(1), cursor + 1)],
        SessionEvent::Redone { cursor } => vec![format!("{}redo (at {})", indent(1), cursor + 1)],
        SessionEvent::Reset => vec![format!("{}reset to original", indent(1))],
        SessionEvent::Cleared => vec!["Cleared".to_string()],
        SessionEvent::Failed { action, message } => vec![
            format!("{}{} failed", indent(1), action),
            format!("{}Error: {}", indent(2), message),
        ],
        SessionEvent::Warning(message) => vec![format!("Warning: {}", message)],
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { operation, total } => {
            let noun = if *total == 1 { "image" } else { "images" };
            vec![format!("Batch {} ({} {})", operation, total, noun)]
        }
        BatchEvent::ItemFinished {
            processed,
            total,
            source,
            status,
        } => {
            let position = format!("{}/{}", format_index(*processed), format_index(*total));
            match status {
                ItemStatus::Saved {
                    file_name,
                    byte_size,
                } => vec![format!(
                    "{}{} {} \u{2192} {} ({})",
                    indent(1),
                    position,
                    source,
                    file_name,
                    format_size(*byte_size)
                )],
                ItemStatus::Failed(message) => vec![
                    format!("{}{} {} failed", indent(1), position, source),
                    format!("{}Error: {}", indent(2), message),
                ],
            }
        }
        BatchEvent::Cancelled { remaining } => {
            vec![format!("Cancelled: {} not started", remaining)]
        }
    }
}

/// Totals line for a finished run.
pub fn format_batch_summary(report: &BatchReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Saved {}, failed {}, cancelled {}",
        report.saved(),
        report.failed(),
        report.cancelled()
    )];
    let failures: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|o| match o {
            BatchOutcome::Failed { source, error } => Some((source, error)),
            _ => None,
        })
        .collect();
    if !failures.is_empty() {
        lines.push("Failures".to_string());
        for (source, error) in failures {
            lines.push(format!("{}{}: {}", indent(1), source, error));
        }
    }
    lines
}

pub fn print_batch_summary(report: &BatchReport) {
    for line in format_batch_summary(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::Artifact;
    use crate::imaging::ImagingError;
    use crate::recent::tests::summary;

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024 + 200 * 1024), "3.2 MB");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    // =========================================================================
    // Session events
    // =========================================================================

    #[test]
    fn format_loaded() {
        let lines = format_session_event(&SessionEvent::Loaded {
            name: "a.jpg".into(),
            width: 800,
            height: 600,
            byte_size: 2048,
        });
        assert_eq!(lines, vec!["Loaded a.jpg (800\u{d7}600, 2.0 KB)"]);
    }

    #[test]
    fn format_applied() {
        let lines = format_session_event(&SessionEvent::Applied {
            operation: "resize",
            width: 400,
            height: 300,
            history_len: 2,
        });
        assert_eq!(lines, vec!["    resize \u{2192} 400\u{d7}300 (history 2)"]);
    }

    #[test]
    fn format_failed_has_error_context() {
        let lines = format_session_event(&SessionEvent::Failed {
            action: "crop",
            message: "Invalid geometry: empty".into(),
        });
        assert_eq!(lines[0], "    crop failed");
        assert_eq!(lines[1], "        Error: Invalid geometry: empty");
    }

    // =========================================================================
    // Batch events
    // =========================================================================

    #[test]
    fn format_batch_started() {
        let lines = format_batch_event(&BatchEvent::Started {
            operation: "compress",
            total: 3,
        });
        assert_eq!(lines, vec!["Batch compress (3 images)"]);
    }

    #[test]
    fn format_batch_saved_item() {
        let lines = format_batch_event(&BatchEvent::ItemFinished {
            processed: 1,
            total: 3,
            source: "a.jpg".into(),
            status: ItemStatus::Saved {
                file_name: "compressed_a.jpg".into(),
                byte_size: 100,
            },
        });
        assert_eq!(
            lines,
            vec!["    001/003 a.jpg \u{2192} compressed_a.jpg (100 B)"]
        );
    }

    #[test]
    fn format_batch_failed_item() {
        let lines = format_batch_event(&BatchEvent::ItemFinished {
            processed: 2,
            total: 3,
            source: "b.txt".into(),
            status: ItemStatus::Failed("nope".into()),
        });
        assert_eq!(lines[0], "    002/003 b.txt failed");
        assert_eq!(lines[1], "        Error: nope");
    }

    #[test]
    fn format_summary_lists_failures() {
        let report = BatchReport {
            outcomes: vec![
                BatchOutcome::Saved {
                    source: "a.jpg".into(),
                    artifact: Artifact {
                        bytes: vec![0; 4],
                        file_name: "compressed_a.jpg".into(),
                        mime_type: "image/jpeg",
                    },
                },
                BatchOutcome::Failed {
                    source: "b.txt".into(),
                    error: ImagingError::EncodeFailure("boom".into()),
                },
                BatchOutcome::Cancelled {
                    source: "c.jpg".into(),
                },
            ],
            processed: 2,
            total: 3,
        };
        let lines = format_batch_summary(&report);
        assert_eq!(lines[0], "Saved 1, failed 1, cancelled 1");
        assert_eq!(lines[1], "Failures");
        assert_eq!(lines[2], "    b.txt: Encode failed: boom");
    }

    // =========================================================================
    // Recent files
    // =========================================================================

    #[test]
    fn format_recent_lists_newest_first() {
        let mut recent = RecentFiles::default();
        recent.touch(summary("old.jpg"));
        recent.touch(summary("new.jpg"));
        let lines = format_recent(&recent);
        assert_eq!(lines[0], "Recent files");
        assert_eq!(lines[1], "    001 new.jpg (8\u{d7}6, 100 B)");
        assert_eq!(lines[2], "    002 old.jpg (8\u{d7}6, 100 B)");
    }

    #[test]
    fn format_recent_empty() {
        assert_eq!(
            format_recent(&RecentFiles::default()),
            vec!["No recent files"]
        );
    }
}
