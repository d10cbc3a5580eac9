//! Most-recently-used file list.
//!
//! The session records every successful load and save here. The list is
//! bounded, newest first, and deduplicated by name: touching a name that is
//! already present moves it to the front with the new metadata.
//!
//! ## Storage
//!
//! Persistence goes through the [`RecentStore`] trait. [`JsonFileStore`]
//! writes a small versioned JSON document:
//!
//! ```json
//! { "version": 1, "entries": [ { "name": "a.jpg", "byte_size": 52311, ... } ] }
//! ```
//!
//! A missing, corrupt or outdated file loads as an empty list. Durability is
//! best effort.

use crate::types::RecordSummary;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;

pub const DEFAULT_CAPACITY: usize = 5;

/// Version of the store format. Bump to discard old files.
const STORE_VERSION: u32 = 1;

/// Bounded MRU list of record summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentFiles {
    entries: Vec<RecordSummary>,
    capacity: usize,
}

impl Default for RecentFiles {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RecentFiles {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Restore from stored entries, keeping the first occurrence of each
    /// name and at most `capacity` entries.
    pub fn from_entries(entries: Vec<RecordSummary>, capacity: usize) -> Self {
        let mut list = Self::new(capacity);
        for entry in entries.into_iter().rev() {
            list.touch(entry);
        }
        list
    }

    /// Move `entry` to the front, replacing any entry with the same name.
    pub fn touch(&mut self, entry: RecordSummary) {
        self.entries.retain(|e| e.name != entry.name);
        self.entries.insert(0, entry);
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> &[RecordSummary] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// External key-value persistence for the recent list.
pub trait RecentStore: Send {
    /// Stored entries, newest first. Never fails: unreadable means empty.
    fn load(&self) -> Vec<RecordSummary>;

    fn persist(&self, entries: &[RecordSummary]) -> io::Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredList {
    version: u32,
    entries: Vec<RecordSummary>,
}

/// Stores the list as JSON in one file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecentStore for JsonFileStore {
    fn load(&self) -> Vec<RecordSummary> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str::<StoredList>(&content) {
            Ok(list) if list.version == STORE_VERSION => list.entries,
            _ => Vec::new(),
        }
    }

    fn persist(&self, entries: &[RecordSummary]) -> io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&StoredList {
            version: STORE_VERSION,
            entries: entries.to_vec(),
        })?;
        std::fs::write(&self.path, json)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// In-memory store. Clones share the same list so tests can inspect what
    /// a session persisted.
    #[derive(Clone, Default)]
    pub struct MemoryStore {
        pub saved: Arc<Mutex<Vec<RecordSummary>>>,
    }

    impl RecentStore for MemoryStore {
        fn load(&self) -> Vec<RecordSummary> {
            self.saved.lock().unwrap().clone()
        }

        fn persist(&self, entries: &[RecordSummary]) -> io::Result<()> {
            *self.saved.lock().unwrap() = entries.to_vec();
            Ok(())
        }
    }

    pub fn summary(name: &str) -> RecordSummary {
        RecordSummary {
            name: name.to_string(),
            byte_size: 100,
            mime_type: "image/jpeg".to_string(),
            width: 8,
            height: 6,
        }
    }

    fn names(list: &RecentFiles) -> Vec<&str> {
        list.entries().iter().map(|e| e.name.as_str()).collect()
    }

    // =========================================================================
    // RecentFiles
    // =========================================================================

    #[test]
    fn newest_first() {
        let mut list = RecentFiles::default();
        list.touch(summary("a"));
        list.touch(summary("b"));
        assert_eq!(names(&list), ["b", "a"]);
    }

    #[test]
    fn capped_at_five() {
        let mut list = RecentFiles::default();
        for name in ["a", "b", "c", "d", "e", "f", "g"] {
            list.touch(summary(name));
        }
        assert_eq!(names(&list), ["g", "f", "e", "d", "c"]);
    }

    #[test]
    fn deduplicated_by_name() {
        let mut list = RecentFiles::default();
        list.touch(summary("a"));
        list.touch(summary("b"));
        let mut newer = summary("a");
        newer.width = 99;
        list.touch(newer);

        assert_eq!(names(&list), ["a", "b"]);
        assert_eq!(list.entries()[0].width, 99);
    }

    #[test]
    fn from_entries_keeps_order_and_bound() {
        let stored: Vec<_> = ["x", "y", "x", "z", "w", "v", "u"]
            .iter()
            .map(|n| summary(n))
            .collect();
        let list = RecentFiles::from_entries(stored, 5);
        assert_eq!(names(&list), ["x", "y", "z", "w", "v"]);
    }

    // =========================================================================
    // JsonFileStore
    // =========================================================================

    #[test]
    fn json_store_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().join("state/recent.json"));
        let entries = vec![summary("a.jpg"), summary("b.png")];

        store.persist(&entries).unwrap();
        assert_eq!(store.load(), entries);
    }

    #[test]
    fn json_store_missing_file_is_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path().join("nope.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn json_store_corrupt_file_is_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("recent.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(JsonFileStore::new(&path).load().is_empty());
    }

    #[test]
    fn json_store_version_mismatch_is_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("recent.json");
        std::fs::write(&path, r#"{"version": 0, "entries": []}"#).unwrap();
        assert!(JsonFileStore::new(&path).load().is_empty());
    }
}
