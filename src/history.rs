//! Bounded linear edit history.
//!
//! Holds up to `capacity` records and a cursor pointing at the current one.
//! Invariant: the history is never empty and `cursor < len`. Pushing past
//! capacity evicts the oldest entry. Pushing after an undo drops everything
//! after the cursor, so history never branches.

use crate::types::ImageRecord;
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<ImageRecord>,
    cursor: usize,
    capacity: usize,
}

impl History {
    /// Start a history at `initial`. Capacity is at least 1.
    pub fn new(initial: ImageRecord, capacity: usize) -> Self {
        let mut entries = VecDeque::with_capacity(capacity.max(1));
        entries.push_back(initial);
        Self {
            entries,
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Drop everything and start again from `initial`.
    pub fn reset(&mut self, initial: ImageRecord) {
        self.entries.clear();
        self.entries.push_back(initial);
        self.cursor = 0;
    }

    /// Commit a record after the cursor and move the cursor onto it.
    pub fn push(&mut self, record: ImageRecord) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(record);
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back one entry. `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&ImageRecord> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward one entry. `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&ImageRecord> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn current(&self) -> &ImageRecord {
        &self.entries[self.cursor]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true: a history always holds at least one entry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }
}
