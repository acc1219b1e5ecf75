//! Queue store
//!
//! Ordered list of track entries plus the cursor to the active entry.
//! Has no locking of its own: the engine is the single writer and holds its
//! state lock around every mutation.
//!
//! Invariant: `current` is `None` or a valid index into `entries`.

use jukebox_common::events::{wire_index, QueueEntry};
use uuid::Uuid;

/// Result of a successful removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Index the entry occupied before removal
    pub index: usize,
    /// The removed entry was the active one; the cursor has been cleared
    pub was_current: bool,
    pub entry: QueueEntry,
}

/// Ordered queue with a cursor
#[derive(Debug, Clone, Default)]
pub struct PlaybackQueue {
    entries: Vec<QueueEntry>,
    current: Option<usize>,
}

impl PlaybackQueue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, returning its position
    pub fn enqueue(&mut self, entry: QueueEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Remove an entry by id and shift the cursor
    ///
    /// Entries after the removed index move down by one. A cursor after the
    /// removed index is decremented; a cursor on it is cleared and reported
    /// through [`Removal::was_current`].
    pub fn remove_by_id(&mut self, id: Uuid) -> Option<Removal> {
        let index = self.position_of(id)?;
        let entry = self.entries.remove(index);

        let was_current = self.current == Some(index);
        self.current = match self.current {
            Some(current) if current == index => None,
            Some(current) if current > index => Some(current - 1),
            other => other,
        };

        Some(Removal {
            index,
            was_current,
            entry,
        })
    }

    /// Drop every entry and the cursor
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = None;
    }

    pub fn get(&self, index: usize) -> Option<&QueueEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn position_of(&self, id: Uuid) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Cursor in wire form (-1 when nothing is selected)
    pub fn wire_index(&self) -> i64 {
        wire_index(self.current)
    }

    pub fn current(&self) -> Option<&QueueEntry> {
        self.current.and_then(|i| self.entries.get(i))
    }

    /// Point the cursor at `index`; returns false (cursor unchanged) when out of range
    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.entries.len() {
            self.current = Some(index);
            true
        } else {
            false
        }
    }

    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// Index after the cursor, or the first entry when nothing is selected
    pub fn next_index(&self) -> Option<usize> {
        let next = self.current.map_or(0, |i| i + 1);
        (next < self.entries.len()).then_some(next)
    }

    /// Index before the cursor
    pub fn previous_index(&self) -> Option<usize> {
        self.current.and_then(|i| i.checked_sub(1))
    }
}
