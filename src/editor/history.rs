//! Bounded undo/redo history of editor snapshots.

use chrono::{DateTime, Utc};

use crate::types::NodeMap;

/// An immutable capture of the editor's tree and selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub nodes: NodeMap,
    pub roots: Vec<String>,
    pub selected: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

impl Snapshot {
    #[must_use]
    pub fn new(
        nodes: NodeMap,
        roots: Vec<String>,
        selected: Option<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            nodes,
            roots,
            selected,
            timestamp: Utc::now(),
            description: description.into(),
        }
    }
}

/// Linear history with a cursor. Recording after an undo discards the redo
/// branch; once `capacity` entries exist the oldest is dropped.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Snapshot>,
    cursor: usize,
    capacity: usize,
}

impl History {
    /// Start a history whose only entry is `initial`. A capacity of zero is
    /// treated as one.
    #[must_use]
    pub fn new(capacity: usize, initial: Snapshot) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, snapshot: Snapshot) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(snapshot);
        if self.entries.len() > self.capacity {
            let excess = self.entries.len() - self.capacity;
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back and return the snapshot that is now current.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward and return the snapshot that is now current.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    #[must_use]
    pub fn current(&self) -> Option<&Snapshot> {
        self.entries.get(self.cursor)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
