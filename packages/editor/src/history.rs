//! # Undo/Redo History
//!
//! Linear snapshot history for the element tree.
//!
//! ## Design
//!
//! - Every committed mutation records the full tree *after* it was applied
//! - Undo/redo only move a cursor; snapshots are never replayed or inverted
//! - Recording after an undo discards everything past the cursor
//! - Snapshots share untouched subtrees with each other, so keeping many is cheap
//!
//! ## Example
//!
//! ```rust
//! use trellis_editor::{History, Node, Tree};
//!
//! let mut history = History::new();
//! let tree = Tree::new().insert(Node::new("a", "text"), None, None).unwrap();
//! history.record(tree, Some("Add text".to_string()));
//!
//! assert!(history.undo().unwrap().is_empty());
//! assert_eq!(history.redo().unwrap().len(), 1);
//! ```

use crate::errors::{EditorError, EditorResult, HistoryDirection};
use crate::tree::Tree;

/// One immutable snapshot, taken after a commit
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub tree: Tree,

    /// What produced this snapshot, e.g. "Move element"
    pub label: Option<String>,
}

/// Snapshot history with a cursor
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<HistoryEntry>,

    /// Position of the snapshot currently shown
    index: usize,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl History {
    /// Start from an empty tree with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self::starting_at(Tree::new(), max_levels)
    }

    /// Start from an existing tree; it becomes the first, un-undoable snapshot
    pub fn starting_at(tree: Tree, max_levels: usize) -> Self {
        Self {
            entries: vec![HistoryEntry { tree, label: None }],
            index: 0,
            max_levels,
        }
    }

    /// Record the tree produced by a commit
    pub fn record(&mut self, tree: Tree, label: Option<String>) {
        self.entries.truncate(self.index + 1);
        self.entries.push(HistoryEntry { tree, label });

        if self.max_levels > 0 && self.entries.len() > self.max_levels + 1 {
            let excess = self.entries.len() - self.max_levels - 1;
            self.entries.drain(..excess);
        }

        self.index = self.entries.len() - 1;
    }

    /// Step back one snapshot
    pub fn undo(&mut self) -> EditorResult<&Tree> {
        if self.index == 0 {
            return Err(EditorError::AtBoundary(HistoryDirection::Undo));
        }
        self.index -= 1;
        Ok(self.current())
    }

    /// Step forward one snapshot
    pub fn redo(&mut self) -> EditorResult<&Tree> {
        if self.index + 1 >= self.entries.len() {
            return Err(EditorError::AtBoundary(HistoryDirection::Redo));
        }
        self.index += 1;
        Ok(self.current())
    }

    /// Snapshot at the cursor
    pub fn current(&self) -> &Tree {
        &self.entries[self.index].tree
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn undo_levels(&self) -> usize {
        self.index
    }

    pub fn redo_levels(&self) -> usize {
        self.entries.len() - self.index - 1
    }

    /// Label of the commit an undo would revert
    pub fn undo_label(&self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        self.entries[self.index].label.as_deref()
    }

    /// Label of the commit a redo would reapply
    pub fn redo_label(&self) -> Option<&str> {
        self.entries
            .get(self.index + 1)
            .and_then(|entry| entry.label.as_deref())
    }

    /// Drop all history and start over from `tree`
    pub fn reset(&mut self, tree: Tree) {
        self.entries = vec![HistoryEntry { tree, label: None }];
        self.index = 0;
    }

    /// Number of snapshots held, including the initial one
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
