//! Snapshot-based undo/redo history.

use crate::cursor::CursorPosition;
use std::collections::VecDeque;

/// Default number of undo levels kept.
pub const DEFAULT_MAX_UNDO: usize = 256;

/// A saved buffer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub content: String,
    pub cursor: CursorPosition,
}

impl Snapshot {
    pub fn new(content: String, cursor: CursorPosition) -> Self {
        Self { content, cursor }
    }
}

/// Bounded undo and redo stacks of whole-content snapshots.
#[derive(Debug)]
pub struct UndoHistory {
    /// States that can be restored by undo, oldest first.
    undo_stack: VecDeque<Snapshot>,
    /// States that can be restored by redo.
    redo_stack: VecDeque<Snapshot>,
    /// Maximum number of entries per stack.
    max_size: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO)
    }
}

impl UndoHistory {
    /// Creates a new history with the given maximum size.
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_size: max_size.max(1),
        }
    }

    /// Records a new undo point. Clears the redo stack and evicts the oldest
    /// entry on overflow.
    pub fn save(&mut self, snapshot: Snapshot) {
        push_bounded(&mut self.undo_stack, snapshot, self.max_size);
        self.redo_stack.clear();
    }

    /// Pops the most recent undo point, stashing `current` for redo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.undo_stack.pop_back()?;
        push_bounded(&mut self.redo_stack, current, self.max_size);
        Some(restored)
    }

    /// Pops the most recent redo point, stashing `current` for undo.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let restored = self.redo_stack.pop_back()?;
        push_bounded(&mut self.undo_stack, current, self.max_size);
        Some(restored)
    }

    /// Returns true if undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clears all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

fn push_bounded(stack: &mut VecDeque<Snapshot>, snapshot: Snapshot, max_size: usize) {
    stack.push_back(snapshot);
    while stack.len() > max_size {
        stack.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(text: &str) -> Snapshot {
        Snapshot::new(text.to_string(), CursorPosition::default())
    }

    #[test]
    fn test_undo_redo() {
        let mut history = UndoHistory::new(10);
        history.save(snap("a"));
        history.save(snap("ab"));

        let restored = history.undo(snap("abc")).unwrap();
        assert_eq!(restored.content, "ab");
        assert!(history.can_redo());

        let redone = history.redo(snap("ab")).unwrap();
        assert_eq!(redone.content, "abc");
        assert_eq!(history.undo_len(), 2);
        assert_eq!(history.redo_len(), 0);
    }

    #[test]
    fn test_save_clears_redo() {
        let mut history = UndoHistory::new(10);
        history.save(snap("a"));
        history.undo(snap("b"));
        assert!(history.can_redo());

        history.save(snap("c"));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = UndoHistory::new(3);
        for text in ["1", "2", "3", "4", "5"] {
            history.save(snap(text));
        }
        assert_eq!(history.undo_len(), 3);

        let mut seen = Vec::new();
        while let Some(s) = history.undo(snap("now")) {
            seen.push(s.content);
        }
        assert_eq!(seen, vec!["5", "4", "3"]);
    }

    #[test]
    fn test_empty_history() {
        let mut history = UndoHistory::default();
        assert!(history.undo(snap("x")).is_none());
        assert!(history.redo(snap("x")).is_none());
        assert!(!history.can_redo());
    }
}
