//! Cursor and selection handling.

use crate::buffer::TextBuffer;

/// A position in the buffer as (line, column).
/// Both are 0-indexed; the column counts characters.
///
/// Ordering is lexicographic: line first, then column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CursorPosition {
    pub line: usize,
    pub column: usize,
}

impl CursorPosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A text selection between an anchor and the active (caret) end.
///
/// Selecting backward is allowed: `active` may be before `anchor`.
/// The pair is never reordered in place, only when read through [`Selection::range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Where the selection started.
    pub anchor: CursorPosition,
    /// Where the caret is.
    pub active: CursorPosition,
}

impl Selection {
    /// Creates a selection from anchor to active.
    pub fn new(anchor: CursorPosition, active: CursorPosition) -> Self {
        Self { anchor, active }
    }

    /// Returns true if anchor and active coincide.
    pub fn is_empty(&self) -> bool {
        self.anchor == self.active
    }

    /// Returns the start and end of the selection (ordered).
    pub fn range(&self) -> (CursorPosition, CursorPosition) {
        (self.anchor.min(self.active), self.anchor.max(self.active))
    }
}

/// Caret plus optional selection, moved relative to a [`TextBuffer`].
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    position: CursorPosition,
    selection: Option<Selection>,
    /// Preferred column for vertical movement.
    /// This preserves the column when moving through lines of varying length.
    preferred_column: Option<usize>,
}

impl Cursor {
    /// Creates a cursor at the start of the buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the caret position.
    pub fn position(&self) -> CursorPosition {
        self.position
    }

    /// Returns the active selection, if any and non-empty.
    pub fn selection(&self) -> Option<Selection> {
        self.selection.filter(|s| !s.is_empty())
    }

    /// Returns true if there's a non-empty selection.
    pub fn has_selection(&self) -> bool {
        self.selection().is_some()
    }

    /// Returns the ordered selected range if any.
    pub fn selected_range(&self) -> Option<(CursorPosition, CursorPosition)> {
        self.selection().map(|s| s.range())
    }

    /// Drops the selection without moving the caret.
    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Selects from `anchor` to `active` and puts the caret at `active`.
    pub fn select(&mut self, anchor: CursorPosition, active: CursorPosition) {
        self.selection = Some(Selection::new(anchor, active));
        self.position = active;
        self.preferred_column = None;
    }

    /// Moves the caret. With `extend` the selection grows from the old caret
    /// (or its existing anchor); without it any selection is cleared.
    pub fn set_position(&mut self, pos: CursorPosition, extend: bool) {
        self.move_to(pos, extend);
        self.preferred_column = None;
    }

    fn move_to(&mut self, pos: CursorPosition, extend: bool) {
        if extend {
            let anchor = self.selection.map(|s| s.anchor).unwrap_or(self.position);
            self.selection = Some(Selection::new(anchor, pos));
        } else {
            self.selection = None;
        }
        self.position = pos;
    }

    /// Clamps the caret and selection into the buffer's bounds.
    pub fn clamp(&mut self, buffer: &TextBuffer) {
        self.position = buffer.clamp(self.position);
        if let Some(sel) = &mut self.selection {
            sel.anchor = buffer.clamp(sel.anchor);
            sel.active = buffer.clamp(sel.active);
        }
    }

    /// Moves left by one character, wrapping to the end of the previous line.
    pub fn move_left(&mut self, buffer: &TextBuffer, extend: bool) {
        let pos = buffer.clamp(self.position);
        let target = if pos.column > 0 {
            CursorPosition::new(pos.line, pos.column - 1)
        } else if pos.line > 0 {
            CursorPosition::new(pos.line - 1, buffer.line_len(pos.line - 1))
        } else {
            pos
        };
        self.set_position(target, extend);
    }

    /// Moves right by one character, wrapping to the start of the next line.
    pub fn move_right(&mut self, buffer: &TextBuffer, extend: bool) {
        let pos = buffer.clamp(self.position);
        let target = if pos.column < buffer.line_len(pos.line) {
            CursorPosition::new(pos.line, pos.column + 1)
        } else if pos.line + 1 < buffer.line_count() {
            CursorPosition::new(pos.line + 1, 0)
        } else {
            pos
        };
        self.set_position(target, extend);
    }

    /// Moves up by one line.
    pub fn move_up(&mut self, buffer: &TextBuffer, extend: bool) {
        let pos = buffer.clamp(self.position);
        let preferred = *self.preferred_column.get_or_insert(pos.column);
        if pos.line > 0 {
            let line = pos.line - 1;
            self.move_to(CursorPosition::new(line, preferred.min(buffer.line_len(line))), extend);
        }
    }

    /// Moves down by one line.
    pub fn move_down(&mut self, buffer: &TextBuffer, extend: bool) {
        let pos = buffer.clamp(self.position);
        let preferred = *self.preferred_column.get_or_insert(pos.column);
        if pos.line + 1 < buffer.line_count() {
            let line = pos.line + 1;
            self.move_to(CursorPosition::new(line, preferred.min(buffer.line_len(line))), extend);
        }
    }

    /// Moves to the start of the current line.
    pub fn move_to_line_start(&mut self, buffer: &TextBuffer, extend: bool) {
        let pos = buffer.clamp(self.position);
        self.set_position(CursorPosition::new(pos.line, 0), extend);
    }

    /// Moves to the end of the current line.
    pub fn move_to_line_end(&mut self, buffer: &TextBuffer, extend: bool) {
        let pos = buffer.clamp(self.position);
        self.set_position(CursorPosition::new(pos.line, buffer.line_len(pos.line)), extend);
    }

    /// Moves to the start of the buffer.
    pub fn move_to_start(&mut self, extend: bool) {
        self.set_position(CursorPosition::default(), extend);
    }

    /// Moves to the end of the buffer.
    pub fn move_to_end(&mut self, buffer: &TextBuffer, extend: bool) {
        self.set_position(buffer.end_position(), extend);
    }

    /// Selects the whole buffer.
    pub fn select_all(&mut self, buffer: &TextBuffer) {
        self.select(CursorPosition::default(), buffer.end_position());
    }

    /// Selects the word under the caret. Word characters are alphanumerics,
    /// `_` and `-`. Returns false if the caret is not on a word.
    pub fn select_word(&mut self, buffer: &TextBuffer) -> bool {
        let pos = buffer.clamp(self.position);
        let chars: Vec<char> = buffer.line(pos.line).unwrap_or_default().chars().collect();
        let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '-';

        let mut start = pos.column;
        while start > 0 && is_word(chars[start - 1]) {
            start -= 1;
        }
        let mut end = pos.column;
        while end < chars.len() && is_word(chars[end]) {
            end += 1;
        }

        if start == end {
            return false;
        }
        self.select(CursorPosition::new(pos.line, start), CursorPosition::new(pos.line, end));
        true
    }

    /// Selects the caret's whole line, not including the line break.
    pub fn select_line(&mut self, buffer: &TextBuffer) {
        let line = buffer.clamp(self.position).line;
        self.select(
            CursorPosition::new(line, 0),
            CursorPosition::new(line, buffer.line_len(line)),
        );
    }
}
