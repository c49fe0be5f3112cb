//! Editing session: cursor, selection, undo points and typing coalescing.
//!
//! The session owns the [`TextBuffer`] and applies every user-level edit to
//! it. Each mutation is recorded as a [`BufferChange`] that the owner drains
//! with [`EditSession::take_changes`] to keep its line caches aligned.

use crate::buffer::{BufferChange, TextBuffer};
use crate::config::EditorConfig;
use crate::cursor::{Cursor, CursorPosition};
use crate::history::{Snapshot, UndoHistory};
use std::time::{Duration, Instant};

/// Which kind of coalesced edit run is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Consecutive character insertions share one undo entry.
    Typing,
    /// Consecutive backspace/delete presses share one undo entry.
    Deleting,
}

/// Owns the buffer and everything needed to edit it interactively.
#[derive(Debug)]
pub struct EditSession {
    /// The text being edited.
    buffer: TextBuffer,
    /// Caret and selection.
    cursor: Cursor,
    /// Undo/redo snapshots.
    history: UndoHistory,
    /// Current coalescing run.
    state: SessionState,
    /// Time of the last coalesced edit.
    last_edit: Option<Instant>,
    /// Inactivity window after which a new undo entry is opened.
    typing_debounce: Duration,
    /// Spaces inserted by a tab.
    tab_width: usize,
    /// Changes not yet picked up by the owner.
    changes: Vec<BufferChange>,
    /// Whether the view should scroll to the caret.
    scroll_to_cursor: bool,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new("")
    }
}

impl EditSession {
    /// Creates a session over `text` with default settings.
    pub fn new(text: &str) -> Self {
        Self::with_config(text, &EditorConfig::default())
    }

    /// Creates a session over `text`.
    pub fn with_config(text: &str, config: &EditorConfig) -> Self {
        Self {
            buffer: TextBuffer::from_text(text),
            cursor: Cursor::new(),
            history: UndoHistory::new(config.max_undo),
            state: SessionState::Idle,
            last_edit: None,
            typing_debounce: config.typing_debounce,
            tab_width: config.tab_width,
            changes: Vec::new(),
            scroll_to_cursor: false,
        }
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    /// Mutable buffer access for draining queued parser edits.
    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Returns the caret position.
    pub fn cursor_position(&self) -> CursorPosition {
        self.cursor.position()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// Sets the typing/deleting coalescing window.
    pub fn set_typing_debounce(&mut self, window: Duration) {
        self.typing_debounce = window;
    }

    /// Drains the changes recorded since the last call.
    pub fn take_changes(&mut self) -> Vec<BufferChange> {
        std::mem::take(&mut self.changes)
    }

    /// Returns and clears the scroll-to-cursor request.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_cursor)
    }

    // ==================== Undo Points ====================

    /// Records the current content and caret as an undo point.
    pub fn save_undo(&mut self) {
        let snapshot = Snapshot::new(self.buffer.content(), self.cursor.position());
        self.history.save(snapshot);
        log::trace!("undo point saved ({} levels)", self.history.undo_len());
    }

    /// Opens (or continues) a coalesced run of `kind`. A new undo point is
    /// saved when switching kinds or after the debounce window has elapsed.
    fn begin_run(&mut self, kind: SessionState) {
        let now = Instant::now();
        let expired = self
            .last_edit
            .map_or(true, |last| now.duration_since(last) > self.typing_debounce);
        if self.state != kind || expired {
            self.save_undo();
            self.state = kind;
        }
        self.last_edit = Some(now);
    }

    /// Closes any coalesced run; the next character edit opens a new entry.
    pub fn end_run(&mut self) {
        self.state = SessionState::Idle;
    }

    fn record(&mut self, change: BufferChange, cursor: CursorPosition) {
        self.changes.push(change);
        self.cursor.set_position(cursor, false);
    }

    /// Deletes the selection without saving an undo point.
    fn remove_selection(&mut self) -> bool {
        let Some((start, end)) = self.cursor.selected_range() else {
            return false;
        };
        let (change, cursor) = self.buffer.delete_range(start, end);
        self.record(change, cursor);
        true
    }

    // ==================== Text Editing ====================

    /// Inserts a character at the caret, replacing any selection.
    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' {
            self.insert_newline();
            return;
        }
        if self.delete_selection() {
            self.end_run();
        }
        self.begin_run(SessionState::Typing);

        let pos = self.buffer.clamp(self.cursor.position());
        let (change, cursor) = self.buffer.insert_char(pos, ch);
        self.record(change, cursor);
    }

    /// Inserts `tab_width` spaces as part of the typing run.
    pub fn insert_tab(&mut self) {
        if self.delete_selection() {
            self.end_run();
        }
        self.begin_run(SessionState::Typing);

        let pos = self.buffer.clamp(self.cursor.position());
        let (change, cursor) = self.buffer.insert_text(pos, &" ".repeat(self.tab_width));
        self.record(change, cursor);
    }

    /// Backspace: deletes the selection, or the character before the caret.
    pub fn delete_char_before_cursor(&mut self) {
        if self.delete_selection() {
            self.end_run();
            return;
        }
        let pos = self.buffer.clamp(self.cursor.position());
        if pos == CursorPosition::default() {
            return;
        }
        self.begin_run(SessionState::Deleting);
        if let Some((change, cursor)) = self.buffer.delete_char_before(pos) {
            self.record(change, cursor);
        }
    }

    /// Delete: deletes the selection, or the character under the caret.
    pub fn delete_char_forward(&mut self) {
        if self.delete_selection() {
            self.end_run();
            return;
        }
        let pos = self.buffer.clamp(self.cursor.position());
        if pos == self.buffer.end_position() {
            return;
        }
        self.begin_run(SessionState::Deleting);
        if let Some((change, cursor)) = self.buffer.delete_char_after(pos) {
            self.record(change, cursor);
        }
    }

    /// Splits the line at the caret. Always opens its own undo entry.
    pub fn insert_newline(&mut self) {
        self.save_undo();
        self.end_run();
        self.remove_selection();

        let pos = self.buffer.clamp(self.cursor.position());
        let (change, cursor) = self.buffer.insert_newline(pos);
        self.record(change, cursor);
        self.scroll_to_cursor = true;
    }

    /// Inserts text at the caret as one undo entry, replacing any selection.
    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() && !self.cursor.has_selection() {
            return;
        }
        self.save_undo();
        self.end_run();
        self.remove_selection();

        let pos = self.buffer.clamp(self.cursor.position());
        let (change, cursor) = self.buffer.insert_text(pos, text);
        self.record(change, cursor);
    }

    /// Pastes text at the caret and scrolls to the end of it.
    pub fn paste_text(&mut self, text: &str) {
        log::debug!("paste {} bytes at {:?}", text.len(), self.cursor.position());
        self.insert_text(text);
        self.scroll_to_cursor = true;
    }

    /// Deletes the selected text. Returns false if nothing was selected.
    pub fn delete_selection(&mut self) -> bool {
        if !self.cursor.has_selection() {
            return false;
        }
        self.save_undo();
        self.remove_selection()
    }

    /// Replaces the whole content, keeping the caret clamped. Not an undo
    /// point by itself; see [`EditSession::replace_content`].
    pub fn set_content(&mut self, text: &str) {
        let change = self.buffer.set_content(text);
        log::debug!(
            "set_content: lines {:?} changed (v{})",
            change.changed,
            change.version
        );
        self.changes.push(change);
        self.end_run();
        self.cursor.clamp(&self.buffer);
    }

    /// Replaces the whole content as one undoable edit.
    pub fn replace_content(&mut self, text: &str) {
        self.save_undo();
        self.set_content(text);
    }

    /// Restores the previous undo point. Returns false if there is none.
    pub fn undo(&mut self) -> bool {
        let current = Snapshot::new(self.buffer.content(), self.cursor.position());
        let Some(state) = self.history.undo(current) else {
            return false;
        };
        log::debug!("undo ({} levels left)", self.history.undo_len());
        self.restore(state);
        true
    }

    /// Re-applies the last undone state. Returns false if there is none.
    pub fn redo(&mut self) -> bool {
        let current = Snapshot::new(self.buffer.content(), self.cursor.position());
        let Some(state) = self.history.redo(current) else {
            return false;
        };
        log::debug!("redo ({} levels left)", self.history.redo_len());
        self.restore(state);
        true
    }

    fn restore(&mut self, state: Snapshot) {
        self.set_content(&state.content);
        let pos = self.buffer.clamp(state.cursor);
        self.cursor.set_position(pos, false);
        self.scroll_to_cursor = true;
    }

    // ==================== Cursor and Selection ====================

    /// Moves the caret to a 1-based line and column, clamped to the buffer.
    pub fn move_cursor_to(&mut self, line: usize, column: usize) {
        let target = CursorPosition::new(line.saturating_sub(1), column.saturating_sub(1));
        let pos = self.buffer.clamp(target);
        self.cursor.set_position(pos, false);
        self.end_run();
        self.scroll_to_cursor = true;
    }

    /// Moves the caret to a 0-based position, optionally extending the selection.
    pub fn set_cursor(&mut self, pos: CursorPosition, extend: bool) {
        let pos = self.buffer.clamp(pos);
        self.cursor.set_position(pos, extend);
        self.end_run();
    }

    pub fn move_left(&mut self, extend: bool) {
        self.cursor.move_left(&self.buffer, extend);
        self.end_run();
    }

    pub fn move_right(&mut self, extend: bool) {
        self.cursor.move_right(&self.buffer, extend);
        self.end_run();
    }

    pub fn move_up(&mut self, extend: bool) {
        self.cursor.move_up(&self.buffer, extend);
        self.end_run();
    }

    pub fn move_down(&mut self, extend: bool) {
        self.cursor.move_down(&self.buffer, extend);
        self.end_run();
    }

    pub fn move_to_line_start(&mut self, extend: bool) {
        self.cursor.move_to_line_start(&self.buffer, extend);
        self.end_run();
    }

    pub fn move_to_line_end(&mut self, extend: bool) {
        self.cursor.move_to_line_end(&self.buffer, extend);
        self.end_run();
    }

    pub fn move_to_start(&mut self, extend: bool) {
        self.cursor.move_to_start(extend);
        self.end_run();
    }

    pub fn move_to_end(&mut self, extend: bool) {
        self.cursor.move_to_end(&self.buffer, extend);
        self.end_run();
    }

    /// Selects from `anchor` to `active` (0-based, clamped).
    pub fn select(&mut self, anchor: CursorPosition, active: CursorPosition) {
        let anchor = self.buffer.clamp(anchor);
        let active = self.buffer.clamp(active);
        self.cursor.select(anchor, active);
        self.end_run();
    }

    pub fn select_all(&mut self) {
        self.cursor.select_all(&self.buffer);
        self.end_run();
    }

    /// Selects the word under the caret. Returns false if there is none.
    pub fn select_word_at_cursor(&mut self) -> bool {
        self.end_run();
        self.cursor.select_word(&self.buffer)
    }

    pub fn select_line(&mut self) {
        self.cursor.select_line(&self.buffer);
        self.end_run();
    }

    pub fn has_selection(&self) -> bool {
        self.cursor.has_selection()
    }

    pub fn clear_selection(&mut self) {
        self.cursor.clear_selection();
    }

    /// Returns the selected text, or an empty string.
    pub fn get_selected_text(&self) -> String {
        match self.cursor.selected_range() {
            Some((start, end)) => self.buffer.text_range(start, end),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn pos(line: usize, column: usize) -> CursorPosition {
        CursorPosition::new(line, column)
    }

    fn lines(session: &EditSession) -> Vec<&str> {
        session.buffer().lines().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_insert_char_scenario() {
        let mut session = EditSession::new("int main()");
        session.set_cursor(pos(0, 3), false);
        session.insert_char('X');
        assert_eq!(lines(&session), vec!["intX main()"]);
        assert_eq!(session.cursor_position(), pos(0, 4));

        let changes = session.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].changed, 0..1);
    }

    #[test]
    fn test_multi_line_delete_scenario() {
        let mut session = EditSession::new("ab\ncd\nef");
        session.select(pos(0, 1), pos(2, 1));
        assert!(session.delete_selection());
        assert_eq!(lines(&session), vec!["af"]);
        assert_eq!(session.cursor_position(), pos(0, 1));
        assert!(!session.has_selection());
    }

    #[test]
    fn test_backward_selection_delete() {
        let mut session = EditSession::new("ab\ncd\nef");
        session.select(pos(2, 1), pos(0, 1));
        assert_eq!(session.get_selected_text(), "b\ncd\ne");
        session.delete_char_before_cursor();
        assert_eq!(lines(&session), vec!["af"]);
    }

    #[test]
    fn test_paste_scenario() {
        let mut session = EditSession::new("hello");
        session.set_cursor(pos(0, 5), false);
        session.paste_text(" world\nfoo");
        assert_eq!(lines(&session), vec!["hello world", "foo"]);
        assert_eq!(session.cursor_position(), pos(1, 3));
        assert!(session.take_scroll_request());
    }

    #[test]
    fn test_typing_coalesces_within_window() {
        let mut session = EditSession::new("");
        session.set_typing_debounce(Duration::from_millis(500));
        session.insert_char('a');
        session.insert_char('b');
        session.insert_char('c');
        assert_eq!(session.history().undo_len(), 1);

        assert!(session.undo());
        assert_eq!(session.buffer().content(), "");
    }

    #[test]
    fn test_typing_gap_opens_new_entry() {
        let mut session = EditSession::new("");
        session.set_typing_debounce(Duration::from_millis(100));
        session.insert_char('a');
        session.insert_char('b');
        thread::sleep(Duration::from_millis(250));
        session.insert_char('c');
        assert_eq!(session.history().undo_len(), 2);

        session.undo();
        assert_eq!(session.buffer().content(), "ab");
    }

    #[test]
    fn test_backspace_run_coalesces() {
        let mut session = EditSession::new("abcd");
        session.set_typing_debounce(Duration::from_millis(500));
        session.set_cursor(pos(0, 4), false);
        session.delete_char_before_cursor();
        session.delete_char_before_cursor();
        assert_eq!(session.buffer().content(), "ab");
        assert_eq!(session.history().undo_len(), 1);
        assert_eq!(session.state(), SessionState::Deleting);

        // switching to typing opens a new entry
        session.insert_char('x');
        assert_eq!(session.history().undo_len(), 2);
    }

    #[test]
    fn test_newline_always_saves_undo() {
        let mut session = EditSession::new("");
        session.set_typing_debounce(Duration::from_millis(500));
        session.insert_char('a');
        session.insert_newline();
        session.insert_char('b');
        assert_eq!(session.history().undo_len(), 3);
        assert_eq!(lines(&session), vec!["a", "b"]);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let original = "first\nsecond\nthird";
        let mut session = EditSession::new(original);

        session.set_cursor(pos(0, 5), false);
        session.insert_newline();
        session.paste_text("pasted\ntext");
        session.select(pos(2, 0), pos(3, 3));
        session.delete_selection();
        session.insert_text("tail");
        let final_content = session.buffer().content();
        assert_eq!(session.history().undo_len(), 4);

        for _ in 0..4 {
            assert!(session.undo());
        }
        assert_eq!(session.buffer().content(), original);
        assert!(!session.undo());

        for _ in 0..4 {
            assert!(session.redo());
        }
        assert_eq!(session.buffer().content(), final_content);
        assert!(!session.redo());
    }

    #[test]
    fn test_undo_restores_cursor_and_uses_minimal_change() {
        let mut session = EditSession::new("a\nb\nc\nd");
        session.set_cursor(pos(1, 1), false);
        session.insert_char('X');
        session.take_changes();

        session.undo();
        assert_eq!(session.cursor_position(), pos(1, 1));
        let changes = session.take_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].changed, 1..2);
    }

    #[test]
    fn test_new_edit_after_undo_clears_redo() {
        let mut session = EditSession::new("x");
        session.insert_text("a");
        session.undo();
        assert!(session.history().can_redo());
        session.insert_text("b");
        assert!(!session.history().can_redo());
    }

    #[test]
    fn test_typing_replaces_selection() {
        let mut session = EditSession::new("hello world");
        session.select(pos(0, 0), pos(0, 5));
        session.insert_char('J');
        assert_eq!(session.buffer().content(), "J world");
        assert_eq!(session.cursor_position(), pos(0, 1));
    }

    #[test]
    fn test_delete_forward_and_tab() {
        let mut session = EditSession::new("ab\ncd");
        session.set_cursor(pos(0, 2), false);
        session.delete_char_forward();
        assert_eq!(lines(&session), vec!["abcd"]);

        session.move_to_line_start(false);
        session.insert_tab();
        assert_eq!(lines(&session), vec!["    abcd"]);
        assert_eq!(session.cursor_position(), pos(0, 4));
    }

    #[test]
    fn test_move_cursor_to_is_one_based_and_clamped() {
        let mut session = EditSession::new("one\ntwo\nthree");
        session.move_cursor_to(2, 3);
        assert_eq!(session.cursor_position(), pos(1, 2));
        session.move_cursor_to(99, 99);
        assert_eq!(session.cursor_position(), pos(2, 5));
        session.move_cursor_to(0, 0);
        assert_eq!(session.cursor_position(), pos(0, 0));
    }

    #[test]
    fn test_set_content_clamps_cursor() {
        let mut session = EditSession::new("long line\nsecond");
        session.set_cursor(pos(1, 6), false);
        session.set_content("x");
        assert_eq!(session.cursor_position(), pos(0, 1));
        assert!(!session.history().can_undo());
    }
}
