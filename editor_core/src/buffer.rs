//! Line-oriented text buffer with change tracking.
//!
//! Every mutation bumps the content version, queues a [`ByteRangeEdit`] for
//! the incremental parser and reports which lines changed so the per-line
//! caches can be spliced instead of rebuilt.

use crate::cursor::CursorPosition;
use std::ops::Range;

/// Monotonic identifier of a buffer state.
pub type ContentVersion = u64;

/// A (row, byte column) point, as the incremental parser expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

/// One contiguous replacement, in byte and point space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRangeEdit {
    pub start_byte: usize,
    pub old_end_byte: usize,
    pub new_end_byte: usize,
    pub start_point: Point,
    pub old_end_point: Point,
    pub new_end_point: Point,
}

/// Old lines `start..start + removed` were replaced by new lines
/// `start..start + inserted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSplice {
    pub start: usize,
    pub removed: usize,
    pub inserted: usize,
}

/// What a single mutation did to the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferChange {
    /// Structural line replacement, used to keep per-line caches aligned.
    pub splice: LineSplice,
    /// Lines (new indices, half-open) whose cached tokens must be refreshed.
    pub changed: Range<usize>,
    /// Version of the buffer after the change.
    pub version: ContentVersion,
}

/// A text buffer stored as an ordered sequence of lines.
/// Never empty: an empty document is one empty line.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    lines: Vec<String>,
    version: ContentVersion,
    pending_edits: Vec<ByteRangeEdit>,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TextBuffer {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl TextBuffer {
    /// Creates a new buffer holding one empty line.
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            version: 0,
            pending_edits: Vec::new(),
        }
    }

    /// Creates a buffer from text. `\r\n` line endings are normalized.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: split_lines(text),
            version: 0,
            pending_edits: Vec::new(),
        }
    }

    /// Returns the number of lines (always at least one).
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the text of a line without its line break.
    pub fn line(&self, line: usize) -> Option<&str> {
        self.lines.get(line).map(String::as_str)
    }

    /// Returns all lines.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns the length of a line in characters, or 0 past the end.
    pub fn line_len(&self, line: usize) -> usize {
        self.lines.get(line).map_or(0, |l| l.chars().count())
    }

    /// Returns the whole text, lines joined with `\n`.
    pub fn content(&self) -> String {
        self.lines.join("\n")
    }

    /// Returns the current content version.
    pub fn version(&self) -> ContentVersion {
        self.version
    }

    /// Returns true if edits are waiting to be handed to the parser.
    pub fn has_pending_edits(&self) -> bool {
        !self.pending_edits.is_empty()
    }

    /// Drains the queued edits. Each edit is handed out exactly once.
    pub fn take_pending_edits(&mut self) -> Vec<ByteRangeEdit> {
        std::mem::take(&mut self.pending_edits)
    }

    /// Position just past the last character of the buffer.
    pub fn end_position(&self) -> CursorPosition {
        let line = self.lines.len() - 1;
        CursorPosition::new(line, self.line_len(line))
    }

    /// Clamps a position to valid line and column bounds.
    pub fn clamp(&self, pos: CursorPosition) -> CursorPosition {
        let line = pos.line.min(self.lines.len() - 1);
        CursorPosition::new(line, pos.column.min(self.line_len(line)))
    }

    /// Returns the text between two positions (in either order).
    pub fn text_range(&self, a: CursorPosition, b: CursorPosition) -> String {
        let (start, end) = self.ordered(a, b);
        if start.line == end.line {
            let line = &self.lines[start.line];
            return line[byte_index(line, start.column)..byte_index(line, end.column)].to_string();
        }

        let first = &self.lines[start.line];
        let last = &self.lines[end.line];
        let mut out = String::from(&first[byte_index(first, start.column)..]);
        for line in &self.lines[start.line + 1..end.line] {
            out.push('\n');
            out.push_str(line);
        }
        out.push('\n');
        out.push_str(&last[..byte_index(last, end.column)]);
        out
    }

    /// Byte offset of a position in [`TextBuffer::content`].
    pub fn byte_offset(&self, pos: CursorPosition) -> usize {
        let pos = self.clamp(pos);
        let before: usize = self.lines[..pos.line].iter().map(|l| l.len() + 1).sum();
        before + byte_index(&self.lines[pos.line], pos.column)
    }

    // ==================== Edit Primitives ====================

    /// Inserts a character at `pos`.
    pub fn insert_char(&mut self, pos: CursorPosition, ch: char) -> (BufferChange, CursorPosition) {
        let mut tmp = [0u8; 4];
        self.replace(pos, pos, ch.encode_utf8(&mut tmp))
    }

    /// Deletes the character before `pos`, joining with the previous line at
    /// column 0. Returns `None` at the start of the buffer.
    pub fn delete_char_before(&mut self, pos: CursorPosition) -> Option<(BufferChange, CursorPosition)> {
        let pos = self.clamp(pos);
        let start = if pos.column > 0 {
            CursorPosition::new(pos.line, pos.column - 1)
        } else if pos.line > 0 {
            CursorPosition::new(pos.line - 1, self.line_len(pos.line - 1))
        } else {
            return None;
        };
        Some(self.replace(start, pos, ""))
    }

    /// Deletes the character at `pos`, joining the next line at end of line.
    /// Returns `None` at the end of the buffer.
    pub fn delete_char_after(&mut self, pos: CursorPosition) -> Option<(BufferChange, CursorPosition)> {
        let pos = self.clamp(pos);
        let end = if pos.column < self.line_len(pos.line) {
            CursorPosition::new(pos.line, pos.column + 1)
        } else if pos.line + 1 < self.lines.len() {
            CursorPosition::new(pos.line + 1, 0)
        } else {
            return None;
        };
        Some(self.replace(pos, end, ""))
    }

    /// Splits the line at `pos`.
    pub fn insert_newline(&mut self, pos: CursorPosition) -> (BufferChange, CursorPosition) {
        self.replace(pos, pos, "\n")
    }

    /// Inserts possibly multi-line text at `pos`.
    pub fn insert_text(&mut self, pos: CursorPosition, text: &str) -> (BufferChange, CursorPosition) {
        let text = normalize_newlines(text);
        self.replace(pos, pos, &text)
    }

    /// Deletes the text between two positions. Deleting across lines merges
    /// the head of the first line with the tail of the last.
    pub fn delete_range(&mut self, a: CursorPosition, b: CursorPosition) -> (BufferChange, CursorPosition) {
        self.replace(a, b, "")
    }

    /// Replaces the text between two positions with `text` (which must use
    /// `\n` line breaks). Returns the change and the position after the
    /// inserted text.
    pub fn replace(
        &mut self,
        a: CursorPosition,
        b: CursorPosition,
        text: &str,
    ) -> (BufferChange, CursorPosition) {
        let (start, end) = self.ordered(a, b);

        let start_byte = self.byte_offset(start);
        let old_end_byte = self.byte_offset(end);
        let start_col_byte = byte_index(&self.lines[start.line], start.column);
        let end_col_byte = byte_index(&self.lines[end.line], end.column);

        let head = self.lines[start.line][..start_col_byte].to_string();
        let tail = self.lines[end.line][end_col_byte..].to_string();

        let mut pieces: Vec<String> = text.split('\n').map(str::to_string).collect();
        let inserted = pieces.len();
        let last_piece = &pieces[inserted - 1];
        let (new_end, new_end_point) = if inserted == 1 {
            (
                CursorPosition::new(start.line, start.column + last_piece.chars().count()),
                Point::new(start.line, start_col_byte + last_piece.len()),
            )
        } else {
            (
                CursorPosition::new(start.line + inserted - 1, last_piece.chars().count()),
                Point::new(start.line + inserted - 1, last_piece.len()),
            )
        };

        pieces[0].insert_str(0, &head);
        pieces[inserted - 1].push_str(&tail);

        let removed = end.line - start.line + 1;
        self.lines.splice(start.line..=end.line, pieces);

        self.pending_edits.push(ByteRangeEdit {
            start_byte,
            old_end_byte,
            new_end_byte: start_byte + text.len(),
            start_point: Point::new(start.line, start_col_byte),
            old_end_point: Point::new(end.line, end_col_byte),
            new_end_point,
        });
        self.version += 1;

        // Line indices after the edit shift when the line count changes.
        let changed = if removed == inserted {
            start.line..start.line + inserted
        } else {
            start.line..self.lines.len()
        };
        let change = BufferChange {
            splice: LineSplice {
                start: start.line,
                removed,
                inserted,
            },
            changed,
            version: self.version,
        };
        (change, new_end)
    }

    /// Replaces the whole buffer, reporting only the lines between the longest
    /// common prefix and suffix of the old and new line sequences as changed.
    pub fn set_content(&mut self, text: &str) -> BufferChange {
        let new_lines = split_lines(text);
        let (prefix, suffix) = common_affixes(&self.lines, &new_lines);

        let old_text = self.content();
        let new_text = new_lines.join("\n");
        if let Some(edit) = diff_edit(&old_text, &new_text) {
            self.pending_edits.push(edit);
        }

        let splice = LineSplice {
            start: prefix,
            removed: self.lines.len() - prefix - suffix,
            inserted: new_lines.len() - prefix - suffix,
        };
        let changed = prefix..new_lines.len() - suffix;

        self.lines = new_lines;
        self.version += 1;

        BufferChange {
            splice,
            changed,
            version: self.version,
        }
    }

    fn ordered(&self, a: CursorPosition, b: CursorPosition) -> (CursorPosition, CursorPosition) {
        let a = self.clamp(a);
        let b = self.clamp(b);
        (a.min(b), a.max(b))
    }
}

/// Splits text into lines, never returning an empty vector.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Byte index of a character column, clamped to the line length.
pub fn byte_index(line: &str, column: usize) -> usize {
    line.char_indices().nth(column).map_or(line.len(), |(i, _)| i)
}

/// Lengths of the longest common prefix and suffix of two line sequences.
/// The suffix never overlaps the prefix in either sequence.
pub fn common_affixes(old: &[String], new: &[String]) -> (usize, usize) {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();
    (prefix, suffix)
}

/// Computes the single byte-range edit that turns `old` into `new`, or `None`
/// when they are equal.
fn diff_edit(old: &str, new: &str) -> Option<ByteRangeEdit> {
    if old == new {
        return None;
    }
    let (old_b, new_b) = (old.as_bytes(), new.as_bytes());

    let mut start = old_b.iter().zip(new_b).take_while(|(a, b)| a == b).count();
    while !old.is_char_boundary(start) || !new.is_char_boundary(start) {
        start -= 1;
    }

    let max_suffix = old_b.len().min(new_b.len()) - start;
    let mut suffix = old_b
        .iter()
        .rev()
        .zip(new_b.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();
    while !old.is_char_boundary(old_b.len() - suffix) || !new.is_char_boundary(new_b.len() - suffix) {
        suffix -= 1;
    }

    let old_end = old_b.len() - suffix;
    let new_end = new_b.len() - suffix;
    Some(ByteRangeEdit {
        start_byte: start,
        old_end_byte: old_end,
        new_end_byte: new_end,
        start_point: point_at(old, start),
        old_end_point: point_at(old, old_end),
        new_end_point: point_at(new, new_end),
    })
}

fn point_at(text: &str, byte: usize) -> Point {
    let before = &text[..byte];
    let row = before.matches('\n').count();
    let column = before.rfind('\n').map_or(byte, |nl| byte - nl - 1);
    Point::new(row, column)
}
