//! Visible window and the per-line token cache read by rendering.

use crate::buffer::LineSplice;
use crate::cursor::CursorPosition;
use crate::store::content_hash;
use crate::syntax::{Color, Token, TokenKind};
use std::iter;
use std::ops::Range;

/// The visible window, in lines and character columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub first_line: usize,
    pub line_count: usize,
    pub first_column: usize,
    pub column_count: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            first_line: 0,
            line_count: 40,
            first_column: 0,
            column_count: 120,
        }
    }
}

impl Viewport {
    pub fn new(first_line: usize, line_count: usize, first_column: usize, column_count: usize) -> Self {
        Self {
            first_line,
            line_count: line_count.max(1),
            first_column,
            column_count: column_count.max(1),
        }
    }

    /// Visible line indices, clipped to a buffer of `total` lines.
    pub fn lines(&self, total: usize) -> Range<usize> {
        let start = self.first_line.min(total);
        start..(self.first_line + self.line_count).min(total)
    }

    /// Visible column interval.
    pub fn columns(&self) -> Range<usize> {
        self.first_column..self.first_column + self.column_count
    }

    /// Scrolls the minimum amount to show `pos`. Returns true if it moved.
    pub fn scroll_to(&mut self, pos: CursorPosition) -> bool {
        let before = *self;

        if pos.line < self.first_line {
            self.first_line = pos.line;
        } else if pos.line >= self.first_line + self.line_count {
            self.first_line = pos.line + 1 - self.line_count;
        }

        if pos.column < self.first_column {
            self.first_column = pos.column;
        } else if pos.column >= self.first_column + self.column_count {
            self.first_column = pos.column + 1 - self.column_count;
        }

        *self != before
    }
}

/// Cached tokens of one line.
#[derive(Debug, Clone, Default)]
pub struct LineCache {
    /// Hash of the line text the tokens were taken for.
    pub line_hash: u64,
    pub tokens: Vec<Token>,
    pub is_valid: bool,
    /// Set when fresher tokens may exist, or when `tokens` is only a
    /// placeholder.
    pub needs_update: bool,
}

impl LineCache {
    fn is_current(&self, hash: u64) -> bool {
        self.is_valid && !self.needs_update && self.line_hash == hash
    }
}

/// Lazily materialized per-line tokens, indexed like the buffer's lines.
#[derive(Debug)]
pub struct ViewportLineCache {
    entries: Vec<LineCache>,
    /// Color of the placeholder token shown while no tokens exist.
    default_color: Color,
    reuses: u64,
    rebuilds: u64,
}

impl ViewportLineCache {
    pub fn new(default_color: Color) -> Self {
        Self {
            entries: Vec::new(),
            default_color,
            reuses: 0,
            rebuilds: 0,
        }
    }

    /// Resizes to `line_count` entries. New entries start invalid.
    pub fn resize(&mut self, line_count: usize) {
        self.entries.resize_with(line_count, LineCache::default);
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Mirrors a buffer splice: replaced lines become invalid, lines after it
    /// shift and keep their cached state.
    pub fn apply_splice(&mut self, splice: LineSplice) {
        let end = (splice.start + splice.removed).min(self.entries.len());
        let start = splice.start.min(end);
        self.entries.splice(
            start..end,
            iter::repeat_with(LineCache::default).take(splice.inserted),
        );
    }

    /// Flags every entry for a refresh from the token buckets.
    pub fn mark_all_needs_update(&mut self) {
        for entry in &mut self.entries {
            entry.needs_update = true;
        }
    }

    /// Tokens of `line` that intersect `columns`.
    ///
    /// Reuses the cached entry while it is current for `text`. Otherwise the
    /// entry is rebuilt from `bucket`. Lines with no tokens get one default
    /// token over the whole line; when `bucket` is `None` no result covers
    /// the line yet and the entry stays flagged for update.
    pub fn line_tokens(
        &mut self,
        line: usize,
        text: &str,
        bucket: Option<&[Token]>,
        columns: Range<usize>,
    ) -> Vec<Token> {
        if line >= self.entries.len() {
            self.resize(line + 1);
        }
        let hash = content_hash(text);
        let default_color = self.default_color;
        let entry = &mut self.entries[line];

        if entry.is_current(hash) {
            self.reuses += 1;
        } else {
            self.rebuilds += 1;
            entry.line_hash = hash;
            entry.is_valid = true;
            match bucket {
                Some(tokens) if !tokens.is_empty() => entry.tokens = tokens.to_vec(),
                _ => {
                    entry.tokens = vec![Token {
                        line,
                        column: 0,
                        length: text.chars().count(),
                        kind: TokenKind::Default,
                        color: default_color,
                    }];
                }
            }
            entry.needs_update = bucket.is_none();
        }

        entry
            .tokens
            .iter()
            .filter(|token| token.overlaps(columns.start, columns.end))
            .copied()
            .collect()
    }

    pub fn entry(&self, line: usize) -> Option<&LineCache> {
        self.entries.get(line)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups answered from a current entry.
    pub fn reuses(&self) -> u64 {
        self.reuses
    }

    /// Lookups that rebuilt their entry.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}
