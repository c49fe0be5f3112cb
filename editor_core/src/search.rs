//! Search and replace functionality.
//!
//! Matching is line based: `find_all` records the first match on each line,
//! while replacement rewrites every match on every line.

use crate::buffer::{LineSplice, TextBuffer};
use crate::cursor::CursorPosition;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;

/// A search match in the buffer, in character columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub line: usize,
    pub column: usize,
    pub length: usize,
}

impl SearchMatch {
    pub fn new(line: usize, column: usize, length: usize) -> Self {
        Self { line, column, length }
    }

    /// Position of the first matched character.
    pub fn start(&self) -> CursorPosition {
        CursorPosition::new(self.line, self.column)
    }

    /// Position just past the match.
    pub fn end(&self) -> CursorPosition {
        CursorPosition::new(self.line, self.column + self.length)
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Search state for find/replace.
#[derive(Debug, Clone, Default)]
pub struct Search {
    /// The current search query.
    query: String,
    /// Whether search is case sensitive.
    case_sensitive: bool,
    /// Whether the query is a regular expression.
    use_regex: bool,
    /// Compiled query; `None` when the query is empty or invalid.
    pattern: Option<Regex>,
    /// First match of each matching line.
    matches: Vec<SearchMatch>,
    /// Index of the current (highlighted) match.
    current_match: Option<usize>,
}

impl Search {
    /// Creates a new empty search state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current search query.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Sets the search query and searches the buffer.
    /// Returns the number of matches found.
    pub fn set_query(&mut self, query: &str, buffer: &TextBuffer) -> usize {
        self.query = query.to_string();
        self.compile();
        self.find_all(buffer)
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Sets whether search is case sensitive and re-searches.
    pub fn set_case_sensitive(&mut self, sensitive: bool, buffer: &TextBuffer) {
        if self.case_sensitive != sensitive {
            self.case_sensitive = sensitive;
            self.compile();
            self.find_all(buffer);
        }
    }

    pub fn is_regex(&self) -> bool {
        self.use_regex
    }

    /// Switches between plain and regex matching and re-searches.
    pub fn set_use_regex(&mut self, use_regex: bool, buffer: &TextBuffer) {
        if self.use_regex != use_regex {
            self.use_regex = use_regex;
            self.compile();
            self.find_all(buffer);
        }
    }

    /// True when the query is a regex that failed to compile.
    pub fn is_invalid(&self) -> bool {
        !self.query.is_empty() && self.pattern.is_none()
    }

    fn compile(&mut self) {
        self.pattern = None;
        if self.query.is_empty() {
            return;
        }
        let source = if self.use_regex {
            self.query.clone()
        } else {
            regex::escape(&self.query)
        };
        match RegexBuilder::new(&source)
            .case_insensitive(!self.case_sensitive)
            .build()
        {
            Ok(pattern) => self.pattern = Some(pattern),
            Err(err) => log::warn!("invalid search pattern {:?}: {err}", self.query),
        }
    }

    /// Returns all matches.
    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Returns the current match index (1-based for display).
    pub fn current_match_index(&self) -> Option<usize> {
        self.current_match.map(|i| i + 1)
    }

    /// Returns the current match, if any.
    pub fn current_match(&self) -> Option<SearchMatch> {
        self.current_match.and_then(|i| self.matches.get(i).copied())
    }

    /// Clears the search state.
    pub fn clear(&mut self) {
        self.query.clear();
        self.pattern = None;
        self.matches.clear();
        self.current_match = None;
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Returns true if the search is active (has a non-empty query).
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }

    /// Records the first match on every line.
    pub fn find_all(&mut self, buffer: &TextBuffer) -> usize {
        self.matches.clear();
        self.current_match = None;

        for (index, line) in buffer.lines().iter().enumerate() {
            if let Some(found) = self.find_in_line(index, line) {
                self.matches.push(found);
            }
        }
        if !self.matches.is_empty() {
            self.current_match = Some(0);
        }
        log::debug!("search {:?}: {} matching lines", self.query, self.matches.len());
        self.matches.len()
    }

    /// First non-empty match in one line.
    fn find_in_line(&self, index: usize, line: &str) -> Option<SearchMatch> {
        let pattern = self.pattern.as_ref()?;
        let found = pattern.find_iter(line).find(|m| !m.is_empty())?;
        Some(SearchMatch::new(
            index,
            line[..found.start()].chars().count(),
            found.as_str().chars().count(),
        ))
    }

    /// Moves to the first match starting at or after `pos`, wrapping around.
    pub fn next_from(&mut self, pos: CursorPosition) -> Option<SearchMatch> {
        if self.matches.is_empty() {
            return None;
        }
        let index = self
            .matches
            .iter()
            .position(|m| m.start() >= pos)
            .unwrap_or(0);
        self.current_match = Some(index);
        Some(self.matches[index])
    }

    /// Moves to the last match starting before `pos`, wrapping around.
    pub fn prev_from(&mut self, pos: CursorPosition) -> Option<SearchMatch> {
        if self.matches.is_empty() {
            return None;
        }
        let index = self
            .matches
            .iter()
            .rposition(|m| m.start() < pos)
            .unwrap_or(self.matches.len() - 1);
        self.current_match = Some(index);
        Some(self.matches[index])
    }

    /// Moves to the next match, wrapping around.
    pub fn next_match(&mut self) -> Option<SearchMatch> {
        if self.matches.is_empty() {
            return None;
        }
        let next = match self.current_match {
            Some(i) => (i + 1) % self.matches.len(),
            None => 0,
        };
        self.current_match = Some(next);
        Some(self.matches[next])
    }

    /// Moves to the previous match, wrapping around.
    pub fn prev_match(&mut self) -> Option<SearchMatch> {
        if self.matches.is_empty() {
            return None;
        }
        let prev = match self.current_match {
            Some(i) if i > 0 => i - 1,
            _ => self.matches.len() - 1,
        };
        self.current_match = Some(prev);
        Some(self.matches[prev])
    }

    /// Re-runs the search after the buffer changed, staying near the old
    /// current match.
    pub fn refresh(&mut self, buffer: &TextBuffer) {
        let old_current = self.current_match();
        self.find_all(buffer);
        if let Some(old) = old_current {
            self.next_from(old.start());
        }
    }

    /// Follows `splices`, applied in order to produce `buffer`. Matches on
    /// untouched lines shift with their line; only replaced lines are
    /// searched again.
    pub fn apply_splices(&mut self, buffer: &TextBuffer, splices: &[LineSplice]) {
        let mut anchor = self.current_match().map(|m| m.start());
        let mut dirty = BTreeSet::new();

        for splice in splices {
            let removed_end = splice.start + splice.removed;
            let shift = |line: usize| line - splice.removed + splice.inserted;

            self.matches
                .retain(|m| m.line < splice.start || m.line >= removed_end);
            for found in &mut self.matches {
                if found.line >= removed_end {
                    found.line = shift(found.line);
                }
            }
            dirty = dirty
                .into_iter()
                .filter(|&line| line < splice.start || line >= removed_end)
                .map(|line| if line >= removed_end { shift(line) } else { line })
                .collect();
            dirty.extend(splice.start..splice.start + splice.inserted);

            if let Some(pos) = &mut anchor {
                if pos.line >= removed_end {
                    pos.line = shift(pos.line);
                } else if pos.line >= splice.start {
                    *pos = CursorPosition::new(splice.start, 0);
                }
            }
        }

        for line in dirty {
            let Some(text) = buffer.line(line) else {
                continue;
            };
            if let Some(found) = self.find_in_line(line, text) {
                let at = self.matches.partition_point(|m| m.line < line);
                self.matches.insert(at, found);
            }
        }

        self.current_match = None;
        match anchor {
            Some(pos) => {
                self.next_from(pos);
            }
            None if !self.matches.is_empty() => self.current_match = Some(0),
            None => {}
        }
    }

    /// Matches on lines `start_line..end_line`, for rendering.
    pub fn matches_in_range(&self, start_line: usize, end_line: usize) -> Vec<SearchMatch> {
        self.matches
            .iter()
            .filter(|m| m.line >= start_line && m.line < end_line)
            .copied()
            .collect()
    }

    /// Returns true if the text between `start` and `end` is exactly a match.
    pub fn is_match_at(&self, start: CursorPosition, end: CursorPosition) -> bool {
        self.matches
            .iter()
            .any(|m| m.start() == start && m.end() == end)
    }

    /// Replaces every match on every line with `replacement`, taken
    /// literally. Returns the new text and the number of replacements, or
    /// `None` if nothing matched.
    pub fn replace_all_text(&self, buffer: &TextBuffer, replacement: &str) -> Option<(String, usize)> {
        let pattern = self.pattern.as_ref()?;
        let mut total = 0;
        let lines: Vec<String> = buffer
            .lines()
            .iter()
            .map(|line| {
                let (replaced, count) = replace_in_line(pattern, line, replacement);
                total += count;
                replaced
            })
            .collect();

        if total == 0 {
            return None;
        }
        log::debug!("replacing {total} matches of {:?}", self.query);
        Some((lines.join("\n"), total))
    }
}

fn replace_in_line(pattern: &Regex, line: &str, replacement: &str) -> (String, usize) {
    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    let mut count = 0;
    for found in pattern.find_iter(line).filter(|m| !m.is_empty()) {
        out.push_str(&line[last..found.start()]);
        out.push_str(replacement);
        last = found.end();
        count += 1;
    }
    out.push_str(&line[last..]);
    (out, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_first_match_per_line() {
        let buffer = TextBuffer::from_text("hello world hello\nnothing\nsay hello");
        let mut search = Search::new();

        let count = search.set_query("hello", &buffer);
        assert_eq!(count, 2);
        assert_eq!(search.matches()[0], SearchMatch::new(0, 0, 5));
        assert_eq!(search.matches()[1], SearchMatch::new(2, 4, 5));

        let second = search.next_match().unwrap();
        assert_eq!(second.line, 2);
        // Wrap around
        let wrapped = search.next_match().unwrap();
        assert_eq!(wrapped.line, 0);
    }

    #[test]
    fn test_search_case_sensitivity() {
        let buffer = TextBuffer::from_text("Hello\nHELLO\nhello");
        let mut search = Search::new();

        assert_eq!(search.set_query("hello", &buffer), 3);
        search.set_case_sensitive(true, &buffer);
        assert_eq!(search.match_count(), 1);
        assert_eq!(search.matches()[0].line, 2);
    }

    #[test]
    fn test_plain_query_is_literal() {
        let buffer = TextBuffer::from_text("a.b\naxb");
        let mut search = Search::new();
        assert_eq!(search.set_query("a.b", &buffer), 1);

        search.set_use_regex(true, &buffer);
        assert_eq!(search.match_count(), 2);
    }

    #[test]
    fn test_invalid_regex_has_no_matches() {
        let buffer = TextBuffer::from_text("int (x);");
        let mut search = Search::new();
        search.set_use_regex(true, &buffer);

        assert_eq!(search.set_query("(x", &buffer), 0);
        assert!(search.is_invalid());
        assert!(search.replace_all_text(&buffer, "y").is_none());
    }

    #[test]
    fn test_next_and_prev_from_cursor() {
        let buffer = TextBuffer::from_text("a\nb a\nc\na");
        let mut search = Search::new();
        search.set_query("a", &buffer);
        assert_eq!(search.match_count(), 3);

        let next = search.next_from(CursorPosition::new(1, 0)).unwrap();
        assert_eq!(next.start(), CursorPosition::new(1, 2));
        let wrapped = search.next_from(CursorPosition::new(3, 1)).unwrap();
        assert_eq!(wrapped.start(), CursorPosition::new(0, 0));

        let prev = search.prev_from(CursorPosition::new(1, 2)).unwrap();
        assert_eq!(prev.start(), CursorPosition::new(0, 0));
        let wrapped = search.prev_from(CursorPosition::new(0, 0)).unwrap();
        assert_eq!(wrapped.start(), CursorPosition::new(3, 0));
        assert_eq!(search.current_match_index(), Some(3));
    }

    #[test]
    fn test_columns_are_characters() {
        let buffer = TextBuffer::from_text("héllo wörld");
        let mut search = Search::new();
        search.set_query("wörld", &buffer);
        assert_eq!(search.matches()[0], SearchMatch::new(0, 6, 5));
    }

    #[test]
    fn test_replace_all_every_occurrence() {
        let buffer = TextBuffer::from_text("foo foo\nbar\nFOO");
        let mut search = Search::new();
        search.set_query("foo", &buffer);

        let (text, count) = search.replace_all_text(&buffer, "$1baz").unwrap();
        assert_eq!(count, 3);
        assert_eq!(text, "$1baz $1baz\nbar\n$1baz");
    }

    #[test]
    fn test_regex_replace_skips_empty_matches() {
        let buffer = TextBuffer::from_text("aab");
        let mut search = Search::new();
        search.set_use_regex(true, &buffer);
        search.set_query("a*", &buffer);

        assert_eq!(search.matches()[0], SearchMatch::new(0, 0, 2));
        let (text, count) = search.replace_all_text(&buffer, "x").unwrap();
        assert_eq!((text.as_str(), count), ("xb", 1));
    }

    #[test]
    fn test_search_empty_query() {
        let buffer = TextBuffer::from_text("hello world");
        let mut search = Search::new();

        assert_eq!(search.set_query("", &buffer), 0);
        assert!(!search.is_active());
        assert!(!search.is_invalid());
    }

    #[test]
    fn test_refresh_keeps_position() {
        let mut buffer = TextBuffer::from_text("x\nx\nx");
        let mut search = Search::new();
        search.set_query("x", &buffer);
        search.next_match();
        assert_eq!(search.current_match().unwrap().line, 1);

        buffer.insert_text(CursorPosition::new(0, 0), "y");
        search.refresh(&buffer);
        assert_eq!(search.current_match().unwrap().line, 1);
        assert_eq!(search.current_match().unwrap().column, 0);
    }

    #[test]
    fn test_splices_rescan_only_replaced_lines() {
        let mut buffer = TextBuffer::from_text("x\nx\nab\nx");
        let mut search = Search::new();
        search.set_query("x", &buffer);
        search.next_from(CursorPosition::new(3, 0));
        assert_eq!(search.match_count(), 3);

        // a newline on line 0 pushes everything down by one
        let (first, _) = buffer.insert_newline(CursorPosition::new(0, 1));
        // then line 3 ("ab") gains a match
        let (second, _) = buffer.insert_char(CursorPosition::new(3, 1), 'x');
        search.apply_splices(&buffer, &[first.splice, second.splice]);

        let mut expected = Search::new();
        expected.set_query("x", &buffer);
        assert_eq!(search.matches(), expected.matches());
        assert_eq!(search.match_count(), 4);
        assert_eq!(search.current_match().unwrap().start(), CursorPosition::new(4, 0));
    }

    #[test]
    fn test_splice_removes_matches_of_deleted_lines() {
        let mut buffer = TextBuffer::from_text("a\nx\nb\nx");
        let mut search = Search::new();
        search.set_query("x", &buffer);

        let change = buffer.set_content("a\nb\nx");
        search.apply_splices(&buffer, &[change.splice]);
        assert_eq!(search.matches(), &[SearchMatch::new(2, 0, 1)]);
        assert_eq!(search.current_match_index(), Some(1));
    }
}
