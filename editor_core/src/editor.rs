//! Main editor logic.
//!
//! [`TextEditor`] is the surface exposed to the application: it owns the
//! editing session, routes every buffer change into the line caches and the
//! background pipelines, and produces colored lines for the visible window
//! once per frame.

use crate::config::EditorConfig;
use crate::cursor::CursorPosition;
use crate::pipeline::HighlightPipeline;
use crate::search::Search;
use crate::semantic::{SemanticOverlay, SymbolIndexer, SymbolKind, TreeSitterIndexer};
use crate::session::EditSession;
use crate::stats::PipelineStats;
use crate::store::{SemanticStore, TokenStore};
use crate::syntax::{Color, Language, Theme, TokenKind, Tokenizer, TreeSitterTokenizer};
use crate::viewport::{Viewport, ViewportLineCache};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const BOM: char = '\u{feff}';

/// Content-hash caches shared by every editor created from them.
#[derive(Clone)]
pub struct EditorStores {
    pub tokens: Arc<TokenStore>,
    pub semantic: Arc<SemanticStore>,
}

impl EditorStores {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            tokens: Arc::new(TokenStore::new(
                "token",
                config.token_cache_capacity,
                config.eviction,
            )),
            semantic: Arc::new(SemanticStore::new(
                "semantic",
                config.semantic_cache_capacity,
                config.eviction,
            )),
        }
    }
}

/// A colored span ready to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSpan {
    /// Character column in the line.
    pub column: usize,
    /// Length in characters.
    pub length: usize,
    pub kind: TokenKind,
    /// Final color, semantic override included.
    pub color: Color,
    /// Semantic kind found at the span start, if any.
    pub symbol: Option<SymbolKind>,
}

/// One visible line.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderLine {
    /// 0-based line index.
    pub line: usize,
    pub text: String,
    /// Spans intersecting the visible columns, ordered by column.
    pub spans: Vec<RenderSpan>,
}

/// The editor state for one open document.
///
/// Does not derive Debug because the pipelines hold trait objects.
pub struct TextEditor {
    session: EditSession,
    config: EditorConfig,
    stores: EditorStores,
    language: Language,
    theme: Theme,
    file_path: Option<PathBuf>,
    modified: bool,
    highlight: HighlightPipeline,
    semantic: SemanticOverlay,
    line_cache: ViewportLineCache,
    viewport: Viewport,
    search: Search,
    /// Set by search navigation; merged with the session's own request.
    scroll_pending: bool,
    /// Time of the first edit the semantic index has not seen yet.
    semantic_due: Option<Instant>,
}

impl Default for TextEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextEditor {
    /// Creates an empty plain-text editor.
    pub fn new() -> Self {
        Self::from_text("", Language::PlainText, EditorConfig::default())
    }

    /// Creates an editor over `text` with tree-sitter backends for `language`.
    /// Declarations are indexed once the editor has a file path.
    pub fn from_text(text: &str, language: Language, config: EditorConfig) -> Self {
        let stores = EditorStores::new(&config);
        Self::with_stores(text, language, config, stores)
    }

    /// Like [`TextEditor::from_text`], sharing caches with other editors.
    pub fn with_stores(
        text: &str,
        language: Language,
        config: EditorConfig,
        stores: EditorStores,
    ) -> Self {
        let mut editor = Self::assemble(
            text,
            config,
            stores,
            Box::new(TreeSitterTokenizer::new(language)),
            Box::new(TreeSitterIndexer::new()),
        );
        editor.language = language;
        editor.start();
        editor
    }

    /// Creates an editor over `text` with caller-supplied backends.
    pub fn with_backends(
        text: &str,
        config: EditorConfig,
        tokenizer: Box<dyn Tokenizer>,
        indexer: Box<dyn SymbolIndexer>,
    ) -> Self {
        let stores = EditorStores::new(&config);
        let mut editor = Self::assemble(text, config, stores, tokenizer, indexer);
        editor.start();
        editor
    }

    fn assemble(
        text: &str,
        config: EditorConfig,
        stores: EditorStores,
        tokenizer: Box<dyn Tokenizer>,
        indexer: Box<dyn SymbolIndexer>,
    ) -> Self {
        let theme = Theme::default();
        let session = EditSession::with_config(text, &config);
        let mut line_cache = ViewportLineCache::new(theme.color(TokenKind::Default));
        line_cache.resize(session.buffer().line_count());

        Self {
            highlight: HighlightPipeline::new(tokenizer, Arc::clone(&stores.tokens)),
            semantic: SemanticOverlay::new(indexer, Arc::clone(&stores.semantic)),
            session,
            config,
            stores,
            language: Language::PlainText,
            theme,
            file_path: None,
            modified: false,
            line_cache,
            viewport: Viewport::default(),
            search: Search::new(),
            scroll_pending: false,
            semantic_due: None,
        }
    }

    /// Launches both pipelines on the initial content.
    fn start(&mut self) {
        self.highlight.request(self.session.buffer_mut());
        self.semantic.request(self.session.buffer().content());
    }

    /// Opens a file in a new editor.
    pub fn open<P: AsRef<Path>>(path: P, config: EditorConfig) -> io::Result<Self> {
        let stores = EditorStores::new(&config);
        Self::open_with_stores(path, config, stores)
    }

    fn open_with_stores<P: AsRef<Path>>(
        path: P,
        config: EditorConfig,
        stores: EditorStores,
    ) -> io::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let text = raw.strip_prefix(BOM).unwrap_or(&raw);
        let language = Language::from_path(path);
        log::debug!("opening {} as {}", path.display(), language.name());

        let mut editor = Self::assemble(
            text,
            config,
            stores,
            Box::new(TreeSitterTokenizer::new(language)),
            Box::new(TreeSitterIndexer::new()),
        );
        editor.language = language;
        editor.file_path = Some(path.to_path_buf());
        editor.semantic.set_path(path);
        editor.start();
        Ok(editor)
    }

    /// Replaces this editor with the contents of `path`. Caches and settings
    /// carry over; in-flight work for the old document is joined.
    pub fn open_file<P: AsRef<Path>>(&mut self, path: P) -> io::Result<()> {
        let viewport = self.viewport;
        let opened = Self::open_with_stores(path, self.config.clone(), self.stores.clone())?;
        *self = opened;
        self.viewport = Viewport::new(0, viewport.line_count, 0, viewport.column_count);
        Ok(())
    }

    /// Saves the buffer to the current file path.
    pub fn save(&mut self) -> io::Result<()> {
        match self.file_path.clone() {
            Some(path) => self.save_to(path),
            None => Err(io::Error::other("no file path set")),
        }
    }

    /// Writes the buffer to `path` and makes it the current file path.
    pub fn save_to<P: AsRef<Path>>(&mut self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        fs::write(path, self.get_content())?;
        if self.semantic.path() != path {
            // the indexer picks its grammar from the path
            self.semantic.set_path(path);
            self.semantic_due.get_or_insert_with(Instant::now);
        }
        self.file_path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// The full text, lines joined with `\n`.
    pub fn get_content(&self) -> String {
        self.session.buffer().content()
    }

    /// Replaces the full text as one undoable edit. Only lines that differ
    /// from the current content are invalidated.
    pub fn set_content(&mut self, text: &str) {
        self.session.replace_content(text);
        self.after_edit();
    }

    pub fn line_count(&self) -> usize {
        self.session.buffer().line_count()
    }

    pub fn cursor_position(&self) -> CursorPosition {
        self.session.cursor_position()
    }

    /// Routes drained buffer changes into the caches and restarts the
    /// pipelines.
    fn after_edit(&mut self) {
        let changes = self.session.take_changes();
        if changes.is_empty() {
            return;
        }
        for change in &changes {
            log::trace!(
                "v{}: lines {:?} changed, splice {:?}",
                change.version,
                change.changed,
                change.splice
            );
            self.highlight.apply_splice(change.splice);
            self.line_cache.apply_splice(change.splice);
        }
        self.modified = true;
        self.highlight.request(self.session.buffer_mut());
        self.semantic_due.get_or_insert_with(Instant::now);
        if self.search.is_active() {
            let splices: Vec<_> = changes.iter().map(|change| change.splice).collect();
            self.search.apply_splices(self.session.buffer(), &splices);
        }
    }

    // ==================== Text Editing ====================

    pub fn insert_char(&mut self, ch: char) {
        self.session.insert_char(ch);
        self.after_edit();
    }

    pub fn insert_tab(&mut self) {
        self.session.insert_tab();
        self.after_edit();
    }

    /// Backspace.
    pub fn delete_char_before_cursor(&mut self) {
        self.session.delete_char_before_cursor();
        self.after_edit();
    }

    /// Delete key.
    pub fn delete_char_forward(&mut self) {
        self.session.delete_char_forward();
        self.after_edit();
    }

    pub fn insert_newline(&mut self) {
        self.session.insert_newline();
        self.after_edit();
    }

    pub fn insert_text(&mut self, text: &str) {
        self.session.insert_text(text);
        self.after_edit();
    }

    /// Pastes clipboard text. `\r\n` line breaks are normalized.
    pub fn paste_text(&mut self, text: &str) {
        self.session.paste_text(text);
        self.after_edit();
    }

    /// Deletes the selection. Returns false if nothing was selected.
    pub fn delete_selected_text(&mut self) -> bool {
        let deleted = self.session.delete_selection();
        self.after_edit();
        deleted
    }

    pub fn undo(&mut self) -> bool {
        let restored = self.session.undo();
        self.after_edit();
        restored
    }

    pub fn redo(&mut self) -> bool {
        let restored = self.session.redo();
        self.after_edit();
        restored
    }

    pub fn can_undo(&self) -> bool {
        self.session.history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.session.history().can_redo()
    }

    // ==================== Cursor and Selection ====================

    /// Moves the caret to a 1-based line and column (jump to symbol).
    pub fn move_cursor_to(&mut self, line: usize, column: usize) {
        self.session.move_cursor_to(line, column);
    }

    pub fn set_cursor(&mut self, pos: CursorPosition, extend: bool) {
        self.session.set_cursor(pos, extend);
    }

    pub fn move_left(&mut self, extend: bool) {
        self.session.move_left(extend);
    }

    pub fn move_right(&mut self, extend: bool) {
        self.session.move_right(extend);
    }

    pub fn move_up(&mut self, extend: bool) {
        self.session.move_up(extend);
    }

    pub fn move_down(&mut self, extend: bool) {
        self.session.move_down(extend);
    }

    pub fn move_to_line_start(&mut self, extend: bool) {
        self.session.move_to_line_start(extend);
    }

    pub fn move_to_line_end(&mut self, extend: bool) {
        self.session.move_to_line_end(extend);
    }

    pub fn move_to_buffer_start(&mut self, extend: bool) {
        self.session.move_to_start(extend);
    }

    pub fn move_to_buffer_end(&mut self, extend: bool) {
        self.session.move_to_end(extend);
    }

    pub fn select(&mut self, anchor: CursorPosition, active: CursorPosition) {
        self.session.select(anchor, active);
    }

    pub fn select_all(&mut self) {
        self.session.select_all();
    }

    pub fn select_word_at_cursor(&mut self) -> bool {
        self.session.select_word_at_cursor()
    }

    pub fn select_line(&mut self) {
        self.session.select_line();
    }

    pub fn has_selection(&self) -> bool {
        self.session.has_selection()
    }

    pub fn clear_selection(&mut self) {
        self.session.clear_selection();
    }

    pub fn get_selected_text(&self) -> String {
        self.session.get_selected_text()
    }

    // ==================== Find / Replace ====================

    pub fn search(&self) -> &Search {
        &self.search
    }

    /// Sets matching options and re-runs the current query.
    pub fn set_find_options(&mut self, case_sensitive: bool, use_regex: bool) {
        let buffer = self.session.buffer();
        self.search.set_case_sensitive(case_sensitive, buffer);
        self.search.set_use_regex(use_regex, buffer);
    }

    /// Searches for `query` and selects the first match.
    /// Returns the number of matching lines.
    pub fn find(&mut self, query: &str) -> usize {
        let count = self.search.set_query(query, self.session.buffer());
        if let Some(found) = self.search.current_match() {
            self.select_match(found.start(), found.end());
        }
        count
    }

    /// Selects the next match after the caret, wrapping around.
    pub fn find_next(&mut self) -> bool {
        let from = self.session.cursor_position();
        match self.search.next_from(from) {
            Some(found) => {
                self.select_match(found.start(), found.end());
                true
            }
            None => false,
        }
    }

    /// Selects the match before the caret or selection, wrapping around.
    pub fn find_prev(&mut self) -> bool {
        let from = self
            .session
            .cursor()
            .selected_range()
            .map_or(self.session.cursor_position(), |(start, _)| start);
        match self.search.prev_from(from) {
            Some(found) => {
                self.select_match(found.start(), found.end());
                true
            }
            None => false,
        }
    }

    fn select_match(&mut self, start: CursorPosition, end: CursorPosition) {
        self.session.select(start, end);
        self.scroll_pending = true;
    }

    /// Replaces the selected match, if the selection is one, then moves to
    /// the next match. Returns true if a replacement was made.
    pub fn replace_next(&mut self, replacement: &str) -> bool {
        let selected = self.session.cursor().selected_range();
        let replaced = match selected {
            Some((start, end)) if self.search.is_match_at(start, end) => {
                self.session.insert_text(replacement);
                self.after_edit();
                true
            }
            _ => false,
        };
        self.find_next();
        replaced
    }

    /// Replaces every match on every line as one undoable edit.
    /// Returns the number of replacements.
    pub fn replace_all(&mut self, replacement: &str) -> usize {
        let Some((text, count)) = self.search.replace_all_text(self.session.buffer(), replacement)
        else {
            return 0;
        };
        self.session.replace_content(&text);
        self.after_edit();
        count
    }

    // ==================== Viewport and Rendering ====================

    /// Sets the visible window.
    pub fn set_viewport(
        &mut self,
        first_line: usize,
        line_count: usize,
        first_column: usize,
        column_count: usize,
    ) {
        self.viewport = Viewport::new(first_line, line_count, first_column, column_count);
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Per-frame entry point: applies finished background results, starts
    /// due work, follows the caret, and returns the visible lines.
    pub fn render_tick(&mut self) -> Vec<RenderLine> {
        if self.highlight.poll(self.session.buffer_mut()) {
            self.line_cache.mark_all_needs_update();
        }
        self.semantic.poll();

        if let Some(since) = self.semantic_due {
            if since.elapsed() >= self.config.semantic_debounce {
                self.semantic_due = None;
                self.semantic.request(self.session.buffer().content());
            }
        }

        let scroll = self.session.take_scroll_request() | std::mem::take(&mut self.scroll_pending);
        if scroll {
            self.viewport.scroll_to(self.session.cursor_position());
        }

        let buffer = self.session.buffer();
        self.line_cache.resize(buffer.line_count());
        let columns = self.viewport.columns();

        self.viewport
            .lines(buffer.line_count())
            .map(|line| {
                let text = buffer.line(line).unwrap_or_default();
                let tokens = self.line_cache.line_tokens(
                    line,
                    text,
                    self.highlight.line_tokens(line),
                    columns.clone(),
                );
                let spans = tokens
                    .iter()
                    .map(|token| {
                        let symbol = self.semantic.lookup(line + 1, token.column + 1);
                        let color = symbol
                            .and_then(|kind| self.theme.semantic_color(kind))
                            .unwrap_or(token.color);
                        RenderSpan {
                            column: token.column,
                            length: token.length,
                            kind: token.kind,
                            color,
                            symbol,
                        }
                    })
                    .collect();
                RenderLine {
                    line,
                    text: text.to_string(),
                    spans,
                }
            })
            .collect()
    }

    /// True when no background work is running, queued or due.
    pub fn is_idle(&self) -> bool {
        self.highlight.is_idle() && self.semantic.is_idle() && self.semantic_due.is_none()
    }

    pub fn highlight_stats(&self) -> &PipelineStats {
        self.highlight.stats()
    }

    pub fn semantic_stats(&self) -> &PipelineStats {
        self.semantic.stats()
    }

    pub fn line_cache(&self) -> &ViewportLineCache {
        &self.line_cache
    }

    pub fn stores(&self) -> &EditorStores {
        &self.stores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ByteRangeEdit;
    use crate::semantic::Symbol;
    use crate::syntax::Token;
    use std::io::Write;
    use std::time::Duration;

    /// One Ident token over every non-empty line.
    struct LineTokenizer;

    impl LineTokenizer {
        fn tokens(text: &str) -> Vec<Token> {
            text.split('\n')
                .enumerate()
                .filter(|(_, line)| !line.is_empty())
                .map(|(i, line)| Token {
                    line: i,
                    column: 0,
                    length: line.chars().count(),
                    kind: TokenKind::Ident,
                    color: [1.0; 4],
                })
                .collect()
        }
    }

    impl Tokenizer for LineTokenizer {
        fn tokenize_full(&mut self, text: &str) -> Vec<Token> {
            Self::tokens(text)
        }

        fn tokenize_incremental(&mut self, text: &str, _edits: &[ByteRangeEdit]) -> Vec<Token> {
            Self::tokens(text)
        }
    }

    struct NoSymbols;

    impl SymbolIndexer for NoSymbols {
        fn index(&mut self, _path: &Path, _text: &str) -> Vec<Symbol> {
            Vec::new()
        }
    }

    fn test_config() -> EditorConfig {
        EditorConfig::default().with_semantic_debounce(Duration::ZERO)
    }

    fn mock_editor(text: &str) -> TextEditor {
        TextEditor::with_backends(text, test_config(), Box::new(LineTokenizer), Box::new(NoSymbols))
    }

    fn settle(editor: &mut TextEditor) -> Vec<RenderLine> {
        let deadline = Instant::now() + Duration::from_secs(10);
        editor.render_tick();
        while !editor.is_idle() {
            assert!(Instant::now() < deadline, "pipelines did not converge");
            std::thread::sleep(Duration::from_millis(2));
            editor.render_tick();
        }
        // draw what the last poll applied
        editor.render_tick()
    }

    fn lines_of(editor: &TextEditor) -> Vec<String> {
        editor.get_content().split('\n').map(str::to_string).collect()
    }

    #[test]
    fn test_insert_scenario() {
        let mut editor = mock_editor("int main()");
        editor.set_cursor(CursorPosition::new(0, 3), false);
        editor.insert_char('X');
        assert_eq!(editor.get_content(), "intX main()");
        assert_eq!(editor.cursor_position(), CursorPosition::new(0, 4));
        assert!(editor.is_modified());
    }

    #[test]
    fn test_multi_line_delete_scenario() {
        let mut editor = mock_editor("ab\ncd\nef");
        editor.select(CursorPosition::new(0, 1), CursorPosition::new(2, 1));
        assert!(editor.delete_selected_text());
        assert_eq!(lines_of(&editor), vec!["af"]);
        assert_eq!(editor.cursor_position(), CursorPosition::new(0, 1));
    }

    #[test]
    fn test_paste_scenario() {
        let mut editor = mock_editor("hello");
        editor.set_cursor(CursorPosition::new(0, 5), false);
        editor.paste_text(" world\r\nfoo");
        assert_eq!(lines_of(&editor), vec!["hello world", "foo"]);
        assert_eq!(editor.cursor_position(), CursorPosition::new(1, 3));
    }

    #[test]
    fn test_converges_after_rapid_edits() {
        let mut editor = mock_editor("alpha\nbeta\ngamma");
        settle(&mut editor);

        editor.set_cursor(CursorPosition::new(1, 4), false);
        for ch in "_long".chars() {
            editor.insert_char(ch);
            editor.render_tick();
        }
        editor.insert_newline();
        editor.insert_text("delta");

        let lines = settle(&mut editor);
        assert_eq!(lines.len(), 4);
        for rendered in &lines {
            assert_eq!(rendered.spans.len(), 1);
            assert_eq!(rendered.spans[0].kind, TokenKind::Ident);
            assert_eq!(rendered.spans[0].length, rendered.text.chars().count());
        }
        assert_eq!(lines[1].text, "beta_long");
        assert_eq!(lines[2].text, "delta");
    }

    #[test]
    fn test_edit_reuses_other_lines() {
        let text: String = (0..20).map(|i| format!("line {i}\n")).collect();
        let mut editor = mock_editor(&text);
        editor.set_viewport(0, 30, 0, 80);
        settle(&mut editor);

        editor.set_cursor(CursorPosition::new(7, 0), false);
        editor.insert_char('#');
        let hashes: Vec<u64> = (0..20)
            .map(|i| editor.line_cache().entry(i).unwrap().line_hash)
            .collect();
        for line in (0..20).filter(|&l| l != 7) {
            assert!(editor.line_cache().entry(line).unwrap().is_valid, "line {line}");
        }
        assert!(!editor.line_cache().entry(7).unwrap().is_valid);

        let rendered = editor.render_tick();
        assert_eq!(rendered[7].text, "#line 7");
        for line in (0..20).filter(|&l| l != 7) {
            assert_eq!(editor.line_cache().entry(line).unwrap().line_hash, hashes[line]);
        }
    }

    #[test]
    fn test_placeholder_while_pipeline_runs() {
        let mut editor = mock_editor("abc");
        settle(&mut editor);
        editor.set_cursor(CursorPosition::new(0, 3), false);
        editor.insert_char('d');

        // edited line lost its bucket; until the result lands it is one default span
        let lines = editor.render_tick();
        if !editor.highlight.is_idle() {
            assert_eq!(lines[0].spans[0].kind, TokenKind::Default);
            assert_eq!(lines[0].spans[0].length, 4);
        }
        let lines = settle(&mut editor);
        assert_eq!(lines[0].spans[0].kind, TokenKind::Ident);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut editor = mock_editor("start");
        editor.set_cursor(CursorPosition::new(0, 5), false);
        editor.insert_newline();
        editor.insert_text("one");
        editor.insert_newline();
        editor.insert_text("two");
        let finished = editor.get_content();

        while editor.undo() {}
        assert_eq!(editor.get_content(), "start");
        while editor.redo() {}
        assert_eq!(editor.get_content(), finished);
        settle(&mut editor);
    }

    #[test]
    fn test_move_cursor_to_scrolls() {
        let text = vec!["x"; 100].join("\n");
        let mut editor = mock_editor(&text);
        editor.set_viewport(0, 10, 0, 40);

        editor.move_cursor_to(50, 1);
        let lines = editor.render_tick();
        assert_eq!(editor.cursor_position(), CursorPosition::new(49, 0));
        assert_eq!(lines.first().map(|l| l.line), Some(40));
        assert_eq!(lines.last().map(|l| l.line), Some(49));

        editor.move_cursor_to(500, 500);
        assert_eq!(editor.cursor_position(), CursorPosition::new(99, 1));
    }

    #[test]
    fn test_find_and_replace() {
        let mut editor = mock_editor("foo bar\nbaz foo\nfoo");
        assert_eq!(editor.find("foo"), 3);
        assert_eq!(editor.get_selected_text(), "foo");
        assert_eq!(editor.cursor_position(), CursorPosition::new(0, 3));

        assert!(editor.find_next());
        assert_eq!(editor.cursor_position(), CursorPosition::new(1, 7));
        assert!(editor.find_prev());
        assert_eq!(editor.cursor_position(), CursorPosition::new(0, 3));

        assert!(editor.replace_next("qux"));
        assert_eq!(editor.get_content(), "qux bar\nbaz foo\nfoo");
        assert_eq!(editor.get_selected_text(), "foo");

        assert_eq!(editor.replace_all("z"), 2);
        assert_eq!(editor.get_content(), "qux bar\nbaz z\nz");
        assert!(editor.undo());
        assert_eq!(editor.get_content(), "qux bar\nbaz foo\nfoo");
    }

    #[test]
    fn test_set_content_is_undoable() {
        let mut editor = mock_editor("a\nb\nc");
        editor.set_content("a\nB\nc");
        assert_eq!(editor.get_content(), "a\nB\nc");
        assert!(editor.undo());
        assert_eq!(editor.get_content(), "a\nb\nc");
    }

    #[test]
    fn test_open_c_file_with_bom() {
        let mut file = tempfile::Builder::new().suffix(".c").tempfile().unwrap();
        write!(file, "\u{feff}int main(void) {{\n    return 0;\n}}\n").unwrap();

        let mut editor = TextEditor::open(file.path(), test_config()).unwrap();
        assert_eq!(editor.language(), Language::C);
        assert!(editor.get_content().starts_with("int main"));
        assert!(!editor.is_modified());

        let lines = settle(&mut editor);
        let first = &lines[0];
        assert_eq!(first.spans[0].kind, TokenKind::PrimitiveType);

        let main = first.spans.iter().find(|s| s.column == 4).unwrap();
        assert_eq!(main.kind, TokenKind::Function);
        assert_eq!(main.symbol, Some(SymbolKind::FunctionDecl));
        assert_eq!(Some(main.color), editor.theme().semantic_color(SymbolKind::FunctionDecl));
        assert!(editor.highlight_stats().applied >= 1);
    }

    #[test]
    fn test_open_file_replaces_document() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        fs::write(&notes, "just text\nmore").unwrap();

        let mut editor = mock_editor("old");
        editor.open_file(&notes).unwrap();
        assert_eq!(editor.language(), Language::PlainText);
        assert_eq!(editor.file_path(), Some(notes.as_path()));

        let lines = settle(&mut editor);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans[0].kind, TokenKind::Default);
        assert_eq!(lines[0].spans[0].length, 9);

        assert!(editor.open_file(dir.path().join("missing.c")).is_err());
        assert_eq!(editor.get_content(), "just text\nmore");
    }

    #[test]
    fn test_store_is_scoped_by_language() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("a.txt");
        let source = dir.path().join("b.cpp");
        fs::write(&plain, "int value;").unwrap();
        fs::write(&source, "int value;").unwrap();

        let mut editor = TextEditor::open(&plain, test_config()).unwrap();
        let lines = settle(&mut editor);
        assert_eq!(lines[0].spans[0].kind, TokenKind::Default);

        // same text, same stores, different grammar
        editor.open_file(&source).unwrap();
        let lines = settle(&mut editor);
        assert_eq!(editor.language(), Language::Cpp);
        assert_eq!(lines[0].spans[0].kind, TokenKind::PrimitiveType);
        assert_eq!(editor.highlight_stats().cache_hits, 0);
        assert_eq!(editor.stores().tokens.len(), 2);
    }

    #[test]
    fn test_save_then_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = TextEditor::from_text("int value;", Language::Cpp, test_config());
        let lines = settle(&mut editor);
        assert!(lines[0].spans.iter().all(|span| span.symbol.is_none()));

        // the unsaved document indexed to nothing; the saved one must not reuse that
        editor.save_to(dir.path().join("a.cpp")).unwrap();
        let lines = settle(&mut editor);
        let value = lines[0].spans.iter().find(|span| span.column == 4).unwrap();
        assert_eq!(value.symbol, Some(SymbolKind::VarDecl));
        assert_eq!(editor.semantic_stats().cache_hits, 0);
    }

    #[test]
    fn test_save_to() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.c");

        let mut editor = mock_editor("int x;");
        assert!(editor.save().is_err());
        editor.set_cursor(CursorPosition::new(0, 6), false);
        editor.insert_text("\nint y;");
        assert!(editor.is_modified());

        editor.save_to(&path).unwrap();
        assert!(!editor.is_modified());
        assert_eq!(fs::read_to_string(&path).unwrap(), "int x;\nint y;");
        assert_eq!(editor.file_path(), Some(path.as_path()));
    }
}
