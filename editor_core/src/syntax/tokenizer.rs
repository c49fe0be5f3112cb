//! Tree-sitter tokenizer for C and C++.
//!
//! Produces a flat, line-split token stream from the parse tree. The tree is
//! kept between calls so that queued [`ByteRangeEdit`]s can be replayed onto
//! it for an incremental reparse.

use super::language::Language;
use super::subtoken::{self, Piece};
use super::theme::Theme;
use super::token::{Token, TokenKind};
use crate::buffer::ByteRangeEdit;
use crate::error::SyntaxError;
use tree_sitter::{InputEdit, Node, Parser, Point, Tree, TreeCursor};

/// The parser contract consumed by the highlight pipeline.
///
/// Implementations must never fail: malformed or unsupported input yields an
/// empty token sequence.
pub trait Tokenizer: Send {
    /// Tokenizes `text` from scratch.
    fn tokenize_full(&mut self, text: &str) -> Vec<Token>;

    /// Tokenizes `text`, which is the previous input with `edits` applied.
    fn tokenize_incremental(&mut self, text: &str, edits: &[ByteRangeEdit]) -> Vec<Token>;

    /// Forgets any state carried between calls, so the next incremental call
    /// parses from scratch.
    fn invalidate(&mut self) {}

    /// The language tokens are produced for. Cached results are keyed by it.
    fn language(&self) -> Language {
        Language::PlainText
    }
}

const CONTROL_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "break", "continue", "return", "goto",
    "default", "_Generic", "try", "catch", "throw", "co_return", "co_yield", "co_await",
];

const STORAGE_KEYWORDS: &[&str] = &[
    "static", "const", "extern", "register", "auto", "volatile", "inline", "restrict", "typedef",
    "struct", "enum", "union", "unsigned", "long", "_Noreturn", "_Alignof", "class", "namespace",
    "template", "typename", "public", "private", "protected", "virtual", "override", "final",
    "friend", "using", "constexpr", "mutable", "explicit", "operator", "new", "delete",
];

const DIRECTIVES: &[&str] = &[
    "#include", "#define", "#undef", "#ifdef", "#ifndef", "#endif", "#else", "#if", "#elif",
    "#elifdef", "#elifndef",
];

/// Tokenizer backed by tree-sitter.
pub struct TreeSitterTokenizer {
    /// Tree-sitter parser.
    parser: Parser,
    /// Tree of the last tokenized text.
    tree: Option<Tree>,
    /// Current language.
    language: Language,
    /// Colors stamped onto tokens.
    theme: Theme,
}

impl TreeSitterTokenizer {
    /// Creates a tokenizer for `language`. A grammar that fails to load
    /// degrades to plain text.
    pub fn new(language: Language) -> Self {
        match Self::try_new(language) {
            Ok(tokenizer) => tokenizer,
            Err(err) => {
                log::warn!("{err}; highlighting disabled");
                Self {
                    parser: Parser::new(),
                    tree: None,
                    language: Language::PlainText,
                    theme: Theme::default(),
                }
            }
        }
    }

    /// Creates a tokenizer, reporting grammar load failures.
    pub fn try_new(language: Language) -> Result<Self, SyntaxError> {
        let mut parser = Parser::new();
        if let Some(grammar) = language.tree_sitter_language() {
            parser
                .set_language(&grammar)
                .map_err(|source| SyntaxError::Language {
                    language: language.name(),
                    source,
                })?;
        }
        Ok(Self {
            parser,
            tree: None,
            language,
            theme: Theme::default(),
        })
    }

    /// Replaces the color theme used for new tokens.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    fn parse(&mut self, text: &str, old_tree: Option<&Tree>) -> Result<Tree, SyntaxError> {
        if !self.language.has_highlighting() {
            return Err(SyntaxError::Unsupported);
        }
        self.parser.parse(text, old_tree).ok_or(SyntaxError::NoTree)
    }

    fn tokens_for(&mut self, text: &str, parsed: Result<Tree, SyntaxError>) -> Vec<Token> {
        match parsed {
            Ok(tree) => {
                let tokens = collect_tokens(&tree, text, &self.theme);
                self.tree = Some(tree);
                tokens
            }
            Err(SyntaxError::Unsupported) => {
                self.tree = None;
                Vec::new()
            }
            Err(err) => {
                log::warn!("tokenize failed: {err}");
                self.tree = None;
                Vec::new()
            }
        }
    }
}

impl Tokenizer for TreeSitterTokenizer {
    fn tokenize_full(&mut self, text: &str) -> Vec<Token> {
        let parsed = self.parse(text, None);
        self.tokens_for(text, parsed)
    }

    fn tokenize_incremental(&mut self, text: &str, edits: &[ByteRangeEdit]) -> Vec<Token> {
        let Some(mut old_tree) = self.tree.take() else {
            return self.tokenize_full(text);
        };
        if edits.is_empty() {
            return self.tokenize_full(text);
        }

        for edit in edits {
            old_tree.edit(&InputEdit {
                start_byte: edit.start_byte,
                old_end_byte: edit.old_end_byte,
                new_end_byte: edit.new_end_byte,
                start_position: Point::new(edit.start_point.row, edit.start_point.column),
                old_end_position: Point::new(edit.old_end_point.row, edit.old_end_point.column),
                new_end_position: Point::new(edit.new_end_point.row, edit.new_end_point.column),
            });
        }
        let parsed = self.parse(text, Some(&old_tree));
        self.tokens_for(text, parsed)
    }

    fn invalidate(&mut self) {
        self.tree = None;
    }

    fn language(&self) -> Language {
        self.language
    }
}

/// Depth-first walk over leaf nodes in document order, driven by a tree cursor
/// instead of recursion.
struct Leaves<'tree> {
    cursor: TreeCursor<'tree>,
    done: bool,
}

impl<'tree> Leaves<'tree> {
    fn new(root: Node<'tree>) -> Self {
        Self {
            cursor: root.walk(),
            done: false,
        }
    }
}

impl<'tree> Iterator for Leaves<'tree> {
    type Item = Node<'tree>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        while self.cursor.goto_first_child() {}
        let leaf = self.cursor.node();

        while !self.cursor.goto_next_sibling() {
            if !self.cursor.goto_parent() {
                self.done = true;
                break;
            }
        }
        Some(leaf)
    }
}

/// Accumulates tokens, converting byte spans to per-line character columns.
struct Collector<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
    theme: &'a Theme,
    tokens: Vec<Token>,
    parens: Vec<TokenKind>,
    braces: Vec<TokenKind>,
}

fn collect_tokens(tree: &Tree, source: &str, theme: &Theme) -> Vec<Token> {
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect();

    let mut collector = Collector {
        source,
        line_starts,
        theme,
        tokens: Vec::with_capacity(source.len() / 4),
        parens: Vec::new(),
        braces: Vec::new(),
    };
    for leaf in Leaves::new(tree.root_node()) {
        collector.visit_leaf(leaf);
    }
    collector.tokens
}

impl Collector<'_> {
    fn visit_leaf(&mut self, node: Node) {
        let source = self.source;
        let (start, end) = (node.start_byte(), node.end_byte());
        let Some(text) = source.get(start..end) else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }
        let parent = node.parent();
        let parent_kind = parent.map_or("", |p| p.kind());

        match node.kind() {
            "identifier" => {
                let kind = match parent_kind {
                    "function_declarator" => TokenKind::Function,
                    "call_expression" => TokenKind::FunctionCall,
                    "preproc_function_def" => TokenKind::PreprocIdentFunc,
                    "preproc_def" | "preproc_ifdef" | "preproc_defined" => TokenKind::PreprocIdent,
                    _ => TokenKind::Ident,
                };
                self.push_span(start, end, kind);
            }
            "number_literal" => {
                self.push_pieces(start, subtoken::classify_number_literal(text));
            }
            "string_content" => {
                let grandparent = parent.and_then(|p| p.parent()).map_or("", |g| g.kind());
                if grandparent == "preproc_include" {
                    self.push_span(start, end, TokenKind::SystemLibString);
                } else {
                    self.push_pieces(start, subtoken::classify_string_content(text));
                }
            }
            "preproc_arg" if parent_kind == "preproc_def" => {
                self.push_span(start, end, TokenKind::PreprocArg);
            }
            "preproc_arg" => {
                self.push_pieces(start, subtoken::tokenize_macro_body(text));
            }
            kind => {
                let kind = self.leaf_kind(kind, text, parent_kind);
                self.push_span(start, end, kind);
            }
        }
    }

    fn leaf_kind(&mut self, kind: &str, text: &str, parent_kind: &str) -> TokenKind {
        match kind {
            "comment" => TokenKind::Comment,
            "string_literal" | "raw_string_literal" => TokenKind::StringLiteral,
            k if DIRECTIVES.contains(&k) => TokenKind::Preproc,
            "preproc_directive" => match text.trim_end() {
                "#warning" => TokenKind::PreprocWar,
                "#error" => TokenKind::PreprocErr,
                _ => TokenKind::Preproc,
            },
            "defined" => TokenKind::Preproc,
            "system_lib_string" => TokenKind::SystemLibString,
            "field_identifier" if matches!(parent_kind, "field_expression" | "field_designator") => {
                TokenKind::IdentSub
            }
            "escape_sequence" => TokenKind::StringSeq,
            "typedef" | "primitive_type" => TokenKind::PrimitiveType,
            "type_identifier" => TokenKind::NewType,
            "character" if parent_kind == "char_literal" => TokenKind::CharLiteral,
            "'" => TokenKind::StringLiteral,
            "NULL" | "nullptr" => TokenKind::Null,
            k if CONTROL_KEYWORDS.contains(&k) => TokenKind::Keywords1,
            k if STORAGE_KEYWORDS.contains(&k) => TokenKind::Keywords2,
            "sizeof" => TokenKind::FunctionCall,
            "statement_identifier" => TokenKind::Keywords1,
            "(" => subtoken::open(&mut self.parens),
            ")" => subtoken::close(&mut self.parens),
            "{" => subtoken::open(&mut self.braces),
            "}" => subtoken::close(&mut self.braces),
            "\"" => TokenKind::Quote,
            _ => TokenKind::Default,
        }
    }

    fn push_pieces(&mut self, base: usize, pieces: Vec<Piece>) {
        for (start, end, kind) in pieces {
            self.push_span(base + start, base + end, kind);
        }
    }

    /// Pushes a byte span, split into one token per covered line.
    fn push_span(&mut self, start: usize, end: usize, kind: TokenKind) {
        let mut row = self.line_starts.partition_point(|&s| s <= start).saturating_sub(1);
        let mut pos = start;
        let color = self.theme.color(kind);

        while pos < end && row < self.line_starts.len() {
            let line_start = self.line_starts[row];
            let line_end = self
                .line_starts
                .get(row + 1)
                .map_or(self.source.len(), |&next| next - 1);
            let seg_end = end.min(line_end);

            if seg_end > pos {
                if let (Some(before), Some(segment)) =
                    (self.source.get(line_start..pos), self.source.get(pos..seg_end))
                {
                    self.tokens.push(Token {
                        line: row,
                        column: before.chars().count(),
                        length: segment.chars().count(),
                        kind,
                        color,
                    });
                }
            }

            row += 1;
            match self.line_starts.get(row) {
                Some(&next) => pos = next,
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TextBuffer;
    use crate::cursor::CursorPosition;

    fn tokenize(source: &str) -> Vec<Token> {
        TreeSitterTokenizer::new(Language::C).tokenize_full(source)
    }

    fn at(tokens: &[Token], line: usize, column: usize) -> Option<TokenKind> {
        tokens
            .iter()
            .find(|t| t.line == line && t.column == column)
            .map(|t| t.kind)
    }

    #[test]
    fn test_function_definition() {
        let tokens = tokenize("int main() {\n  return 0;\n}");
        assert_eq!(at(&tokens, 0, 0), Some(TokenKind::PrimitiveType));
        assert_eq!(at(&tokens, 0, 4), Some(TokenKind::Function));
        assert_eq!(at(&tokens, 0, 8), Some(TokenKind::Paren1));
        assert_eq!(at(&tokens, 0, 9), Some(TokenKind::Paren1));
        assert_eq!(at(&tokens, 0, 11), Some(TokenKind::Paren1));
        assert_eq!(at(&tokens, 1, 2), Some(TokenKind::Keywords1));
        assert_eq!(at(&tokens, 1, 9), Some(TokenKind::NumberLiteral));
        assert_eq!(at(&tokens, 2, 0), Some(TokenKind::Paren1));

        let main = tokens.iter().find(|t| t.kind == TokenKind::Function).unwrap();
        assert_eq!(main.length, 4);
        assert_eq!(main.color, Theme::dark().color(TokenKind::Function));
    }

    #[test]
    fn test_nested_parens_cycle_colors() {
        let tokens = tokenize("int x = ((1));");
        assert_eq!(at(&tokens, 0, 8), Some(TokenKind::Paren1));
        assert_eq!(at(&tokens, 0, 9), Some(TokenKind::Paren2));
        assert_eq!(at(&tokens, 0, 11), Some(TokenKind::Paren2));
        assert_eq!(at(&tokens, 0, 12), Some(TokenKind::Paren1));
    }

    #[test]
    fn test_block_comment_split_per_line() {
        let tokens = tokenize("/* a\n   b */\nint x;");
        let comments: Vec<&Token> = tokens.iter().filter(|t| t.kind == TokenKind::Comment).collect();
        assert_eq!(comments.len(), 2);
        assert_eq!((comments[0].line, comments[0].column, comments[0].length), (0, 0, 4));
        assert_eq!((comments[1].line, comments[1].column, comments[1].length), (1, 0, 7));
        assert_eq!(at(&tokens, 2, 0), Some(TokenKind::PrimitiveType));
    }

    #[test]
    fn test_call_and_format_string() {
        let source = "void f(int x) {\n  printf(\"%d items\", x);\n}";
        let tokens = tokenize(source);
        assert_eq!(at(&tokens, 1, 2), Some(TokenKind::FunctionCall));
        assert_eq!(at(&tokens, 1, 9), Some(TokenKind::Quote));
        assert_eq!(at(&tokens, 1, 10), Some(TokenKind::FormatSpecifier));
        assert_eq!(at(&tokens, 1, 12), Some(TokenKind::StringLiteral));
    }

    #[test]
    fn test_number_literal_parts() {
        let tokens = tokenize("int x = 0x1Fu;");
        assert_eq!(at(&tokens, 0, 8), Some(TokenKind::NumberLiteralDark));
        assert_eq!(at(&tokens, 0, 10), Some(TokenKind::NumberLiteral));
        assert_eq!(at(&tokens, 0, 12), Some(TokenKind::NumberLiteralDark));
    }

    #[test]
    fn test_grammars_load() {
        let c = TreeSitterTokenizer::try_new(Language::C).unwrap();
        assert_eq!(c.language(), Language::C);
        let cpp = TreeSitterTokenizer::try_new(Language::Cpp).unwrap();
        assert_eq!(cpp.language(), Language::Cpp);

        let mut fallback = TreeSitterTokenizer::new(Language::C);
        assert!(!fallback.tokenize_full("int value;").is_empty());
    }

    #[test]
    fn test_preprocessor() {
        let source = "#include <stdio.h>\n#define N 10\n#define SQ(a) ((a) * (a))\n";
        let tokens = tokenize(source);
        assert_eq!(at(&tokens, 0, 0), Some(TokenKind::Preproc));
        assert_eq!(at(&tokens, 0, 9), Some(TokenKind::SystemLibString));
        assert_eq!(at(&tokens, 1, 8), Some(TokenKind::PreprocIdent));
        assert_eq!(at(&tokens, 1, 10), Some(TokenKind::PreprocArg));
        assert_eq!(at(&tokens, 2, 8), Some(TokenKind::PreprocIdentFunc));
        assert!(tokens
            .iter()
            .any(|t| t.line == 2 && t.kind == TokenKind::PreprocIdentVar));
    }

    #[test]
    fn test_columns_count_characters() {
        let tokens = tokenize("/* é */ int y;");
        assert_eq!(at(&tokens, 0, 8), Some(TokenKind::PrimitiveType));
    }

    #[test]
    fn test_no_token_crosses_lines() {
        let source = "int a; /* one\ntwo\nthree */ int b;\nchar *s = \"x\";";
        let buffer = TextBuffer::from_text(source);
        for token in tokenize(source) {
            assert!(token.end_column() <= buffer.line_len(token.line), "{token:?}");
        }
    }

    #[test]
    fn test_incremental_matches_full() {
        let mut buffer = TextBuffer::from_text("int x;\nint y;");
        let mut tokenizer = TreeSitterTokenizer::new(Language::C);
        tokenizer.tokenize_full(&buffer.content());

        buffer.insert_text(CursorPosition::new(1, 0), "long ");
        buffer.insert_char(CursorPosition::new(0, 5), '2');
        let edits = buffer.take_pending_edits();
        let incremental = tokenizer.tokenize_incremental(&buffer.content(), &edits);

        assert_eq!(incremental, tokenize(&buffer.content()));
        assert_eq!(at(&incremental, 1, 0), Some(TokenKind::Keywords2));
    }

    #[test]
    fn test_plain_text_and_empty_input() {
        let mut plain = TreeSitterTokenizer::new(Language::PlainText);
        assert!(plain.tokenize_full("int x;").is_empty());
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_malformed_input_does_not_fail() {
        let tokens = tokenize("int (( { ;; \"unterminated");
        assert!(tokens.iter().all(|t| t.line == 0));
    }
}
