//! Token kinds and positioned tokens.

use super::theme::Color;

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    NumberLiteral,
    /// Radix prefixes and type suffixes of numbers.
    NumberLiteralDark,
    StringLiteral,
    /// printf-style `%d`, `%-8.3f`, ...
    FormatSpecifier,
    /// Simple escapes inside string content.
    EscapedChar,
    /// Escape sequences as reported by the parser.
    StringSeq,
    PrimitiveType,
    /// A function name in a declarator.
    Function,
    FunctionCall,
    /// Field access (`a.b`, `.b = ...`).
    IdentSub,
    /// A user-defined type name.
    NewType,
    Null,
    Preproc,
    PreprocErr,
    PreprocWar,
    SystemLibString,
    PreprocIdent,
    PreprocArg,
    PreprocArgCall,
    PreprocIdentFunc,
    PreprocIdentVar,
    PreprocOp,
    /// Control-flow keywords.
    Keywords1,
    /// Storage and type keywords.
    Keywords2,
    Comment,
    CharLiteral,
    Paren1,
    Paren2,
    Paren3,
    Paren4,
    Paren5,
    Paren6,
    Paren7,
    Paren8,
    Quote,
    Default,
}

/// Rainbow colors cycled by nesting depth.
pub const PAREN_KINDS: [TokenKind; 8] = [
    TokenKind::Paren1,
    TokenKind::Paren2,
    TokenKind::Paren3,
    TokenKind::Paren4,
    TokenKind::Paren5,
    TokenKind::Paren6,
    TokenKind::Paren7,
    TokenKind::Paren8,
];

impl TokenKind {
    /// Stable lowercase name, used in color tables.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ident => "identifier",
            Self::NumberLiteral => "number",
            Self::NumberLiteralDark => "number_suffix",
            Self::StringLiteral => "string",
            Self::FormatSpecifier => "string_format",
            Self::EscapedChar => "string_escape_char",
            Self::StringSeq => "string_escape",
            Self::PrimitiveType => "primitive_type",
            Self::Function => "function",
            Self::FunctionCall => "function_call",
            Self::IdentSub => "field_identifier",
            Self::NewType => "type_name",
            Self::Null => "null_literal",
            Self::Preproc => "preprocessor",
            Self::PreprocErr => "preprocessor_error",
            Self::PreprocWar => "preprocessor_warning",
            Self::SystemLibString => "system_include_path",
            Self::PreprocIdent => "preprocessor_macro",
            Self::PreprocArg => "preprocessor_arg",
            Self::PreprocArgCall => "preprocessor_arg_call",
            Self::PreprocIdentFunc => "preprocessor_func",
            Self::PreprocIdentVar => "preprocessor_var",
            Self::PreprocOp => "preprocessor_op",
            Self::Keywords1 => "keyword_control",
            Self::Keywords2 => "keyword_type",
            Self::Comment => "comment",
            Self::CharLiteral => "char",
            Self::Paren1 => "rainbow_paren_1",
            Self::Paren2 => "rainbow_paren_2",
            Self::Paren3 => "rainbow_paren_3",
            Self::Paren4 => "rainbow_paren_4",
            Self::Paren5 => "rainbow_paren_5",
            Self::Paren6 => "rainbow_paren_6",
            Self::Paren7 => "rainbow_paren_7",
            Self::Paren8 => "rainbow_paren_8",
            Self::Quote => "string_quote",
            Self::Default => "default",
        }
    }
}

/// A colored span of one line.
///
/// `line` is 0-based; `column` and `length` count characters. Tokens never
/// cross a line break.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token {
    pub line: usize,
    pub column: usize,
    pub length: usize,
    pub kind: TokenKind,
    pub color: Color,
}

impl Token {
    /// Column just past the token.
    pub fn end_column(&self) -> usize {
        self.column + self.length
    }

    /// Returns true if `[column, column + length)` intersects `[start, end)`.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.column < end && self.end_column() > start
    }
}
