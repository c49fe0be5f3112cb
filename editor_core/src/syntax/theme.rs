//! Color table for token kinds and semantic overrides.

use super::token::TokenKind;
use crate::semantic::SymbolKind;
use std::collections::HashMap;

/// RGBA color represented as [r, g, b, a] with values 0.0-1.0.
pub type Color = [f32; 4];

/// A syntax highlighting theme.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Theme name.
    pub name: String,
    /// Background color.
    pub background: Color,
    /// Color of untyped text.
    pub foreground: Color,
    /// Colors for each token kind.
    colors: HashMap<TokenKind, Color>,
}

impl Theme {
    /// Creates a theme with no per-kind colors.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            background: [0.102, 0.102, 0.122, 1.0],
            foreground: [0.83, 0.83, 0.83, 1.0],
            colors: HashMap::new(),
        }
    }

    /// Sets the color for a token kind.
    pub fn set_color(&mut self, kind: TokenKind, color: Color) {
        self.colors.insert(kind, color);
    }

    /// Gets the color for a token kind, falling back to foreground.
    pub fn color(&self, kind: TokenKind) -> Color {
        self.colors.get(&kind).copied().unwrap_or(self.foreground)
    }

    /// Override color for a semantic symbol kind, if it has one.
    pub fn semantic_color(&self, kind: SymbolKind) -> Option<Color> {
        match kind {
            SymbolKind::FunctionDecl => Some([1.00, 0.80, 0.30, 1.0]),
            SymbolKind::VarDecl => Some([0.85, 0.85, 0.60, 1.0]),
            SymbolKind::ParmDecl => Some([0.70, 0.90, 0.90, 1.0]),
            SymbolKind::FieldDecl => Some([0.60, 0.90, 0.60, 1.0]),
            SymbolKind::MemberRefExpr => Some([0.60, 0.70, 1.00, 1.0]),
            SymbolKind::Other => None,
        }
    }

    /// The high-contrast dark theme.
    pub fn dark() -> Self {
        use TokenKind::*;

        let mut theme = Self::new("Dark");
        let table: [(TokenKind, Color); 37] = [
            (Preproc, [0.5, 0.5, 0.5, 1.0]),
            (PreprocErr, [1.0, 0.0, 0.0, 1.0]),
            (PreprocWar, [1.0, 1.0, 0.0, 1.0]),
            (SystemLibString, [1.0, 0.55, 0.0, 1.0]),
            (Quote, [1.0, 0.85, 0.0, 1.0]),
            (PreprocIdent, [0.9, 0.5, 1.0, 1.0]),
            (PreprocArg, [0.8, 1.0, 0.5, 1.0]),
            (PreprocArgCall, [0.5, 0.0, 1.0, 1.0]),
            (PreprocIdentFunc, [1.0, 1.0, 0.5, 1.0]),
            (PreprocIdentVar, [0.5, 0.75, 1.0, 1.0]),
            (PreprocOp, [0.83, 0.83, 0.83, 1.0]),
            (Ident, [0.5, 0.75, 1.0, 1.0]),
            (Keywords1, [0.9, 0.5, 1.0, 1.0]),
            (Keywords2, [0.45, 0.69, 0.70, 1.0]),
            (Comment, [0.0, 1.0, 0.0, 1.0]),
            (NumberLiteral, [0.8, 1.0, 0.5, 1.0]),
            (NumberLiteralDark, [0.5, 0.8, 0.3, 1.0]),
            (StringLiteral, [1.0, 0.55, 0.0, 1.0]),
            (StringSeq, [0.8, 1.0, 0.5, 1.0]),
            (FormatSpecifier, [0.5, 0.75, 1.0, 1.0]),
            (EscapedChar, [1.0, 0.85, 0.0, 1.0]),
            (PrimitiveType, [0.45, 0.69, 0.70, 1.0]),
            (Function, [1.0, 1.0, 0.0, 1.0]),
            (FunctionCall, [1.0, 1.0, 0.5, 1.0]),
            (CharLiteral, [1.0, 0.85, 0.0, 1.0]),
            (IdentSub, [0.7, 0.8, 1.0, 1.0]),
            (NewType, [0.4, 0.7, 0.2, 1.0]),
            (Null, [0.5, 0.0, 0.5, 1.0]),
            (Paren1, [1.0, 0.85, 0.0, 1.0]),
            (Paren2, [1.0, 0.5, 0.5, 1.0]),
            (Paren3, [1.0, 0.7, 0.5, 1.0]),
            (Paren4, [0.8, 0.8, 0.8, 1.0]),
            (Paren5, [0.5, 0.5, 0.8, 1.0]),
            (Paren6, [1.0, 0.5, 0.8, 1.0]),
            (Paren7, [0.8, 0.5, 0.8, 1.0]),
            (Paren8, [0.8, 0.8, 0.5, 1.0]),
            (Default, [0.83, 0.83, 0.83, 1.0]),
        ];
        for (kind, color) in table {
            theme.set_color(kind, color);
        }
        theme
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}
