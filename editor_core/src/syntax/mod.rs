//! Syntax highlighting module.
//!
//! Turns C and C++ source into colored tokens using tree-sitter, with regex
//! refinement of literals and macro bodies.

mod language;
pub mod subtoken;
mod theme;
mod token;
mod tokenizer;

pub use language::Language;
pub use theme::{Color, Theme};
pub use token::{Token, TokenKind, PAREN_KINDS};
pub use tokenizer::{Tokenizer, TreeSitterTokenizer};
