//! Regex-driven splitting of single parser leaves into finer tokens.
//!
//! All functions return `(start, end, kind)` byte ranges relative to the
//! fragment they were given. When a pattern fails to compile the fragment
//! comes back as one plain piece.

use super::token::{TokenKind, PAREN_KINDS};
use regex::Regex;
use std::sync::OnceLock;

/// A byte range of a fragment and its kind.
pub type Piece = (usize, usize, TokenKind);

const CONTROL_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "break", "continue", "return", "goto",
];

const STORAGE_KEYWORDS: &[&str] = &[
    "static", "const", "extern", "register", "auto", "volatile", "inline", "restrict", "typedef",
];

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            log::warn!("failed to compile sub-token pattern: {err}");
            None
        }
    })
    .as_ref()
}

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        fn $name() -> Option<&'static Regex> {
            static CELL: OnceLock<Option<Regex>> = OnceLock::new();
            compiled(&CELL, $re)
        }
    };
}

pattern!(hex_number, r"^0[xX]([0-9a-fA-F']+)([uUlL]*)$");
pattern!(bin_number, r"^0[bB]([01']+)([uUlL]*)$");
pattern!(oct_number, r"^0([0-7']+)([uUlL]*)$");
pattern!(float_number, r"^([0-9]*\.[0-9]+([eE][+-]?[0-9]+)?)([fFlL]*)$");
pattern!(suffixed_int, r"^([0-9][0-9']*)([uUlL]+)$");
pattern!(string_special, r#"(%[-+#0-9.]*[a-zA-Z])|(\\[\\'"abfnrtv])"#);
pattern!(
    macro_token,
    r#"("([^"\\]|\\.)*")|(0[xX][0-9a-fA-F']+[uUlL]*|0[bB][01']+[uUlL]*|0[0-7']+[uUlL]*|[0-9]*\.[0-9]+([eE][+-]?[0-9]+)?[fFlL]*|[0-9][0-9']*[uUlL]*|[a-zA-Z_]\w*|[(){}\[\]+\-*/%&|^~!=<>?:,.;#]|\\|\.\.\.)"#
);
pattern!(macro_string, r#"^"([^"\\]|\\.)*"$"#);
pattern!(
    macro_number,
    r"^(0[xX][0-9a-fA-F']+[uUlL]*|0[bB][01']+[uUlL]*|0[0-7']+[uUlL]*|[0-9]*\.[0-9]+([eE][+-]?[0-9]+)?[fFlL]*|[0-9][0-9']*[uUlL]*)$"
);
pattern!(macro_ident, r"^[a-zA-Z_]\w*$");

/// Splits a number literal into radix prefix, digits and suffix.
///
/// Prefixes (`0x`, `0b`, the leading `0` of an octal) and suffixes get
/// [`TokenKind::NumberLiteralDark`]; digits get [`TokenKind::NumberLiteral`].
pub fn classify_number_literal(text: &str) -> Vec<Piece> {
    let whole = vec![(0, text.len(), TokenKind::NumberLiteral)];

    for (re, prefix_len) in [(hex_number(), 2), (bin_number(), 2), (oct_number(), 1)] {
        let Some(caps) = re.and_then(|re| re.captures(text)) else {
            continue;
        };
        let mut pieces = vec![(0, prefix_len, TokenKind::NumberLiteralDark)];
        if let Some(digits) = caps.get(1) {
            pieces.push((digits.start(), digits.end(), TokenKind::NumberLiteral));
        }
        if let Some(suffix) = caps.get(2).filter(|m| !m.is_empty()) {
            pieces.push((suffix.start(), suffix.end(), TokenKind::NumberLiteralDark));
        }
        return pieces;
    }

    if let Some(caps) = float_number().and_then(|re| re.captures(text)) {
        let mut pieces = Vec::new();
        if let Some(mantissa) = caps.get(1) {
            pieces.push((mantissa.start(), mantissa.end(), TokenKind::NumberLiteral));
        }
        if let Some(suffix) = caps.get(3).filter(|m| !m.is_empty()) {
            pieces.push((suffix.start(), suffix.end(), TokenKind::NumberLiteralDark));
        }
        return pieces;
    }

    if let Some(caps) = suffixed_int().and_then(|re| re.captures(text)) {
        if let (Some(digits), Some(suffix)) = (caps.get(1), caps.get(2)) {
            return vec![
                (digits.start(), digits.end(), TokenKind::NumberLiteral),
                (suffix.start(), suffix.end(), TokenKind::NumberLiteralDark),
            ];
        }
    }

    whole
}

/// Splits string content into plain text, format specifiers and escapes.
pub fn classify_string_content(text: &str) -> Vec<Piece> {
    let Some(re) = string_special() else {
        return vec![(0, text.len(), TokenKind::StringLiteral)];
    };

    let mut pieces = Vec::new();
    let mut last = 0;
    for m in re.find_iter(text) {
        if m.start() > last {
            pieces.push((last, m.start(), TokenKind::StringLiteral));
        }
        let kind = if m.as_str().starts_with('%') {
            TokenKind::FormatSpecifier
        } else {
            TokenKind::EscapedChar
        };
        pieces.push((m.start(), m.end(), kind));
        last = m.end();
    }
    if last < text.len() {
        pieces.push((last, text.len(), TokenKind::StringLiteral));
    }
    pieces
}

/// Tokenizes the body of a function-like macro, which the parser leaves as
/// one opaque argument.
pub fn tokenize_macro_body(fragment: &str) -> Vec<Piece> {
    let Some(re) = macro_token() else {
        return vec![(0, fragment.len(), TokenKind::Default)];
    };

    let mut parens: Vec<TokenKind> = Vec::new();
    let mut braces: Vec<TokenKind> = Vec::new();
    let mut pieces = Vec::new();

    for m in re.find_iter(fragment) {
        let token = m.as_str();
        let kind = match token {
            "(" => open(&mut parens),
            ")" => close(&mut parens),
            "{" => open(&mut braces),
            "}" => close(&mut braces),
            _ if matches(macro_string(), token) => TokenKind::StringLiteral,
            _ if matches(macro_number(), token) => {
                let lower = token.to_ascii_lowercase();
                if lower.starts_with("0x")
                    || lower.starts_with("0b")
                    || lower.ends_with(['u', 'l'])
                {
                    TokenKind::NumberLiteralDark
                } else {
                    TokenKind::NumberLiteral
                }
            }
            _ if matches(macro_ident(), token) => {
                if CONTROL_KEYWORDS.contains(&token) {
                    TokenKind::Keywords1
                } else if STORAGE_KEYWORDS.contains(&token) {
                    TokenKind::Keywords2
                } else if fragment[m.end()..].trim_start().starts_with('(') {
                    TokenKind::PreprocIdentFunc
                } else {
                    TokenKind::PreprocIdentVar
                }
            }
            _ => TokenKind::PreprocOp,
        };
        pieces.push((m.start(), m.end(), kind));
    }
    pieces
}

fn matches(re: Option<&Regex>, text: &str) -> bool {
    re.is_some_and(|re| re.is_match(text))
}

/// Pushes a new nesting level and returns its rainbow color.
pub fn open(stack: &mut Vec<TokenKind>) -> TokenKind {
    let kind = PAREN_KINDS[stack.len() % PAREN_KINDS.len()];
    stack.push(kind);
    kind
}

/// Pops a nesting level. An unmatched closer gets the first color.
pub fn close(stack: &mut Vec<TokenKind>) -> TokenKind {
    stack.pop().unwrap_or(PAREN_KINDS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str, pieces: &[Piece]) -> Vec<(String, TokenKind)> {
        pieces
            .iter()
            .map(|&(s, e, k)| (text[s..e].to_string(), k))
            .collect()
    }

    #[test]
    fn test_hex_number_parts() {
        let text = "0xFFul";
        assert_eq!(
            kinds(text, &classify_number_literal(text)),
            vec![
                ("0x".to_string(), TokenKind::NumberLiteralDark),
                ("FF".to_string(), TokenKind::NumberLiteral),
                ("ul".to_string(), TokenKind::NumberLiteralDark),
            ]
        );
    }

    #[test]
    fn test_octal_float_and_plain_numbers() {
        let octal = classify_number_literal("017");
        assert_eq!(octal, vec![(0, 1, TokenKind::NumberLiteralDark), (1, 3, TokenKind::NumberLiteral)]);

        let float = "3.14f";
        assert_eq!(
            kinds(float, &classify_number_literal(float)),
            vec![
                ("3.14".to_string(), TokenKind::NumberLiteral),
                ("f".to_string(), TokenKind::NumberLiteralDark),
            ]
        );

        assert_eq!(classify_number_literal("42"), vec![(0, 2, TokenKind::NumberLiteral)]);
        assert_eq!(
            classify_number_literal("10u"),
            vec![(0, 2, TokenKind::NumberLiteral), (2, 3, TokenKind::NumberLiteralDark)]
        );
    }

    #[test]
    fn test_string_content_specials() {
        let text = r"x=%5.2f\n done";
        assert_eq!(
            kinds(text, &classify_string_content(text)),
            vec![
                ("x=".to_string(), TokenKind::StringLiteral),
                ("%5.2f".to_string(), TokenKind::FormatSpecifier),
                (r"\n".to_string(), TokenKind::EscapedChar),
                (" done".to_string(), TokenKind::StringLiteral),
            ]
        );
    }

    #[test]
    fn test_plain_string_content() {
        assert_eq!(classify_string_content("hello"), vec![(0, 5, TokenKind::StringLiteral)]);
        assert!(classify_string_content("").is_empty());
    }

    #[test]
    fn test_macro_body() {
        let body = "((a) + max(b, 0x1F))";
        let pieces = kinds(body, &tokenize_macro_body(body));
        assert_eq!(pieces[0], ("(".to_string(), TokenKind::Paren1));
        assert_eq!(pieces[1], ("(".to_string(), TokenKind::Paren2));
        assert_eq!(pieces[2], ("a".to_string(), TokenKind::PreprocIdentVar));
        assert_eq!(pieces[3], (")".to_string(), TokenKind::Paren2));
        assert_eq!(pieces[4], ("+".to_string(), TokenKind::PreprocOp));
        assert_eq!(pieces[5], ("max".to_string(), TokenKind::PreprocIdentFunc));
        assert_eq!(pieces[6], ("(".to_string(), TokenKind::Paren2));
        assert_eq!(pieces[9], ("0x1F".to_string(), TokenKind::NumberLiteralDark));
        assert_eq!(pieces.last().unwrap(), &(")".to_string(), TokenKind::Paren1));
    }

    #[test]
    fn test_macro_body_keywords_and_strings() {
        let body = r#"do { if (x) return "s\"q"; } while (0)"#;
        let pieces = kinds(body, &tokenize_macro_body(body));
        assert_eq!(pieces[0], ("do".to_string(), TokenKind::Keywords1));
        assert!(pieces.contains(&(r#""s\"q""#.to_string(), TokenKind::StringLiteral)));
        assert!(pieces.contains(&("0".to_string(), TokenKind::NumberLiteral)));
    }

    #[test]
    fn test_unmatched_closer_uses_first_color() {
        let mut stack = Vec::new();
        assert_eq!(close(&mut stack), TokenKind::Paren1);
        for _ in 0..8 {
            open(&mut stack);
        }
        assert_eq!(open(&mut stack), TokenKind::Paren1);
    }
}
