//! Error types.

use thiserror::Error;

/// Errors from parsing or validating configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An eviction policy name was not recognized.
    #[error("unknown eviction policy: {0} (expected 'clear-all' or 'lru')")]
    UnknownEviction(String),

    /// A capacity that must be positive was zero.
    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),
}

/// Failures inside the tree-sitter backends. These never reach callers of the
/// pipelines; they are logged and turned into empty results.
#[derive(Debug, Error)]
pub enum SyntaxError {
    /// The grammar could not be loaded into the parser.
    #[error("failed to load grammar for {language}: {source}")]
    Language {
        language: &'static str,
        #[source]
        source: tree_sitter::LanguageError,
    },

    /// The parser returned no tree.
    #[error("parser produced no tree")]
    NoTree,

    /// The language has no parser.
    #[error("no grammar for plain text")]
    Unsupported,
}
