//! mut core - Source buffer with incremental, asynchronous highlighting.
//!
//! This crate holds the line buffer and its editing session, the background
//! syntax and semantic pipelines, and the per-line caches read by rendering.
//! It has no dependency on a windowing or drawing system.

pub mod buffer;
pub mod config;
pub mod cursor;
pub mod editor;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod search;
pub mod semantic;
pub mod session;
pub mod stats;
pub mod store;
pub mod syntax;
pub mod task;
pub mod viewport;

pub use buffer::{BufferChange, ByteRangeEdit, LineSplice, TextBuffer};
pub use config::EditorConfig;
pub use cursor::{Cursor, CursorPosition, Selection};
pub use editor::{EditorStores, RenderLine, RenderSpan, TextEditor};
pub use error::{ConfigError, SyntaxError};
pub use history::{Snapshot, UndoHistory};
pub use pipeline::HighlightPipeline;
pub use search::{Search, SearchMatch};
pub use semantic::{SemanticOverlay, Symbol, SymbolIndexer, SymbolKind, TreeSitterIndexer};
pub use session::{EditSession, SessionState};
pub use stats::{PipelineStats, RollingStats};
pub use store::{EvictionPolicy, SemanticStore, TokenStore};
pub use syntax::{Color, Language, Theme, Token, TokenKind, Tokenizer, TreeSitterTokenizer};
pub use viewport::{LineCache, Viewport, ViewportLineCache};
