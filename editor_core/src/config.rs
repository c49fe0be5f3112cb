//! Editor configuration.

use crate::error::ConfigError;
use crate::history::DEFAULT_MAX_UNDO;
use crate::store::EvictionPolicy;
use std::time::Duration;

/// Inactivity window that closes a typing or deleting run.
pub const TYPING_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Quiet period after the last edit before the semantic index is refreshed.
pub const SEMANTIC_DEBOUNCE: Duration = Duration::from_millis(500);

/// Entries kept in the global token cache.
pub const TOKEN_CACHE_CAPACITY: usize = 10;

/// Entries kept in the semantic cache.
pub const SEMANTIC_CACHE_CAPACITY: usize = 5;

/// Settings consumed when an editor is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    /// Coalescing window for typing and deleting runs.
    pub typing_debounce: Duration,
    /// Quiet period before semantic re-indexing after edits.
    pub semantic_debounce: Duration,
    /// Undo/redo stack capacity.
    pub max_undo: usize,
    /// Bound of the content-hash token cache.
    pub token_cache_capacity: usize,
    /// Bound of the content-hash semantic cache.
    pub semantic_cache_capacity: usize,
    /// What the bounded caches do on overflow.
    pub eviction: EvictionPolicy,
    /// Spaces inserted for a tab.
    pub tab_width: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            typing_debounce: TYPING_DEBOUNCE,
            semantic_debounce: SEMANTIC_DEBOUNCE,
            max_undo: DEFAULT_MAX_UNDO,
            token_cache_capacity: TOKEN_CACHE_CAPACITY,
            semantic_cache_capacity: SEMANTIC_CACHE_CAPACITY,
            eviction: EvictionPolicy::ClearAll,
            tab_width: 4,
        }
    }
}

impl EditorConfig {
    pub fn with_typing_debounce(mut self, window: Duration) -> Self {
        self.typing_debounce = window;
        self
    }

    pub fn with_semantic_debounce(mut self, window: Duration) -> Self {
        self.semantic_debounce = window;
        self
    }

    pub fn with_max_undo(mut self, max_undo: usize) -> Self {
        self.max_undo = max_undo;
        self
    }

    pub fn with_cache_capacities(mut self, tokens: usize, semantic: usize) -> Self {
        self.token_cache_capacity = tokens;
        self.semantic_cache_capacity = semantic;
        self
    }

    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    pub fn with_tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = tab_width;
        self
    }

    /// Checks that every bound is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_undo == 0 {
            return Err(ConfigError::ZeroCapacity("max_undo"));
        }
        if self.token_cache_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("token_cache_capacity"));
        }
        if self.semantic_cache_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("semantic_cache_capacity"));
        }
        Ok(())
    }
}
