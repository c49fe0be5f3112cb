//! Semantic symbol overlay.
//!
//! An indexer reports declaration sites and member references. The overlay
//! runs it in the background, independent of the highlight pipeline, and
//! exposes the result as a `(line, column) -> kind` table used to override
//! lexical colors at render time.

use crate::stats::PipelineStats;
use crate::store::{scoped_hash, BoundedCache, EvictionPolicy, SemanticStore};
use crate::syntax::Language;
use crate::task::{BackgroundTask, TaskPoll};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tree_sitter::{Node, Parser, TreeCursor};

/// Kind of symbol an indexer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    FunctionDecl,
    VarDecl,
    ParmDecl,
    FieldDecl,
    MemberRefExpr,
    Other,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FunctionDecl => "FunctionDecl",
            Self::VarDecl => "VarDecl",
            Self::ParmDecl => "ParmDecl",
            Self::FieldDecl => "FieldDecl",
            Self::MemberRefExpr => "MemberRefExpr",
            Self::Other => "Other",
        }
    }
}

/// A symbol at a 1-based line and 1-based character column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub line: usize,
    pub column: usize,
    pub kind: SymbolKind,
}

/// Symbol kinds keyed by 1-based `(line, column)`.
pub type SemanticMap = HashMap<(usize, usize), SymbolKind>;

/// The indexer contract. Failures produce an empty list.
pub trait SymbolIndexer: Send {
    fn index(&mut self, path: &Path, text: &str) -> Vec<Symbol>;
}

const TRANSLATION_CACHE_CAPACITY: usize = 4;

const DECLARATOR_WRAPPERS: &[&str] = &[
    "pointer_declarator",
    "array_declarator",
    "reference_declarator",
    "init_declarator",
    "parenthesized_declarator",
];

/// Tree-sitter based indexer for C and C++ declarations.
pub struct TreeSitterIndexer {
    parser: Parser,
    language: Option<Language>,
    /// Results by hash of (path, content).
    translations: BoundedCache<Arc<Vec<Symbol>>>,
}

impl Default for TreeSitterIndexer {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeSitterIndexer {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            language: None,
            translations: BoundedCache::new(TRANSLATION_CACHE_CAPACITY, EvictionPolicy::Lru),
        }
    }

    fn ensure_language(&mut self, language: Language) -> bool {
        if self.language == Some(language) {
            return true;
        }
        let Some(grammar) = language.tree_sitter_language() else {
            return false;
        };
        match self.parser.set_language(&grammar) {
            Ok(()) => {
                self.language = Some(language);
                true
            }
            Err(err) => {
                log::warn!("indexer cannot load {} grammar: {err}", language.name());
                false
            }
        }
    }
}

impl SymbolIndexer for TreeSitterIndexer {
    fn index(&mut self, path: &Path, text: &str) -> Vec<Symbol> {
        let key = scoped_hash(path, text);
        if let Some(symbols) = self.translations.get(key) {
            return symbols.as_ref().clone();
        }

        if !self.ensure_language(Language::from_path(path)) {
            return Vec::new();
        }
        let Some(tree) = self.parser.parse(text, None) else {
            log::warn!("indexer produced no tree for {}", path.display());
            return Vec::new();
        };

        let symbols: Vec<Symbol> = Nodes::new(tree.root_node())
            .filter_map(|node| declared_symbol(node, text))
            .collect();
        self.translations.insert(key, Arc::new(symbols.clone()));
        symbols
    }
}

/// Pre-order walk over every node.
struct Nodes<'tree> {
    cursor: TreeCursor<'tree>,
    done: bool,
}

impl<'tree> Nodes<'tree> {
    fn new(root: Node<'tree>) -> Self {
        Self {
            cursor: root.walk(),
            done: false,
        }
    }
}

impl<'tree> Iterator for Nodes<'tree> {
    type Item = Node<'tree>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let node = self.cursor.node();
        if !self.cursor.goto_first_child() {
            while !self.cursor.goto_next_sibling() {
                if !self.cursor.goto_parent() {
                    self.done = true;
                    break;
                }
            }
        }
        Some(node)
    }
}

/// Classifies an identifier node by the construct it names.
fn declared_symbol(node: Node, source: &str) -> Option<Symbol> {
    let kind = match node.kind() {
        "identifier" | "field_identifier" => symbol_kind(node)?,
        _ => return None,
    };
    let name = source.get(node.byte_range())?;
    let start = node.start_position();
    let line_start = node.start_byte() - start.column;
    let column = source.get(line_start..node.start_byte())?.chars().count() + 1;

    Some(Symbol {
        name: name.to_string(),
        line: start.row + 1,
        column,
        kind,
    })
}

fn symbol_kind(node: Node) -> Option<SymbolKind> {
    let direct = node.parent()?;
    if node.kind() == "field_identifier" && direct.kind() == "field_expression" {
        return (direct.child_by_field_name("field") == Some(node)).then_some(SymbolKind::MemberRefExpr);
    }

    // climb through declarator wrappers while the node is their declarator
    let mut current = node;
    let mut parent = direct;
    while DECLARATOR_WRAPPERS.contains(&parent.kind()) {
        if !is_declarator_of(parent, current) {
            return None;
        }
        current = parent;
        parent = parent.parent()?;
    }

    let named = is_declarator_of(parent, current);
    match parent.kind() {
        "function_declarator" if named => Some(SymbolKind::FunctionDecl),
        "parameter_declaration" if named => Some(SymbolKind::ParmDecl),
        "declaration" if named => Some(SymbolKind::VarDecl),
        "field_declaration" if named => Some(SymbolKind::FieldDecl),
        _ => None,
    }
}

/// Declarations may list several declarators (`int a, *b;`).
fn is_declarator_of(parent: Node, child: Node) -> bool {
    let mut cursor = parent.walk();
    let found = parent
        .children_by_field_name("declarator", &mut cursor)
        .any(|declarator| declarator == child);
    found
}

struct SemanticOutcome {
    table: Arc<SemanticMap>,
    cache_hit: bool,
    elapsed: Duration,
}

/// Background semantic indexing with its own pending state.
///
/// At most one task runs at a time. A request made while one is running
/// replaces the queued snapshot, which is launched when the running task
/// completes. Results are always applied: semantic coloring is advisory, so
/// there is no version gate.
pub struct SemanticOverlay {
    indexer: Arc<Mutex<Box<dyn SymbolIndexer>>>,
    store: Arc<SemanticStore>,
    path: PathBuf,
    table: Arc<SemanticMap>,
    task: Option<BackgroundTask<SemanticOutcome>>,
    queued: Option<String>,
    stats: PipelineStats,
}

impl SemanticOverlay {
    pub fn new(indexer: Box<dyn SymbolIndexer>, store: Arc<SemanticStore>) -> Self {
        Self {
            indexer: Arc::new(Mutex::new(indexer)),
            store,
            path: PathBuf::new(),
            table: Arc::new(SemanticMap::new()),
            task: None,
            queued: None,
            stats: PipelineStats::new(),
        }
    }

    /// Sets the path handed to the indexer.
    pub fn set_path(&mut self, path: &Path) {
        self.path = path.to_path_buf();
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Requests indexing of a snapshot of the buffer text.
    pub fn request(&mut self, text: String) {
        if self.task.is_some() {
            if self.queued.replace(text).is_none() {
                log::debug!("semantic task in flight, queueing request");
            }
            return;
        }
        self.launch(text);
    }

    fn launch(&mut self, text: String) {
        let indexer = Arc::clone(&self.indexer);
        let store = Arc::clone(&self.store);
        let path = self.path.clone();

        let spawned = BackgroundTask::spawn("semantic", move || {
            let started = Instant::now();
            // the indexer picks its grammar from the path
            let key = scoped_hash(path.as_path(), &text);
            if let Some(table) = store.get(key) {
                return SemanticOutcome {
                    table,
                    cache_hit: true,
                    elapsed: started.elapsed(),
                };
            }

            let symbols = indexer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .index(&path, &text);
            let table: SemanticMap = symbols
                .into_iter()
                .map(|symbol| ((symbol.line, symbol.column), symbol.kind))
                .collect();
            let table = Arc::new(table);
            store.insert(key, Arc::clone(&table));
            SemanticOutcome {
                table,
                cache_hit: false,
                elapsed: started.elapsed(),
            }
        });

        match spawned {
            Ok(task) => {
                log::debug!("semantic task launched for {}", self.path.display());
                self.task = Some(task);
            }
            Err(err) => log::warn!("failed to spawn semantic worker: {err}"),
        }
    }

    /// Applies a finished result, if any. Returns true if the table changed.
    pub fn poll(&mut self) -> bool {
        let Some(task) = self.task.as_mut() else {
            return false;
        };
        let applied = match task.poll() {
            TaskPoll::Pending => return false,
            TaskPoll::Ready(outcome) => {
                self.stats.runs.record(outcome.elapsed);
                if outcome.cache_hit {
                    self.stats.cache_hits += 1;
                } else {
                    self.stats.cache_misses += 1;
                }
                self.stats.applied += 1;
                log::debug!("semantic table replaced ({} symbols)", outcome.table.len());
                self.table = outcome.table;
                true
            }
            TaskPoll::Failed => {
                self.stats.failures += 1;
                log::warn!("semantic indexing failed; keeping previous table");
                false
            }
        };
        self.task = None;

        if let Some(text) = self.queued.take() {
            self.stats.dirty_requests += 1;
            self.launch(text);
        }
        applied
    }

    /// Symbol kind at a 1-based line and column.
    pub fn lookup(&self, line: usize, column: usize) -> Option<SymbolKind> {
        self.table.get(&(line, column)).copied()
    }

    /// The current lookup table.
    pub fn table(&self) -> &SemanticMap {
        &self.table
    }

    /// True when nothing is running or queued.
    pub fn is_idle(&self) -> bool {
        self.task.is_none() && self.queued.is_none()
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }
}
