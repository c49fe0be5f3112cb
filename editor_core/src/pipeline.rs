//! Background highlight pipeline.
//!
//! Tokenization runs on a worker thread, one task at a time. Each task works
//! on a copy of the buffer text and the edits drained at launch, and is
//! stamped with the buffer version it was computed against. The owning thread
//! polls once per frame; a result whose stamp no longer matches the live
//! version is dropped, and the latest state is requested again if edits
//! arrived while the task ran.

use crate::buffer::{ContentVersion, LineSplice, TextBuffer};
use crate::stats::PipelineStats;
use crate::store::{scoped_hash, TokenStore};
use crate::syntax::{Token, Tokenizer};
use crate::task::{BackgroundTask, TaskPoll};
use std::iter;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunKind {
    CacheHit,
    CacheMiss,
    Incremental,
}

struct HighlightOutcome {
    tokens: Arc<Vec<Token>>,
    kind: RunKind,
    elapsed: Duration,
}

struct InFlight {
    version: ContentVersion,
    task: BackgroundTask<HighlightOutcome>,
}

type SharedTokenizer = Arc<Mutex<Box<dyn Tokenizer>>>;

/// Produces per-line token buckets for a buffer without blocking edits.
pub struct HighlightPipeline {
    tokenizer: SharedTokenizer,
    store: Arc<TokenStore>,
    /// Tokens of the last applied result, one bucket per buffer line, each
    /// sorted by column. `None` marks a line edited since that result.
    buckets: Vec<Option<Vec<Token>>>,
    in_flight: Option<InFlight>,
    /// A request arrived while a task was running.
    dirty: bool,
    stats: PipelineStats,
}

impl HighlightPipeline {
    pub fn new(tokenizer: Box<dyn Tokenizer>, store: Arc<TokenStore>) -> Self {
        Self {
            tokenizer: Arc::new(Mutex::new(tokenizer)),
            store,
            buckets: Vec::new(),
            in_flight: None,
            dirty: false,
            stats: PipelineStats::new(),
        }
    }

    /// Swaps the tokenizer, e.g. after the language changed. Takes effect for
    /// the next task.
    pub fn set_tokenizer(&mut self, tokenizer: Box<dyn Tokenizer>) {
        self.tokenizer = Arc::new(Mutex::new(tokenizer));
    }

    /// Requests tokenization of the buffer's current state.
    ///
    /// While a task is running this only marks the pipeline dirty; queued
    /// edits stay in the buffer until the follow-up request drains them.
    pub fn request(&mut self, buffer: &mut TextBuffer) {
        if self.in_flight.is_some() {
            if !self.dirty {
                log::debug!("highlight task in flight, marking dirty");
            }
            self.dirty = true;
            return;
        }

        let version = buffer.version();
        let text = buffer.content();
        let edits = buffer.take_pending_edits();
        let tokenizer = Arc::clone(&self.tokenizer);
        let store = Arc::clone(&self.store);

        let spawned = BackgroundTask::spawn("highlight", move || {
            let started = Instant::now();
            let mut tokenizer = lock_tokenizer(&tokenizer);

            if !edits.is_empty() {
                let tokens = tokenizer.tokenize_incremental(&text, &edits);
                return HighlightOutcome {
                    tokens: Arc::new(tokens),
                    kind: RunKind::Incremental,
                    elapsed: started.elapsed(),
                };
            }

            let key = scoped_hash(&tokenizer.language(), &text);
            if let Some(tokens) = store.get(key) {
                // the tokenizer never saw this text
                tokenizer.invalidate();
                return HighlightOutcome {
                    tokens,
                    kind: RunKind::CacheHit,
                    elapsed: started.elapsed(),
                };
            }
            let tokens = Arc::new(tokenizer.tokenize_full(&text));
            store.insert(key, Arc::clone(&tokens));
            HighlightOutcome {
                tokens,
                kind: RunKind::CacheMiss,
                elapsed: started.elapsed(),
            }
        });

        match spawned {
            Ok(task) => {
                log::debug!("highlight task launched at version {version}");
                self.in_flight = Some(InFlight { version, task });
            }
            Err(err) => {
                log::warn!("failed to spawn highlight worker: {err}");
                self.abandon_edits();
            }
        }
    }

    /// The edits drained for a task that never ran are gone, so the
    /// tokenizer's retained tree no longer matches the buffer.
    fn abandon_edits(&self) {
        lock_tokenizer(&self.tokenizer).invalidate();
    }

    /// Applies a finished result if it matches the buffer's version.
    /// Returns true if the buckets were replaced.
    pub fn poll(&mut self, buffer: &mut TextBuffer) -> bool {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return false;
        };
        let stamped = in_flight.version;
        let outcome = match in_flight.task.poll() {
            TaskPoll::Pending => return false,
            TaskPoll::Ready(outcome) => Some(outcome),
            TaskPoll::Failed => None,
        };
        self.in_flight = None;

        let applied = match outcome {
            Some(outcome) => {
                self.record(&outcome);
                if stamped == buffer.version() {
                    self.distribute(&outcome.tokens, buffer.line_count());
                    self.stats.applied += 1;
                    log::trace!("applied {} tokens at version {stamped}", outcome.tokens.len());
                    true
                } else {
                    self.stats.stale_discards += 1;
                    log::debug!(
                        "discarding tokens for version {stamped}, buffer is at {}",
                        buffer.version()
                    );
                    false
                }
            }
            None => {
                self.stats.failures += 1;
                log::warn!("highlight task produced no result");
                false
            }
        };

        if self.dirty {
            self.dirty = false;
            self.stats.dirty_requests += 1;
            log::debug!("re-requesting highlight for version {}", buffer.version());
            self.request(buffer);
        }
        applied
    }

    fn record(&mut self, outcome: &HighlightOutcome) {
        self.stats.runs.record(outcome.elapsed);
        match outcome.kind {
            RunKind::CacheHit => self.stats.cache_hits += 1,
            RunKind::CacheMiss => self.stats.cache_misses += 1,
            RunKind::Incremental => self.stats.incremental_runs += 1,
        }
    }

    fn distribute(&mut self, tokens: &[Token], line_count: usize) {
        let mut buckets = vec![Vec::new(); line_count];
        for token in tokens {
            if let Some(bucket) = buckets.get_mut(token.line) {
                bucket.push(*token);
            }
        }
        self.buckets = buckets
            .into_iter()
            .map(|mut bucket| {
                bucket.sort_by_key(|token| token.column);
                Some(bucket)
            })
            .collect();
    }

    /// Keeps buckets aligned with buffer lines after an edit. Replaced lines
    /// lose their tokens until the next result arrives.
    pub fn apply_splice(&mut self, splice: LineSplice) {
        if self.buckets.is_empty() {
            return;
        }
        let end = (splice.start + splice.removed).min(self.buckets.len());
        let start = splice.start.min(end);
        self.buckets
            .splice(start..end, iter::repeat(None).take(splice.inserted));
    }

    /// Tokens of a line from the last applied result, or `None` if no result
    /// covers the line's current text. An empty slice is a line without
    /// tokens.
    pub fn line_tokens(&self, line: usize) -> Option<&[Token]> {
        self.buckets.get(line)?.as_deref()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Drops all buckets, e.g. when the language changed.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True when nothing is running and nothing is waiting to run.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none() && !self.dirty
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }
}

/// Locks the tokenizer. A worker that panicked mid-parse leaves its retained
/// tree in an unknown state, so it is dropped before reuse.
fn lock_tokenizer(tokenizer: &SharedTokenizer) -> MutexGuard<'_, Box<dyn Tokenizer>> {
    match tokenizer.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tokenizer.clear_poison();
            let mut guard = poisoned.into_inner();
            guard.invalidate();
            guard
        }
    }
}
