//! Background pipeline statistics.
//!
//! Timing of tokenize/index runs plus counters for cache behavior and
//! discarded work.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Maximum number of samples to keep for rolling averages.
const MAX_SAMPLES: usize = 64;

/// Rolling statistics for a timed operation.
#[derive(Debug, Clone)]
pub struct RollingStats {
    samples: VecDeque<Duration>,
    sum: Duration,
    max: Duration,
    total: u64,
}

impl Default for RollingStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RollingStats {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(MAX_SAMPLES),
            sum: Duration::ZERO,
            max: Duration::ZERO,
            total: 0,
        }
    }

    /// Records a new sample.
    pub fn record(&mut self, duration: Duration) {
        if self.samples.len() >= MAX_SAMPLES {
            if let Some(old) = self.samples.pop_front() {
                self.sum = self.sum.saturating_sub(old);
            }
        }
        self.samples.push_back(duration);
        self.sum += duration;
        self.max = self.max.max(duration);
        self.total += 1;
    }

    /// Number of samples ever recorded.
    pub fn count(&self) -> u64 {
        self.total
    }

    /// Average over the retained window.
    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            Duration::ZERO
        } else {
            self.sum / self.samples.len() as u32
        }
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Returns the most recent duration.
    pub fn last(&self) -> Duration {
        self.samples.back().copied().unwrap_or(Duration::ZERO)
    }

    pub fn average_ms(&self) -> f64 {
        self.average().as_secs_f64() * 1000.0
    }

    pub fn last_ms(&self) -> f64 {
        self.last().as_secs_f64() * 1000.0
    }
}

/// Counters for one background pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Duration of each completed run, cache hits included.
    pub runs: RollingStats,
    /// Requests answered from the content-hash store.
    pub cache_hits: u64,
    /// Requests that had to compute.
    pub cache_misses: u64,
    /// Requests that went straight to incremental parsing.
    pub incremental_runs: u64,
    /// Results dropped because the buffer moved on.
    pub stale_discards: u64,
    /// Requests issued on completion because a newer one arrived meanwhile.
    pub dirty_requests: u64,
    /// Results applied to the live state.
    pub applied: u64,
    /// Workers that died without a result.
    pub failures: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requests that reached a worker.
    pub fn launched(&self) -> u64 {
        self.cache_hits + self.cache_misses + self.incremental_runs
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} runs (avg {:.2}ms, last {:.2}ms), {} hits / {} misses / {} incremental, \
             {} applied, {} stale, {} re-requested, {} failed",
            self.runs.count(),
            self.runs.average_ms(),
            self.runs.last_ms(),
            self.cache_hits,
            self.cache_misses,
            self.incremental_runs,
            self.applied,
            self.stale_discards,
            self.dirty_requests,
            self.failures
        )
    }
}
