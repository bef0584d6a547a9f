//! Invocation counters.

use dashmap::DashMap;

/// Key of one counter: which handler, triggered from where.
///
/// `source` is either a nick or a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatsKey {
    pub handler: String,
    pub source: String,
}

/// Per-(handler, source) invocation counts.
///
/// Increments are atomic per key; concurrent increments are never lost.
#[derive(Debug, Default)]
pub struct StatsTable {
    counts: DashMap<StatsKey, u64>,
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one to the `(handler, source)` counter.
    pub fn record(&self, handler: &str, source: &str) {
        let key = StatsKey {
            handler: handler.to_string(),
            source: source.to_string(),
        };
        *self.counts.entry(key).or_insert(0) += 1;
    }

    /// Current count for `(handler, source)`.
    pub fn get(&self, handler: &str, source: &str) -> u64 {
        let key = StatsKey {
            handler: handler.to_string(),
            source: source.to_string(),
        };
        self.counts.get(&key).map(|v| *v).unwrap_or(0)
    }

    /// Sum of all counters for `handler`.
    pub fn total_for(&self, handler: &str) -> u64 {
        self.counts
            .iter()
            .filter(|e| e.key().handler == handler)
            .map(|e| *e.value())
            .sum()
    }

    /// Every counter, sorted by key.
    pub fn snapshot(&self) -> Vec<(StatsKey, u64)> {
        let mut out: Vec<_> = self
            .counts
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        out.sort();
        out
    }

    /// Number of distinct counters.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
