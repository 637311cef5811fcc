//! Shared per-path access counters.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

#[derive(Debug)]
struct Entry {
    count: u64,
    first_seen: u64,
}

#[derive(Debug, Default)]
struct Inner {
    paths: HashMap<String, Entry>,
    next_seq: u64,
}

/// Thread-safe visit counter keyed by raw request path.
///
/// Cloning is cheap and every clone shares the same counters. Each
/// connection handler gets a clone at construction time.
#[derive(Debug, Clone, Default)]
pub struct StatsAggregator {
    inner: Arc<Mutex<Inner>>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Counters stay meaningful even if a holder panicked mid-update.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count one visit to `path`.
    pub fn record(&self, path: &str) {
        let mut inner = self.lock();
        if let Some(entry) = inner.paths.get_mut(path) {
            entry.count += 1;
            return;
        }
        let first_seen = inner.next_seq;
        inner.next_seq += 1;
        inner.paths.insert(
            path.to_string(),
            Entry {
                count: 1,
                first_seen,
            },
        );
    }

    /// Visits recorded for `path` so far.
    pub fn count(&self, path: &str) -> u64 {
        self.lock().paths.get(path).map_or(0, |e| e.count)
    }

    /// Number of distinct paths.
    pub fn len(&self) -> usize {
        self.lock().paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of all visits.
    pub fn total(&self) -> u64 {
        self.lock().paths.values().map(|e| e.count).sum()
    }

    /// The `n` most visited paths, most visited first, ties in first-seen order.
    pub fn snapshot(&self, n: usize) -> TopNSnapshot {
        let mut ranked: Vec<(u64, PathCount)> = {
            let inner = self.lock();
            inner
                .paths
                .iter()
                .map(|(path, e)| {
                    (
                        e.first_seen,
                        PathCount {
                            path: path.clone(),
                            count: e.count,
                        },
                    )
                })
                .collect()
        };

        ranked.sort_by(|(a_seen, a), (b_seen, b)| {
            b.count.cmp(&a.count).then(a_seen.cmp(b_seen))
        });
        ranked.truncate(n);

        TopNSnapshot {
            entries: ranked.into_iter().map(|(_, pc)| pc).collect(),
        }
    }
}

/// One row of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathCount {
    pub path: String,
    pub count: u64,
}

/// Ranked, immutable view of the counters at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TopNSnapshot {
    entries: Vec<PathCount>,
}

impl TopNSnapshot {
    pub fn entries(&self) -> &[PathCount] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathCount> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a TopNSnapshot {
    type Item = &'a PathCount;
    type IntoIter = std::slice::Iter<'a, PathCount>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for TopNSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Top Accessed URLs:")?;
        for entry in &self.entries {
            writeln!(f, "{}: {} times", entry.path, entry.count)?;
        }
        Ok(())
    }
}
