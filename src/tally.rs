// Gateway Telemetry - Tally
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Insertion-ordered occurrence counting for top-N rankings.

use std::collections::HashMap;
use std::hash::Hash;

/// Counts keys, remembering the order in which each key was first seen.
///
/// Ranking is a stable sort, so equal counts keep first-seen order.
#[derive(Debug)]
pub(crate) struct Tally<K> {
    index: HashMap<K, usize>,
    counts: Vec<(K, usize)>,
}

impl<K: Eq + Hash + Clone> Tally<K> {
    pub(crate) fn new() -> Self {
        Self {
            index: HashMap::new(),
            counts: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, key: K) {
        match self.index.get(&key) {
            Some(&idx) => self.counts[idx].1 += 1,
            None => {
                self.index.insert(key.clone(), self.counts.len());
                self.counts.push((key, 1));
            }
        }
    }

    /// The `n` most frequent keys, highest count first.
    pub(crate) fn top(mut self, n: usize) -> Vec<(K, usize)> {
        self.counts.sort_by(|a, b| b.1.cmp(&a.1));
        self.counts.truncate(n);
        self.counts
    }
}
