// Gateway Telemetry - Sample Ring
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Fixed-capacity sample history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use super::models::BandwidthSample;

/// Circular store of bandwidth samples, oldest first.
///
/// Not synchronized; the sampler guards it with its state lock.
#[derive(Debug, Clone)]
pub struct SampleRing {
    samples: VecDeque<BandwidthSample>,
    capacity: usize,
}

impl SampleRing {
    /// Create a ring holding at most `capacity` samples (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert a sample, overwriting the oldest one when full.
    pub fn add(&mut self, sample: BandwidthSample) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// All stored samples, oldest first.
    pub fn all(&self) -> Vec<BandwidthSample> {
        self.samples.iter().cloned().collect()
    }

    /// Samples stamped at or after `since`, oldest first.
    pub fn since(&self, since: DateTime<Utc>) -> Vec<BandwidthSample> {
        self.samples
            .iter()
            .filter(|s| s.timestamp >= since)
            .cloned()
            .collect()
    }

    pub fn latest(&self) -> Option<&BandwidthSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
