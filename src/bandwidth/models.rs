// Gateway Telemetry - Bandwidth Models
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Data structures for bandwidth history.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One rate measurement for an interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BandwidthSample {
    pub timestamp: DateTime<Utc>,
    /// Bytes per second received.
    pub rx_bps: u64,
    /// Bytes per second transmitted.
    pub tx_bps: u64,
}

/// Cumulative byte counters for one interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Retained history for one monitored interface.
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceHistory {
    pub name: String,
    pub display_name: String,
    pub kind: &'static str,
    pub samples: Vec<BandwidthSample>,
}

/// Lifecycle of the background sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerState {
    Idle,
    Sampling,
    Stopped,
}
