// Gateway Telemetry - Interface Counters
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Cumulative interface byte counters.
//!
//! # Data Sources
//!
//! - `/proc/net/dev` - per-interface receive/transmit statistics

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use super::models::InterfaceCounters;

/// Source of cumulative per-interface byte counters.
///
/// A read either succeeds for the whole table or fails as a whole.
pub trait CounterSource: Send + Sync + 'static {
    fn read(&self) -> io::Result<HashMap<String, InterfaceCounters>>;
}

/// Counter source backed by the kernel's `/proc/net/dev` table.
#[derive(Debug, Clone)]
pub struct ProcNetDev {
    path: PathBuf,
}

impl Default for ProcNetDev {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcNetDev {
    pub fn new() -> Self {
        Self::with_path("/proc/net/dev")
    }

    /// Read from an alternate file with the same layout.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CounterSource for ProcNetDev {
    fn read(&self) -> io::Result<HashMap<String, InterfaceCounters>> {
        let content = fs::read_to_string(&self.path)?;
        Ok(parse_proc_net_dev(&content))
    }
}

/// Parse the contents of `/proc/net/dev`.
///
/// Format after the two header lines:
/// `iface: rx_bytes rx_packets rx_errs rx_drop rx_fifo rx_frame rx_compressed rx_multicast tx_bytes ...`
pub fn parse_proc_net_dev(content: &str) -> HashMap<String, InterfaceCounters> {
    let mut counters = HashMap::new();

    for line in content.lines().skip(2) {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };

        let fields: Vec<&str> = rest.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }

        counters.insert(
            name.trim().to_string(),
            InterfaceCounters {
                rx_bytes: fields[0].parse().unwrap_or(0),
                tx_bytes: fields[8].parse().unwrap_or(0),
            },
        );
    }

    counters
}
