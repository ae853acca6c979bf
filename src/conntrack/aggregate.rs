// Gateway Telemetry - Connection Aggregation
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Summaries over a connection listing.

use std::collections::HashMap;

use super::models::{Connection, ConnectionStats, IpCount, TalkerStats};
use crate::net;
use crate::tally::Tally;

/// Number of entries in the top sources/destinations lists.
pub const TOP_ADDRESSES: usize = 10;

/// Talker limit used when the caller asks for zero.
pub const DEFAULT_TALKERS: usize = 10;

/// Totals by protocol and state plus the busiest endpoints.
pub fn summarize(connections: &[Connection]) -> ConnectionStats {
    let mut stats = ConnectionStats {
        total: connections.len(),
        ..Default::default()
    };

    let mut sources = Tally::new();
    let mut destinations = Tally::new();

    for conn in connections {
        *stats.by_protocol.entry(conn.protocol.clone()).or_default() += 1;
        if !conn.state.is_empty() {
            *stats.by_state.entry(conn.state.clone()).or_default() += 1;
        }
        sources.add(conn.src_ip.as_str());
        destinations.add(conn.dst_ip.as_str());
    }

    stats.top_sources = to_ip_counts(sources.top(TOP_ADDRESSES));
    stats.top_destinations = to_ip_counts(destinations.top(TOP_ADDRESSES));
    stats
}

fn to_ip_counts(ranked: Vec<(&str, usize)>) -> Vec<IpCount> {
    ranked
        .into_iter()
        .map(|(ip, count)| IpCount {
            ip: ip.to_string(),
            count,
        })
        .collect()
}

/// Internal sources ranked by total bytes, descending.
///
/// Connections whose source is not private, loopback or link-local are
/// ignored regardless of volume.
pub fn top_talkers(connections: &[Connection], limit: usize) -> Vec<TalkerStats> {
    let limit = if limit == 0 { DEFAULT_TALKERS } else { limit };

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut talkers: Vec<TalkerStats> = Vec::new();

    for conn in connections {
        if !net::is_internal_str(&conn.src_ip) {
            continue;
        }

        let idx = *index.entry(conn.src_ip.as_str()).or_insert_with(|| {
            talkers.push(TalkerStats {
                ip: conn.src_ip.clone(),
                total_bytes: 0,
                connections: 0,
            });
            talkers.len() - 1
        });

        let talker = &mut talkers[idx];
        talker.total_bytes += conn.bytes;
        talker.connections += 1;
    }

    talkers.sort_by(|a, b| b.total_bytes.cmp(&a.total_bytes));
    talkers.truncate(limit);
    talkers
}

/// Keep connections whose state matches, ignoring case.
pub fn filter_state(connections: Vec<Connection>, state: &str) -> Vec<Connection> {
    connections
        .into_iter()
        .filter(|c| c.state.eq_ignore_ascii_case(state))
        .collect()
}
