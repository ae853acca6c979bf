// Gateway Telemetry - Connection Models
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Data structures for tracked connections.

use std::collections::BTreeMap;

use serde::Serialize;

fn is_zero_u16(v: &u16) -> bool {
    *v == 0
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}

/// One conntrack table entry.
///
/// Reply-direction fields stay empty/zero when the line had no second tuple.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub protocol: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
    pub ttl: u32,
    pub src_ip: String,
    pub dst_ip: String,
    pub src_port: u16,
    pub dst_port: u16,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reply_src_ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub reply_dst_ip: String,
    #[serde(skip_serializing_if = "is_zero_u16")]
    pub reply_src_port: u16,
    #[serde(skip_serializing_if = "is_zero_u16")]
    pub reply_dst_port: u16,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub packets: u64,
    #[serde(skip_serializing_if = "is_zero_u64")]
    pub bytes: u64,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub mark: u32,
    #[serde(skip_serializing_if = "is_zero_u16")]
    pub zone: u16,
}

/// Occurrence count for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpCount {
    pub ip: String,
    pub count: usize,
}

/// Aggregate view of the connection table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    pub total: usize,
    pub by_protocol: BTreeMap<String, usize>,
    pub by_state: BTreeMap<String, usize>,
    pub top_sources: Vec<IpCount>,
    pub top_destinations: Vec<IpCount>,
}

/// Traffic attributed to one internal source address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TalkerStats {
    pub ip: String,
    pub total_bytes: u64,
    pub connections: usize,
}

/// Optional narrowing of a connection listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionFilter {
    /// Protocol name; must be on the allow-list.
    pub protocol: Option<String>,
    /// Connection state, compared case-insensitively.
    pub state: Option<String>,
}

impl ConnectionFilter {
    pub fn protocol(protocol: &str) -> Self {
        Self {
            protocol: Some(protocol.to_string()),
            state: None,
        }
    }

    pub fn state(state: &str) -> Self {
        Self {
            protocol: None,
            state: Some(state.to_string()),
        }
    }
}
