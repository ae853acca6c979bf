// Gateway Telemetry - Firewall Log Models
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Data structures for parsed firewall log entries and their summaries.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::conntrack::IpCount;

/// Verdict inferred from the log prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Drop,
    Reject,
    Accept,
    #[default]
    Log,
}

impl Action {
    /// Classify a log prefix by keyword, case-insensitively.
    ///
    /// Priority: drop/blocked, then reject/refused, then accept. Anything
    /// else (including "suspicious") is a plain log.
    pub fn from_prefix(prefix: &str) -> Self {
        let prefix = prefix.to_lowercase();
        if prefix.contains("drop") || prefix.contains("blocked") {
            Self::Drop
        } else if prefix.contains("reject") || prefix.contains("refused") {
            Self::Reject
        } else if prefix.contains("accept") {
            Self::Accept
        } else {
            Self::Log
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drop => "DROP",
            Self::Reject => "REJECT",
            Self::Accept => "ACCEPT",
            Self::Log => "LOG",
        }
    }

    /// DROP and REJECT count as blocked traffic.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Drop | Self::Reject)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One kernel firewall log line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FirewallLogEntry {
    pub timestamp: DateTime<Utc>,
    pub prefix: String,
    pub action: Action,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub in_interface: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub out_interface: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mac: String,
    pub src_ip: String,
    pub dst_ip: String,
    pub protocol: String,
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u32,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icmp_type: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icmp_code: Option<u8>,
    /// TCP flags present on the packet, comma separated.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub flags: String,
    pub raw: String,
    /// Reverse DNS name of the source, filled from the cache when known.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub src_hostname: String,
}

/// Blocked destination port with its protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortCount {
    pub port: u16,
    pub protocol: String,
    pub count: usize,
}

/// Summary over a window of firewall log entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FirewallStats {
    pub total_entries: usize,
    pub by_action: BTreeMap<String, usize>,
    pub by_protocol: BTreeMap<String, usize>,
    pub by_in_interface: BTreeMap<String, usize>,
    pub top_blocked_sources: Vec<IpCount>,
    pub top_blocked_ports: Vec<PortCount>,
}

/// Per-action counts for one time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    /// Bucket start.
    pub start: DateTime<Utc>,
    /// Local `HH:MM` of the bucket start.
    pub time: String,
    pub drop: usize,
    pub reject: usize,
    pub accept: usize,
    pub log: usize,
}

/// Entries sharing source, destination port, protocol and action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedEntry {
    pub src_ip: String,
    pub dst_port: u16,
    pub protocol: String,
    pub action: Action,
    pub count: usize,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Which fields a free-text search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SearchScope {
    /// Addresses, both ports and the inbound interface.
    Entry,
    /// Addresses and the destination port.
    Aggregate,
}

/// Caller-side narrowing of log queries. Empty values match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Action name, compared case-insensitively.
    pub action: Option<String>,
    /// Protocol name, compared case-insensitively.
    pub protocol: Option<String>,
    /// Case-insensitive substring.
    pub search: Option<String>,
}

impl LogFilter {
    pub fn is_empty(&self) -> bool {
        [&self.action, &self.protocol, &self.search]
            .iter()
            .all(|v| non_empty(v).is_none())
    }

    pub fn matches(&self, entry: &FirewallLogEntry) -> bool {
        self.matches_in(entry, SearchScope::Entry)
    }

    pub(crate) fn matches_in(&self, entry: &FirewallLogEntry, scope: SearchScope) -> bool {
        if let Some(action) = non_empty(&self.action) {
            if !entry.action.as_str().eq_ignore_ascii_case(action) {
                return false;
            }
        }

        if let Some(protocol) = non_empty(&self.protocol) {
            if !entry.protocol.eq_ignore_ascii_case(protocol) {
                return false;
            }
        }

        let Some(search) = non_empty(&self.search) else {
            return true;
        };
        let needle = search.to_lowercase();
        let hit = |value: &str| value.to_lowercase().contains(&needle);

        let common = hit(&entry.src_ip) || hit(&entry.dst_ip) || hit(&entry.dst_port.to_string());
        match scope {
            SearchScope::Aggregate => common,
            SearchScope::Entry => {
                common || hit(&entry.src_port.to_string()) || hit(&entry.in_interface)
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// How a live stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The caller cancelled; the log source was killed.
    Cancelled,
    /// The log source exited on its own.
    SourceExited { code: Option<i32> },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> FirewallLogEntry {
        FirewallLogEntry {
            timestamp: Utc::now(),
            prefix: "nft_drop".to_string(),
            action: Action::Drop,
            in_interface: "wan0".to_string(),
            out_interface: String::new(),
            mac: String::new(),
            src_ip: "203.0.113.4".to_string(),
            dst_ip: "10.0.0.1".to_string(),
            protocol: "TCP".to_string(),
            src_port: 5555,
            dst_port: 22,
            length: 60,
            ttl: 50,
            icmp_type: None,
            icmp_code: None,
            flags: "SYN".to_string(),
            raw: String::new(),
            src_hostname: String::new(),
        }
    }

    #[test]
    fn test_action_priority() {
        assert_eq!(Action::from_prefix("nft_drop"), Action::Drop);
        assert_eq!(Action::from_prefix("BLOCKED-CONN-BOGON"), Action::Drop);
        assert_eq!(Action::from_prefix("refused connection"), Action::Reject);
        assert_eq!(Action::from_prefix("fw-REJECT"), Action::Reject);
        assert_eq!(Action::from_prefix("accept-ssh"), Action::Accept);
        assert_eq!(Action::from_prefix("WAN-SUSPICIOUS"), Action::Log);
        assert_eq!(Action::from_prefix(""), Action::Log);
        // Drop wins over later keywords.
        assert_eq!(Action::from_prefix("accept-then-drop"), Action::Drop);
        assert_eq!(Action::from_prefix("reject-or-accept"), Action::Reject);
    }

    #[test]
    fn test_action_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Action::Reject).unwrap(), "\"REJECT\"");
        assert_eq!(Action::Log.to_string(), "LOG");
    }

    #[test]
    fn test_filter_action_and_protocol() {
        let e = entry();
        assert!(LogFilter::default().matches(&e));

        let f = LogFilter {
            action: Some("drop".to_string()),
            protocol: Some("tcp".to_string()),
            search: None,
        };
        assert!(f.matches(&e));

        let f = LogFilter {
            action: Some("ACCEPT".to_string()),
            ..Default::default()
        };
        assert!(!f.matches(&e));

        let f = LogFilter {
            protocol: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(f.is_empty());
        assert!(f.matches(&e));
    }

    #[test]
    fn test_filter_search_scope() {
        let e = entry();
        let search = |s: &str| LogFilter {
            search: Some(s.to_string()),
            ..Default::default()
        };

        assert!(search("203.0.113").matches(&e));
        assert!(search("5555").matches(&e));
        assert!(search("WAN0").matches(&e));
        assert!(!search("eth9").matches(&e));

        // Aggregate search skips the source port and interface.
        assert!(search("22").matches_in(&e, SearchScope::Aggregate));
        assert!(!search("5555").matches_in(&e, SearchScope::Aggregate));
        assert!(!search("wan0").matches_in(&e, SearchScope::Aggregate));
    }

    #[test]
    fn test_entry_json_omits_empty_fields() {
        let json = serde_json::to_value(entry()).unwrap();
        assert_eq!(json["action"], "DROP");
        assert_eq!(json["dst_port"], 22);
        assert!(json.get("out_interface").is_none());
        assert!(json.get("icmp_type").is_none());
        assert!(json.get("src_hostname").is_none());
    }
}
