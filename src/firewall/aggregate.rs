// Gateway Telemetry - Firewall Log Aggregation
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Summaries, chart buckets and grouping over firewall log entries.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::models::{
    Action, AggregatedEntry, ChartPoint, FirewallLogEntry, FirewallStats, LogFilter, PortCount,
    SearchScope,
};
use crate::conntrack::IpCount;
use crate::tally::Tally;

/// Entries in the top blocked sources/ports lists.
pub const TOP_BLOCKED: usize = 10;

/// Maximum number of groups returned by [`aggregate`].
pub const MAX_GROUPS: usize = 100;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// Counts by action, protocol and interface, plus the most blocked sources
/// and destination ports.
pub fn stats(entries: &[FirewallLogEntry]) -> FirewallStats {
    let mut stats = FirewallStats {
        total_entries: entries.len(),
        ..Default::default()
    };

    let mut sources = Tally::new();
    let mut ports = Tally::new();

    for entry in entries {
        *stats
            .by_action
            .entry(entry.action.as_str().to_string())
            .or_default() += 1;
        *stats.by_protocol.entry(entry.protocol.clone()).or_default() += 1;
        if !entry.in_interface.is_empty() {
            *stats
                .by_in_interface
                .entry(entry.in_interface.clone())
                .or_default() += 1;
        }

        if entry.action.is_blocked() {
            sources.add(entry.src_ip.as_str());
            if entry.dst_port > 0 {
                ports.add((entry.protocol.as_str(), entry.dst_port));
            }
        }
    }

    stats.top_blocked_sources = sources
        .top(TOP_BLOCKED)
        .into_iter()
        .map(|(ip, count)| IpCount {
            ip: ip.to_string(),
            count,
        })
        .collect();
    stats.top_blocked_ports = ports
        .top(TOP_BLOCKED)
        .into_iter()
        .map(|((protocol, port), count)| PortCount {
            port,
            protocol: protocol.to_string(),
            count,
        })
        .collect();

    stats
}

/// Bucket width for a requested time range: 30 minutes for a day or more,
/// 15 minutes for six hours or more, 5 minutes otherwise.
pub fn bucket_width(range: Option<Duration>) -> Duration {
    match range {
        Some(r) if r >= Duration::from_secs(24 * HOUR) => Duration::from_secs(30 * MINUTE),
        Some(r) if r >= Duration::from_secs(6 * HOUR) => Duration::from_secs(15 * MINUTE),
        _ => Duration::from_secs(5 * MINUTE),
    }
}

/// Length of the window described by a journal `--since` expression.
///
/// Understands relative forms (`"6 hours ago"`, `"30 min ago"`, `"-2d"`),
/// `"today"`, `"yesterday"` and absolute `YYYY-MM-DD[ HH:MM[:SS]]` in local
/// time. Anything else yields `None`.
pub fn since_range(since: &str, now: DateTime<Utc>) -> Option<Duration> {
    let expr = since.trim().to_lowercase();

    match expr.as_str() {
        "" => return None,
        "yesterday" => return Some(Duration::from_secs(24 * HOUR)),
        "today" => {
            let midnight = now.with_timezone(&Local).date_naive().and_hms_opt(0, 0, 0)?;
            return elapsed_since_local(midnight, now);
        }
        _ => {}
    }

    if let Some(duration) = parse_relative(&expr) {
        return Some(duration);
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(&expr, format) {
            return elapsed_since_local(at, now);
        }
    }
    let day = NaiveDate::parse_from_str(&expr, "%Y-%m-%d").ok()?;
    elapsed_since_local(day.and_hms_opt(0, 0, 0)?, now)
}

fn elapsed_since_local(at: NaiveDateTime, now: DateTime<Utc>) -> Option<Duration> {
    let at = Local.from_local_datetime(&at).earliest()?;
    (now - at.with_timezone(&Utc)).to_std().ok()
}

/// `"<n> <unit> ago"`, `"-<n><unit>"` or `"<n><unit>"`.
fn parse_relative(expr: &str) -> Option<Duration> {
    let expr = expr.strip_suffix("ago").unwrap_or(expr).trim();
    let expr = expr.strip_prefix('-').unwrap_or(expr).trim();

    let split = expr.find(|c: char| !c.is_ascii_digit())?;
    let (amount, unit) = expr.split_at(split);
    let amount: u64 = amount.parse().ok()?;

    let unit_secs = match unit.trim() {
        "s" | "sec" | "secs" | "second" | "seconds" => 1,
        "m" | "min" | "mins" | "minute" | "minutes" => MINUTE,
        "h" | "hr" | "hrs" | "hour" | "hours" => HOUR,
        "d" | "day" | "days" => 24 * HOUR,
        "w" | "week" | "weeks" => 7 * 24 * HOUR,
        _ => return None,
    };

    Some(Duration::from_secs(amount.checked_mul(unit_secs)?))
}

/// Count actions per fixed-width time bucket, oldest bucket first.
pub fn chart_data(entries: &[FirewallLogEntry], width: Duration) -> Vec<ChartPoint> {
    let width_secs = i64::try_from(width.as_secs().max(1)).unwrap_or(i64::MAX);
    let mut buckets: BTreeMap<i64, ChartPoint> = BTreeMap::new();

    for entry in entries {
        let start_secs = entry.timestamp.timestamp().div_euclid(width_secs) * width_secs;
        let Some(start) = DateTime::from_timestamp(start_secs, 0) else {
            continue;
        };

        let point = buckets.entry(start_secs).or_insert_with(|| ChartPoint {
            start,
            time: start.with_timezone(&Local).format("%H:%M").to_string(),
            drop: 0,
            reject: 0,
            accept: 0,
            log: 0,
        });

        match entry.action {
            Action::Drop => point.drop += 1,
            Action::Reject => point.reject += 1,
            Action::Accept => point.accept += 1,
            Action::Log => point.log += 1,
        }
    }

    buckets.into_values().collect()
}

/// Group matching entries by source, destination port, protocol and action.
///
/// Groups are ordered by count, largest first, and capped at [`MAX_GROUPS`].
pub fn aggregate(entries: &[FirewallLogEntry], filter: &LogFilter) -> Vec<AggregatedEntry> {
    let mut index: HashMap<(&str, u16, &str, Action), usize> = HashMap::new();
    let mut groups: Vec<AggregatedEntry> = Vec::new();

    for entry in entries {
        if !filter.matches_in(entry, SearchScope::Aggregate) {
            continue;
        }

        let key = (
            entry.src_ip.as_str(),
            entry.dst_port,
            entry.protocol.as_str(),
            entry.action,
        );
        match index.get(&key) {
            Some(&idx) => {
                let group = &mut groups[idx];
                group.count += 1;
                group.first_seen = group.first_seen.min(entry.timestamp);
                group.last_seen = group.last_seen.max(entry.timestamp);
            }
            None => {
                index.insert(key, groups.len());
                groups.push(AggregatedEntry {
                    src_ip: entry.src_ip.clone(),
                    dst_port: entry.dst_port,
                    protocol: entry.protocol.clone(),
                    action: entry.action,
                    count: 1,
                    first_seen: entry.timestamp,
                    last_seen: entry.timestamp,
                });
            }
        }
    }

    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups.truncate(MAX_GROUPS);
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn entry(action: Action, src: &str, proto: &str, dport: u16, ts: i64) -> FirewallLogEntry {
        FirewallLogEntry {
            timestamp: at(ts),
            action,
            in_interface: "wan0".to_string(),
            src_ip: src.to_string(),
            dst_ip: "10.0.0.1".to_string(),
            protocol: proto.to_string(),
            dst_port: dport,
            ..Default::default()
        }
    }

    #[test]
    fn test_stats_counts_blocked_only() {
        let entries = vec![
            entry(Action::Drop, "203.0.113.4", "TCP", 22, 0),
            entry(Action::Drop, "203.0.113.4", "TCP", 22, 1),
            entry(Action::Reject, "198.51.100.1", "UDP", 53, 2),
            entry(Action::Accept, "192.0.2.9", "TCP", 443, 3),
            entry(Action::Drop, "192.0.2.10", "ICMP", 0, 4),
        ];

        let stats = stats(&entries);
        assert_eq!(stats.total_entries, 5);
        assert_eq!(stats.by_action["DROP"], 3);
        assert_eq!(stats.by_action["ACCEPT"], 1);
        assert_eq!(stats.by_protocol["TCP"], 3);
        assert_eq!(stats.by_in_interface["wan0"], 5);

        assert_eq!(stats.top_blocked_sources.len(), 3);
        assert_eq!(stats.top_blocked_sources[0].ip, "203.0.113.4");
        assert_eq!(stats.top_blocked_sources[0].count, 2);
        assert!(stats.top_blocked_sources.iter().all(|s| s.ip != "192.0.2.9"));

        // Port zero is not a port.
        assert_eq!(stats.top_blocked_ports.len(), 2);
        assert_eq!(
            stats.top_blocked_ports[0],
            PortCount {
                port: 22,
                protocol: "TCP".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn test_bucket_width() {
        assert_eq!(bucket_width(None), Duration::from_secs(300));
        assert_eq!(bucket_width(Some(Duration::from_secs(3600))), Duration::from_secs(300));
        assert_eq!(bucket_width(Some(Duration::from_secs(6 * 3600))), Duration::from_secs(900));
        assert_eq!(bucket_width(Some(Duration::from_secs(24 * 3600))), Duration::from_secs(1800));
        assert_eq!(
            bucket_width(Some(Duration::from_secs(7 * 24 * 3600))),
            Duration::from_secs(1800)
        );
    }

    #[test]
    fn test_since_range() {
        let now = Utc::now();
        assert_eq!(since_range("1 hour ago", now), Some(Duration::from_secs(3600)));
        assert_eq!(since_range("6 hours ago", now), Some(Duration::from_secs(6 * 3600)));
        assert_eq!(since_range("24 hours ago", now), Some(Duration::from_secs(24 * 3600)));
        assert_eq!(since_range("30 min ago", now), Some(Duration::from_secs(1800)));
        assert_eq!(since_range("-2d", now), Some(Duration::from_secs(2 * 24 * 3600)));
        assert_eq!(since_range("yesterday", now), Some(Duration::from_secs(24 * 3600)));
        assert!(since_range("today", now).is_some());
        assert_eq!(since_range("", now), None);
        assert_eq!(since_range("whenever", now), None);
        assert_eq!(since_range("5 fortnights ago", now), None);

        let two_hours_ago = (now - chrono::Duration::hours(2))
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let range = since_range(&two_hours_ago, now).unwrap();
        assert!(range >= Duration::from_secs(2 * 3600 - 1));
        assert!(range <= Duration::from_secs(2 * 3600 + 1));
    }

    #[test]
    fn test_chart_buckets_sorted_by_start() {
        // Buckets at 00:00, 00:05 and 23:55 of consecutive days, out of order.
        let day = 86_400;
        let entries = vec![
            entry(Action::Drop, "a", "TCP", 1, day + 310),
            entry(Action::Accept, "a", "TCP", 1, day - 10),
            entry(Action::Reject, "a", "TCP", 1, day + 20),
            entry(Action::Log, "a", "TCP", 1, day + 299),
            entry(Action::Drop, "a", "TCP", 1, day + 301),
        ];

        let points = chart_data(&entries, Duration::from_secs(300));
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].start, at(day - 300));
        assert_eq!(points[0].accept, 1);
        assert_eq!(points[1].start, at(day));
        assert_eq!((points[1].reject, points[1].log), (1, 1));
        assert_eq!(points[2].start, at(day + 300));
        assert_eq!(points[2].drop, 2);
        assert_eq!(
            points[2].time,
            at(day + 300).with_timezone(&Local).format("%H:%M").to_string()
        );
    }

    #[test]
    fn test_aggregate_groups_and_orders() {
        let entries = vec![
            entry(Action::Drop, "203.0.113.4", "TCP", 22, 50),
            entry(Action::Drop, "198.51.100.1", "TCP", 22, 10),
            entry(Action::Drop, "203.0.113.4", "TCP", 22, 20),
            entry(Action::Drop, "203.0.113.4", "TCP", 23, 30),
            entry(Action::Drop, "203.0.113.4", "TCP", 22, 40),
        ];

        let groups = aggregate(&entries, &LogFilter::default());
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].src_ip, "203.0.113.4");
        assert_eq!(groups[0].dst_port, 22);
        assert_eq!(groups[0].count, 3);
        assert_eq!(groups[0].first_seen, at(20));
        assert_eq!(groups[0].last_seen, at(50));
        // Equal counts keep first-seen order.
        assert_eq!(groups[1].src_ip, "198.51.100.1");
        assert_eq!(groups[2].dst_port, 23);
    }

    #[test]
    fn test_aggregate_filter_and_cap() {
        let mut entries: Vec<FirewallLogEntry> = (0..150u16)
            .map(|port| entry(Action::Drop, "203.0.113.4", "TCP", 1000 + port, 0))
            .collect();
        entries.push(entry(Action::Accept, "192.0.2.1", "UDP", 53, 0));

        assert_eq!(aggregate(&entries, &LogFilter::default()).len(), MAX_GROUPS);

        let udp = LogFilter {
            protocol: Some("udp".to_string()),
            ..Default::default()
        };
        let groups = aggregate(&entries, &udp);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].action, Action::Accept);
    }
}
