// Gateway Telemetry - Firewall Log Parser
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Parsing of kernel firewall log messages as delivered by the journal.
//!
//! Example message:
//! ```text
//! nft_drop: IN=wan0 OUT= MAC=aa:bb:cc:dd:ee:ff:00:11:22:33:44:55:08:00 SRC=203.0.113.4 DST=10.0.0.1 LEN=60 TTL=50 PROTO=TCP SPT=5555 DPT=22 SYN
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use super::models::{Action, FirewallLogEntry};

/// TCP flags in the order they are reported.
const TCP_FLAGS: [&str; 6] = ["SYN", "ACK", "FIN", "RST", "PSH", "URG"];

/// The subset of a `journalctl -o json` record we use.
#[derive(Debug, Deserialize)]
struct JournalRecord {
    #[serde(rename = "MESSAGE", default)]
    message: Value,
    #[serde(rename = "__REALTIME_TIMESTAMP", default)]
    realtime: Option<String>,
}

/// Parse every firewall line in a block of journal output.
pub fn parse_journal_output(output: &str) -> Vec<FirewallLogEntry> {
    output.lines().filter_map(parse_journal_line).collect()
}

/// Parse one journal line: a JSON record, or a plain kernel message stamped
/// with the current time.
///
/// A line that opens like a record but is not valid JSON (for example one
/// cut off mid-write) is skipped rather than read as plain text.
pub fn parse_journal_line(line: &str) -> Option<FirewallLogEntry> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if !line.starts_with('{') {
        return parse_kernel_message(line, Utc::now());
    }

    let record: JournalRecord = serde_json::from_str(line).ok()?;
    let message = message_text(&record.message)?;
    let timestamp = record
        .realtime
        .as_deref()
        .and_then(parse_realtime)
        .unwrap_or_else(Utc::now);
    parse_kernel_message(&message, timestamp)
}

/// `MESSAGE` is a string, or an array of bytes when it is not valid UTF-8.
fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => {
            let bytes: Vec<u8> = items
                .iter()
                .filter_map(|v| v.as_u64())
                .filter_map(|b| u8::try_from(b).ok())
                .collect();
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
        _ => None,
    }
}

/// Journal realtime stamps are microseconds since the epoch.
fn parse_realtime(value: &str) -> Option<DateTime<Utc>> {
    let micros: i64 = value.trim().parse().ok()?;
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
}

/// Parse a kernel log message into an entry.
///
/// Returns `None` unless the message carries both `IN=` and `SRC=`.
pub fn parse_kernel_message(message: &str, timestamp: DateTime<Utc>) -> Option<FirewallLogEntry> {
    let marker = message.find("IN=")?;
    if !message.contains("SRC=") {
        return None;
    }

    let prefix = message[..marker].trim_end_matches([':', ' ']).trim_start();
    let mut entry = FirewallLogEntry {
        timestamp,
        prefix: prefix.to_string(),
        action: Action::from_prefix(prefix),
        raw: message.to_string(),
        ..Default::default()
    };

    let mut flags: Vec<&str> = Vec::new();

    for token in message.split_whitespace() {
        let Some((left, value)) = token.split_once('=') else {
            if TCP_FLAGS.contains(&token) && !flags.contains(&token) {
                flags.push(token);
            }
            continue;
        };
        if value.is_empty() {
            continue;
        }

        // The key is the run of word characters right before '='.
        let key = left
            .rsplit(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .next()
            .unwrap_or_default();

        match key {
            "IN" => entry.in_interface = value.to_string(),
            "OUT" => entry.out_interface = value.to_string(),
            "MAC" => entry.mac = value.to_string(),
            "SRC" => entry.src_ip = value.to_string(),
            "DST" => entry.dst_ip = value.to_string(),
            "PROTO" => entry.protocol = value.to_string(),
            "SPT" => entry.src_port = value.parse().unwrap_or(0),
            "DPT" => entry.dst_port = value.parse().unwrap_or(0),
            "LEN" => entry.length = value.parse().unwrap_or(0),
            "TTL" => entry.ttl = value.parse().unwrap_or(0),
            "TYPE" => entry.icmp_type = value.parse().ok(),
            "CODE" => entry.icmp_code = value.parse().ok(),
            _ => {}
        }
    }

    flags.sort_by_key(|flag| TCP_FLAGS.iter().position(|f| f == flag));
    entry.flags = flags.join(",");

    if entry.protocol.is_empty() {
        entry.protocol = "IP".to_string();
    }

    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DROP_MSG: &str =
        "nft_drop: IN=eth0 OUT= SRC=203.0.113.4 DST=10.0.0.1 PROTO=TCP SPT=5555 DPT=22";

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_parse_drop_message() {
        let entry = parse_kernel_message(DROP_MSG, now()).unwrap();

        assert_eq!(entry.action, Action::Drop);
        assert_eq!(entry.prefix, "nft_drop");
        assert_eq!(entry.protocol, "TCP");
        assert_eq!(entry.src_port, 5555);
        assert_eq!(entry.dst_port, 22);
        assert_eq!(entry.in_interface, "eth0");
        assert_eq!(entry.out_interface, "");
        assert_eq!(entry.src_ip, "203.0.113.4");
        assert_eq!(entry.dst_ip, "10.0.0.1");
        assert_eq!(entry.raw, DROP_MSG);
        assert_eq!(entry.timestamp, now());
    }

    #[test]
    fn test_non_firewall_lines_rejected() {
        assert!(parse_kernel_message("usb 1-1: new high-speed USB device", now()).is_none());
        assert!(parse_kernel_message("IN=eth0 OUT= DST=10.0.0.1", now()).is_none());
        assert!(parse_kernel_message("SRC=1.2.3.4 DST=10.0.0.1", now()).is_none());
        assert!(parse_journal_line("").is_none());
    }

    #[test]
    fn test_full_message_with_flags() {
        let msg = "WAN-SUSPICIOUS: IN=wan0 OUT=lan0 MAC=aa:bb:cc:dd:ee:ff:00:11:22:33:44:55:08:00 \
                   SRC=198.51.100.7 DST=10.0.0.9 LEN=60 TOS=0x00 PREC=0x00 TTL=49 ID=1 DF \
                   PROTO=TCP SPT=40000 DPT=443 WINDOW=64240 RES=0x00 ACK SYN URGP=0";
        let entry = parse_kernel_message(msg, now()).unwrap();

        assert_eq!(entry.action, Action::Log);
        assert_eq!(entry.prefix, "WAN-SUSPICIOUS");
        assert_eq!(entry.out_interface, "lan0");
        assert_eq!(entry.mac, "aa:bb:cc:dd:ee:ff:00:11:22:33:44:55:08:00");
        assert_eq!(entry.length, 60);
        assert_eq!(entry.ttl, 49);
        assert_eq!(entry.flags, "SYN,ACK");
    }

    #[test]
    fn test_icmp_and_default_protocol() {
        let icmp = parse_kernel_message(
            "refused: IN=wan0 OUT= SRC=192.0.2.1 DST=10.0.0.1 PROTO=ICMP TYPE=8 CODE=0 ID=9 SEQ=1",
            now(),
        )
        .unwrap();
        assert_eq!(icmp.action, Action::Reject);
        assert_eq!(icmp.icmp_type, Some(8));
        assert_eq!(icmp.icmp_code, Some(0));

        let bare = parse_kernel_message("IN=wan0 OUT= SRC=192.0.2.1 DST=10.0.0.1", now()).unwrap();
        assert_eq!(bare.protocol, "IP");
        assert_eq!(bare.prefix, "");
        assert_eq!(bare.action, Action::Log);
    }

    #[test]
    fn test_prefix_glued_to_marker() {
        let entry =
            parse_kernel_message("[accept]IN=lo OUT= SRC=127.0.0.1 DST=127.0.0.1", now()).unwrap();
        assert_eq!(entry.action, Action::Accept);
        assert_eq!(entry.in_interface, "lo");
    }

    #[test]
    fn test_journal_json_line() {
        let line = format!(
            r#"{{"MESSAGE":"{DROP_MSG}","__REALTIME_TIMESTAMP":"1700000000123456","PRIORITY":"4"}}"#
        );
        let entry = parse_journal_line(&line).unwrap();

        assert_eq!(entry.action, Action::Drop);
        assert_eq!(entry.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(entry.timestamp.timestamp_subsec_micros(), 123_456);
    }

    #[test]
    fn test_journal_byte_array_message() {
        let bytes: Vec<String> = "blocked: IN=wan0 OUT= SRC=192.0.2.5 DST=10.0.0.1 PROTO=UDP"
            .bytes()
            .map(|b| b.to_string())
            .collect();
        let line = format!(
            r#"{{"MESSAGE":[{}],"__REALTIME_TIMESTAMP":"1700000000000000"}}"#,
            bytes.join(",")
        );

        let entry = parse_journal_line(&line).unwrap();
        assert_eq!(entry.action, Action::Drop);
        assert_eq!(entry.protocol, "UDP");
    }

    #[test]
    fn test_journal_json_without_firewall_message() {
        let link = r#"{"MESSAGE":"eth0: link up","__REALTIME_TIMESTAMP":"1"}"#;
        assert!(parse_journal_line(link).is_none());
        assert!(parse_journal_line(r#"{"MESSAGE":null}"#).is_none());
    }

    #[test]
    fn test_truncated_json_record_skipped() {
        let cut = r#"{"MESSAGE":"nft_drop: IN=wan0 OUT= SRC=203.0.113.4 DST=10.0.0.1 DPT=2"#;
        assert!(parse_journal_line(cut).is_none());
    }

    #[test]
    fn test_plain_line_gets_current_time() {
        let before = Utc::now();
        let entry = parse_journal_line(DROP_MSG).unwrap();
        assert!(entry.timestamp >= before);
    }

    #[test]
    fn test_parse_output_skips_noise() {
        let output = format!(
            "{{\"MESSAGE\":\"{DROP_MSG}\",\"__REALTIME_TIMESTAMP\":\"1700000000000000\"}}\n\
             -- No entries --\n\
             {{\"MESSAGE\":\"audit: something\"}}\n"
        );
        assert_eq!(parse_journal_output(&output).len(), 1);
    }
}
