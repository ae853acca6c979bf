// Gateway Telemetry - Conntrack Parser
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Parsing of `conntrack -L -o extended` output.
//!
//! Example line:
//! ```text
//! ipv4     2 tcp      6 431999 ESTABLISHED src=10.0.0.112 dst=160.79.104.10 sport=35526 dport=443 src=160.79.104.10 dst=10.0.0.112 sport=443 dport=35526 [ASSURED] mark=0 use=1
//! ```
//! Positional fields: family, L3 number, protocol, L4 number, TTL, then the
//! state for stateful protocols. The first tuple is the original direction,
//! the second one the reply direction.

use super::models::Connection;

/// First and second occurrence of an attribute.
#[derive(Default)]
struct Directions<T> {
    original: Option<T>,
    reply: Option<T>,
}

impl<T> Directions<T> {
    fn push(&mut self, value: T) {
        if self.original.is_none() {
            self.original = Some(value);
        } else if self.reply.is_none() {
            self.reply = Some(value);
        }
    }
}

/// Parse every connection line in the command output.
pub fn parse_output(output: &str) -> Vec<Connection> {
    output.lines().filter_map(parse_line).collect()
}

/// Parse one line. Lines with fewer than five fields are skipped.
pub fn parse_line(line: &str) -> Option<Connection> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return None;
    }

    let mut conn = Connection {
        protocol: fields[2].to_string(),
        ttl: fields[4].parse().unwrap_or(0),
        ..Default::default()
    };

    if let Some(state) = fields.get(5).filter(|f| is_state_token(f)) {
        conn.state = state.to_string();
    }

    let mut src: Directions<&str> = Directions::default();
    let mut dst: Directions<&str> = Directions::default();
    let mut sport: Directions<u16> = Directions::default();
    let mut dport: Directions<u16> = Directions::default();
    let mut packets: Option<u64> = None;
    let mut bytes: Option<u64> = None;
    let mut mark: Option<u32> = None;
    let mut zone: Option<u16> = None;

    for field in &fields {
        let Some((key, value)) = field.split_once('=') else {
            continue;
        };
        if value.is_empty() {
            continue;
        }

        match key {
            "src" => src.push(value),
            "dst" => dst.push(value),
            "sport" => {
                if let Ok(port) = value.parse::<u16>() {
                    sport.push(port);
                }
            }
            "dport" => {
                if let Ok(port) = value.parse::<u16>() {
                    dport.push(port);
                }
            }
            "packets" => packets = packets.or_else(|| value.parse().ok()),
            "bytes" => bytes = bytes.or_else(|| value.parse().ok()),
            "mark" => mark = mark.or_else(|| value.parse().ok()),
            "zone" => zone = zone.or_else(|| value.parse().ok()),
            _ => {}
        }
    }

    conn.src_ip = src.original.unwrap_or_default().to_string();
    conn.dst_ip = dst.original.unwrap_or_default().to_string();
    conn.src_port = sport.original.unwrap_or_default();
    conn.dst_port = dport.original.unwrap_or_default();
    conn.reply_src_ip = src.reply.unwrap_or_default().to_string();
    conn.reply_dst_ip = dst.reply.unwrap_or_default().to_string();
    conn.reply_src_port = sport.reply.unwrap_or_default();
    conn.reply_dst_port = dport.reply.unwrap_or_default();
    conn.packets = packets.unwrap_or_default();
    conn.bytes = bytes.unwrap_or_default();
    conn.mark = mark.unwrap_or_default();
    conn.zone = zone.unwrap_or_default();

    Some(conn)
}

/// A state looks like `ESTABLISHED` or `SYN_SENT`: uppercase, no `=`.
fn is_state_token(field: &str) -> bool {
    !field.contains('=')
        && field.chars().any(|c| c.is_ascii_alphabetic())
        && field
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
