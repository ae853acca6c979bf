// Gateway Telemetry - Address Classification
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Private, loopback and link-local address checks.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Check whether an address is internal: RFC 1918 / unique-local, loopback or
/// link-local unicast.
pub fn is_internal(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_internal_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_internal_v4(&v4),
            None => is_internal_v6(v6),
        },
    }
}

/// Parse and classify an address string. Unparseable input is not internal.
pub fn is_internal_str(addr: &str) -> bool {
    addr.parse::<IpAddr>()
        .map(|ip| is_internal(&ip))
        .unwrap_or(false)
}

fn is_internal_v4(addr: &Ipv4Addr) -> bool {
    addr.is_private() || addr.is_loopback() || addr.is_link_local()
}

fn is_internal_v6(addr: &Ipv6Addr) -> bool {
    let first = addr.segments()[0];
    addr.is_loopback()
        // fc00::/7
        || (first & 0xfe00) == 0xfc00
        // fe80::/10
        || (first & 0xffc0) == 0xfe80
}
