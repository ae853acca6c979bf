// Gateway Telemetry - Reverse Resolver
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Blocking reverse name resolution.

use std::io;
use std::net::IpAddr;

/// Address to hostname resolution. Implementations may block; callers run
/// them on the blocking pool under a deadline.
pub trait ReverseResolver: Send + Sync + 'static {
    /// `Ok(None)` means the address has no usable reverse record.
    fn reverse(&self, ip: IpAddr) -> io::Result<Option<String>>;
}

/// The system resolver (`getnameinfo`).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl ReverseResolver for SystemResolver {
    fn reverse(&self, ip: IpAddr) -> io::Result<Option<String>> {
        let name = dns_lookup::lookup_addr(&ip)?;
        Ok(meaningful_name(&ip, name))
    }
}

/// `getnameinfo` hands back the numeric form when there is no PTR record.
fn meaningful_name(ip: &IpAddr, name: String) -> Option<String> {
    let name = name.trim_end_matches('.');
    if name.is_empty() || name == ip.to_string() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meaningful_name() {
        let ip: IpAddr = "1.1.1.1".parse().unwrap();
        assert_eq!(
            meaningful_name(&ip, "one.one.one.one.".to_string()).as_deref(),
            Some("one.one.one.one")
        );
        assert_eq!(meaningful_name(&ip, "1.1.1.1".to_string()), None);
        assert_eq!(meaningful_name(&ip, String::new()), None);
    }

    #[test]
    fn test_system_resolver_loopback() {
        // Loopback resolves locally through /etc/hosts or comes back numeric.
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        if let Ok(Some(name)) = SystemResolver.reverse(ip) {
            assert!(!name.ends_with('.'));
            assert_ne!(name, "127.0.0.1");
        }
    }
}
