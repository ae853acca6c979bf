// Gateway Telemetry - Reverse DNS Cache
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! TTL cache in front of reverse DNS resolution.
//!
//! Entries record that a lookup was attempted; the hostname may be empty.
//! Internal addresses are never resolved. When the cache is full, about half
//! of the entries are dropped in no particular order before the next insert.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::resolver::{ReverseResolver, SystemResolver};
use crate::net;

pub const DEFAULT_MAX_ENTRIES: usize = 5000;
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
struct CacheEntry {
    hostname: String,
    expires: Instant,
}

struct Inner {
    entries: RwLock<HashMap<String, CacheEntry>>,
    resolver: Box<dyn ReverseResolver>,
    max_entries: usize,
    ttl: Duration,
    timeout: Duration,
}

/// Shared reverse DNS cache. Clones refer to the same entries.
#[derive(Clone)]
pub struct DnsCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for DnsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsCache")
            .field("len", &self.len())
            .field("max_entries", &self.inner.max_entries)
            .field("ttl", &self.inner.ttl)
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

impl DnsCache {
    /// Create a cache. Zero values fall back to 5000 entries, one hour and 500 ms.
    pub fn new(
        max_entries: usize,
        ttl: Duration,
        timeout: Duration,
        resolver: impl ReverseResolver,
    ) -> Self {
        let or_default = |value: Duration, default: Duration| {
            if value.is_zero() {
                default
            } else {
                value
            }
        };

        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(HashMap::new()),
                resolver: Box::new(resolver),
                max_entries: if max_entries == 0 {
                    DEFAULT_MAX_ENTRIES
                } else {
                    max_entries
                },
                ttl: or_default(ttl, DEFAULT_TTL),
                timeout: or_default(timeout, DEFAULT_TIMEOUT),
            }),
        }
    }

    /// Cache backed by the system resolver.
    pub fn system(max_entries: usize, ttl: Duration, timeout: Duration) -> Self {
        Self::new(max_entries, ttl, timeout, SystemResolver)
    }

    pub fn max_entries(&self) -> usize {
        self.inner.max_entries
    }

    /// Hostname for `ip`, resolving on a miss within the configured timeout.
    ///
    /// Returns an empty string for internal or unparseable addresses, for
    /// addresses without a reverse record and when resolution times out.
    /// Timeouts are not cached, so the next call retries.
    pub async fn lookup(&self, ip: &str) -> String {
        if let Some(hostname) = self.cached(ip) {
            return hostname;
        }

        let Some(addr) = resolvable(ip) else {
            return String::new();
        };

        let inner = Arc::clone(&self.inner);
        let task = tokio::task::spawn_blocking(move || inner.resolver.reverse(addr));

        let hostname = match tokio::time::timeout(self.inner.timeout, task).await {
            Ok(Ok(Ok(name))) => name
                .map(|n| n.trim_end_matches('.').to_string())
                .unwrap_or_default(),
            Ok(Ok(Err(e))) => {
                debug!(ip, error = %e, "reverse lookup failed");
                String::new()
            }
            Ok(Err(e)) => {
                warn!(ip, error = %e, "reverse lookup task failed");
                return String::new();
            }
            Err(_) => {
                debug!(ip, timeout = ?self.inner.timeout, "reverse lookup timed out");
                return String::new();
            }
        };

        self.insert(ip, hostname.clone());
        hostname
    }

    /// Cached hostname for `ip`, never waiting on resolution.
    ///
    /// A miss starts a background lookup (when called inside a Tokio runtime)
    /// and returns an empty string; later calls see the result once it lands.
    /// Concurrent misses for the same address may each start a lookup.
    pub fn lookup_nonblocking(&self, ip: &str) -> String {
        if let Some(hostname) = self.cached(ip) {
            return hostname;
        }

        if resolvable(ip).is_none() {
            return String::new();
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let cache = self.clone();
                let ip = ip.to_string();
                handle.spawn(async move {
                    cache.lookup(&ip).await;
                });
            }
            Err(_) => debug!(ip, "no runtime for background reverse lookup"),
        }

        String::new()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.inner.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, ip: &str) -> Option<String> {
        let entries = self.inner.entries.read().ok()?;
        entries
            .get(ip)
            .filter(|entry| Instant::now() < entry.expires)
            .map(|entry| entry.hostname.clone())
    }

    fn insert(&self, ip: &str, hostname: String) {
        let Ok(mut entries) = self.inner.entries.write() else {
            return;
        };

        let max = self.inner.max_entries;
        if entries.len() >= max && !entries.contains_key(ip) {
            let evict = (max / 2).max(1);
            let victims: Vec<String> = entries.keys().take(evict).cloned().collect();
            for key in &victims {
                entries.remove(key);
            }
            debug!(evicted = victims.len(), remaining = entries.len(), "dns cache full");
        }

        entries.insert(
            ip.to_string(),
            CacheEntry {
                hostname,
                expires: Instant::now() + self.inner.ttl,
            },
        );
    }
}

/// Parsed address worth resolving: not internal, and syntactically valid.
fn resolvable(ip: &str) -> Option<IpAddr> {
    ip.trim()
        .parse::<IpAddr>()
        .ok()
        .filter(|addr| !net::is_internal(addr))
}
