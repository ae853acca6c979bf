// Gateway Telemetry - Configuration
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Collector settings loaded from a local JSON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bandwidth::MonitoredInterface;
use crate::dns;
use crate::firewall;

/// Top-level settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Default log filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub bandwidth: BandwidthSettings,
    #[serde(default)]
    pub conntrack: ConntrackSettings,
    #[serde(default)]
    pub firewall: FirewallSettings,
    #[serde(default)]
    pub dns: DnsSettings,
}

/// Interface sampling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interfaces to sample.
    #[serde(default)]
    pub interfaces: Vec<MonitoredInterface>,
    #[serde(default = "default_sample_rate_secs")]
    pub sample_rate_secs: u64,
    /// How much history to keep per interface.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConntrackSettings {
    #[serde(default = "default_conntrack_program")]
    pub program: String,
    #[serde(default = "default_command_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallSettings {
    #[serde(default = "default_journal_program")]
    pub program: String,
    #[serde(default = "default_command_timeout_secs")]
    pub timeout_secs: u64,
    /// `--since` expression used when a query names none.
    #[serde(default = "default_since")]
    pub default_since: String,
    /// Entries buffered between the journal follower and its consumer.
    #[serde(default = "default_stream_queue")]
    pub stream_queue: usize,
}

/// Reverse DNS cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsSettings {
    #[serde(default = "default_dns_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_dns_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_dns_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }
fn default_sample_rate_secs() -> u64 { 5 }
fn default_retention_secs() -> u64 { 3600 }
fn default_conntrack_program() -> String { "conntrack".to_string() }
fn default_journal_program() -> String { "journalctl".to_string() }
fn default_command_timeout_secs() -> u64 { 30 }
fn default_since() -> String { firewall::DEFAULT_SINCE.to_string() }
fn default_stream_queue() -> usize { firewall::DEFAULT_QUEUE }
fn default_dns_max_entries() -> usize { dns::DEFAULT_MAX_ENTRIES }
fn default_dns_ttl_secs() -> u64 { dns::DEFAULT_TTL.as_secs() }
fn default_dns_timeout_ms() -> u64 { dns::DEFAULT_TIMEOUT.as_millis() as u64 }

/// Zero means "use the default".
fn secs_or(value: u64, default: u64) -> Duration {
    Duration::from_secs(if value == 0 { default } else { value })
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            bandwidth: BandwidthSettings::default(),
            conntrack: ConntrackSettings::default(),
            firewall: FirewallSettings::default(),
            dns: DnsSettings::default(),
        }
    }
}

impl Default for BandwidthSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interfaces: Vec::new(),
            sample_rate_secs: default_sample_rate_secs(),
            retention_secs: default_retention_secs(),
        }
    }
}

impl BandwidthSettings {
    pub fn sample_rate(&self) -> Duration {
        secs_or(self.sample_rate_secs, default_sample_rate_secs())
    }

    pub fn retention(&self) -> Duration {
        secs_or(self.retention_secs, default_retention_secs())
    }
}

impl Default for ConntrackSettings {
    fn default() -> Self {
        Self {
            program: default_conntrack_program(),
            timeout_secs: default_command_timeout_secs(),
        }
    }
}

impl ConntrackSettings {
    pub fn timeout(&self) -> Duration {
        secs_or(self.timeout_secs, default_command_timeout_secs())
    }
}

impl Default for FirewallSettings {
    fn default() -> Self {
        Self {
            program: default_journal_program(),
            timeout_secs: default_command_timeout_secs(),
            default_since: default_since(),
            stream_queue: default_stream_queue(),
        }
    }
}

impl FirewallSettings {
    pub fn timeout(&self) -> Duration {
        secs_or(self.timeout_secs, default_command_timeout_secs())
    }
}

impl Default for DnsSettings {
    fn default() -> Self {
        Self {
            max_entries: default_dns_max_entries(),
            ttl_secs: default_dns_ttl_secs(),
            timeout_ms: default_dns_timeout_ms(),
        }
    }
}

impl DnsSettings {
    pub fn ttl(&self) -> Duration {
        secs_or(self.ttl_secs, default_dns_ttl_secs())
    }

    pub fn timeout(&self) -> Duration {
        if self.timeout_ms == 0 {
            dns::DEFAULT_TIMEOUT
        } else {
            Duration::from_millis(self.timeout_ms)
        }
    }
}

impl Settings {
    /// `<config dir>/gateway-telemetry/settings.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gateway-telemetry")
            .join("settings.json")
    }

    /// Load settings from an explicit path, or from the default location.
    ///
    /// A missing file gives defaults. A broken explicit file is an error; a
    /// broken default file is logged and replaced with defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                warn!("Settings file {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            return Self::load_from(path);
        }

        let path = Self::default_path();
        if !path.exists() {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        match Self::load_from(&path) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!("Failed to load settings: {:#}", e);
                Ok(Self::default())
            }
        }
    }

    /// Read and parse one settings file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "gateway-telemetry-{}-{}.json",
            name,
            std::process::id()
        ));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.log_level, "info");
        assert!(s.bandwidth.enabled);
        assert_eq!(s.bandwidth.sample_rate(), Duration::from_secs(5));
        assert_eq!(s.bandwidth.retention(), Duration::from_secs(3600));
        assert_eq!(s.conntrack.program, "conntrack");
        assert_eq!(s.firewall.default_since, "1 hour ago");
        assert_eq!(s.firewall.stream_queue, 256);
        assert_eq!(s.dns.max_entries, 5000);
        assert_eq!(s.dns.ttl(), Duration::from_secs(3600));
        assert_eq!(s.dns.timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let s: Settings = serde_json::from_str(
            r#"{
                "bandwidth": {
                    "interfaces": [{"name": "wan0", "display_name": "Uplink"}],
                    "sample_rate_secs": 2
                },
                "dns": {"ttl_secs": 0}
            }"#,
        )
        .unwrap();

        assert_eq!(s.log_level, "info");
        assert_eq!(s.bandwidth.interfaces.len(), 1);
        assert_eq!(s.bandwidth.interfaces[0].name, "wan0");
        assert_eq!(s.bandwidth.sample_rate(), Duration::from_secs(2));
        assert_eq!(s.bandwidth.retention(), Duration::from_secs(3600));
        assert_eq!(s.conntrack.timeout(), Duration::from_secs(30));
        // Zero falls back to the default.
        assert_eq!(s.dns.ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_load_explicit_file() {
        let path = temp_file(
            "explicit",
            r#"{"log_level": "debug", "firewall": {"timeout_secs": 5}}"#,
        );
        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.log_level, "debug");
        assert_eq!(s.firewall.timeout(), Duration::from_secs(5));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_malformed_explicit_file_is_error() {
        let path = temp_file("malformed", "{ not json");
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse settings"));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_explicit_file_gives_defaults() {
        let path = std::env::temp_dir().join("gateway-telemetry-does-not-exist.json");
        assert_eq!(Settings::load(Some(&path)).unwrap(), Settings::default());
    }

    #[test]
    fn test_default_path() {
        let path = Settings::default_path();
        assert!(path.ends_with("gateway-telemetry/settings.json"));
    }
}
