// Gateway Telemetry - Interface Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Monitored network interface model.

use serde::{Deserialize, Serialize};

/// A network interface whose throughput is sampled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredInterface {
    /// Kernel interface name, as listed in `/proc/net/dev`.
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

impl MonitoredInterface {
    /// Create a new monitored interface.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Name to show operators, falling back to the kernel name.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// Get a human-readable type for the interface.
    pub fn interface_type(&self) -> &'static str {
        let name = self.name.as_str();
        if name == "lo" {
            "Loopback"
        } else if name.starts_with("wan") || name.starts_with("ppp") {
            "Uplink"
        } else if name.starts_with("eth") || name.starts_with("en") || name.starts_with("lan") {
            "Ethernet"
        } else if name.starts_with("wl") {
            "Wireless"
        } else if name.starts_with("br") {
            "Bridge"
        } else if name.starts_with("veth") || name.starts_with("docker") {
            "Virtual (Container)"
        } else if name.starts_with("tailscale") || name.starts_with("wg") {
            "VPN"
        } else if name.starts_with("tun") || name.starts_with("tap") {
            "Tunnel"
        } else if name.contains('.') {
            "VLAN"
        } else {
            "Unknown"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_fallback() {
        let mut iface = MonitoredInterface::new("wan0");
        assert_eq!(iface.label(), "wan0");
        iface.display_name = "Fiber uplink".to_string();
        assert_eq!(iface.label(), "Fiber uplink");
    }

    #[test]
    fn test_interface_type() {
        assert_eq!(MonitoredInterface::new("lo").interface_type(), "Loopback");
        assert_eq!(MonitoredInterface::new("wan0").interface_type(), "Uplink");
        assert_eq!(MonitoredInterface::new("enp3s0").interface_type(), "Ethernet");
        assert_eq!(MonitoredInterface::new("wg0").interface_type(), "VPN");
        assert_eq!(MonitoredInterface::new("vlan.20").interface_type(), "VLAN");
    }
}
