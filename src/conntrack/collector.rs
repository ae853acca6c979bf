// Gateway Telemetry - Conntrack Collector
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Connection tracking data from the netfilter `conntrack` tool.

use std::time::Duration;

use tracing::{debug, warn};

use super::aggregate;
use super::models::{Connection, ConnectionFilter, ConnectionStats, TalkerStats};
use super::parser;
use crate::error::{CollectorError, Result};
use crate::exec::{self, CommandOutput, ToolCommand};

/// Protocol values accepted as a `conntrack -p` argument.
pub const ALLOWED_PROTOCOLS: [&str; 7] = ["tcp", "udp", "icmp", "sctp", "gre", "esp", "ah"];

/// Where `conntrack` usually lives when it is not on `PATH`.
const FALLBACK_PATH: &str = "/usr/sbin/conntrack";

/// Check a protocol filter against the allow-list.
///
/// Returns the canonical lowercase name, safe to pass as an argument.
pub fn validate_protocol(protocol: &str) -> Result<&'static str> {
    let normalized = protocol.trim().to_ascii_lowercase();
    ALLOWED_PROTOCOLS
        .iter()
        .copied()
        .find(|p| *p == normalized)
        .ok_or_else(|| CollectorError::InvalidInput {
            field: "protocol",
            value: protocol.to_string(),
            reason: format!("must be one of {}", ALLOWED_PROTOCOLS.join(", ")),
        })
}

/// On-demand collector for the connection tracking table.
#[derive(Debug, Clone)]
pub struct ConntrackCollector {
    tool: ToolCommand,
    timeout: Duration,
}

impl ConntrackCollector {
    /// Create a collector using `conntrack` from `PATH`.
    pub fn new(timeout: Duration) -> Self {
        Self::with_tool(
            ToolCommand::new(exec::find_program("conntrack", FALLBACK_PATH)),
            timeout,
        )
    }

    pub fn with_tool(tool: ToolCommand, timeout: Duration) -> Self {
        Self { tool, timeout }
    }

    /// List tracked connections, optionally narrowed by protocol and state.
    ///
    /// The protocol is validated before anything is executed.
    pub async fn list(&self, filter: &ConnectionFilter) -> Result<Vec<Connection>> {
        let protocol = match non_empty(filter.protocol.as_deref()) {
            Some(raw) => Some(validate_protocol(raw)?),
            None => None,
        };

        let mut args = vec!["-L"];
        if let Some(protocol) = protocol {
            args.extend(["-p", protocol]);
        }
        args.extend(["-o", "extended"]);

        let output = self.run(&args).await?;
        let connections = parser::parse_output(&output.stdout);
        debug!(count = connections.len(), ?protocol, "parsed conntrack listing");

        Ok(match non_empty(filter.state.as_deref()) {
            Some(state) => aggregate::filter_state(connections, state),
            None => connections,
        })
    }

    /// Totals plus top sources and destinations over the whole table.
    pub async fn stats(&self) -> Result<ConnectionStats> {
        let connections = self.list(&ConnectionFilter::default()).await?;
        Ok(aggregate::summarize(&connections))
    }

    /// Internal hosts ranked by bytes; `limit` of zero means the default of 10.
    pub async fn top_talkers(&self, limit: usize) -> Result<Vec<TalkerStats>> {
        let connections = self.list(&ConnectionFilter::default()).await?;
        Ok(aggregate::top_talkers(&connections, limit))
    }

    /// Current table size as reported by `conntrack -C`; 0 on a timeout.
    pub async fn count(&self) -> Result<usize> {
        let output = self.run(&["-C"]).await?;
        if output.timed_out {
            // Whatever digits arrived may be a cut-off number.
            return Ok(0);
        }
        match output.stdout.trim().parse() {
            Ok(count) => Ok(count),
            Err(_) => Err(CollectorError::CommandFailed {
                program: self.tool.program().display().to_string(),
                status: output.status_label(),
                stderr: format!("unexpected count output {:?}", output.stdout.trim()),
            }),
        }
    }

    /// Run the tool. A timeout yields the partial output; a failure with no
    /// output at all is an error.
    async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = self.tool.run(args, self.timeout).await?;

        if output.timed_out {
            warn!(
                timeout = ?self.timeout,
                bytes = output.stdout.len(),
                "conntrack timed out, using partial output"
            );
            return Ok(output);
        }

        if !output.success() && output.stdout.trim().is_empty() {
            return Err(CollectorError::CommandFailed {
                program: self.tool.program().display().to_string(),
                status: output.status_label(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
