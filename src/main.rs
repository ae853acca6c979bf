// Gateway Telemetry - Main Entry Point
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Gateway Telemetry daemon: samples interface throughput and prints firewall
//! log entries as JSON lines until interrupted.
//!
//! Usage: `gateway-telemetry [SETTINGS.json]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gateway_telemetry::bandwidth::{BandwidthSampler, ProcNetDev};
use gateway_telemetry::config::Settings;
use gateway_telemetry::conntrack::ConntrackCollector;
use gateway_telemetry::dns::DnsCache;
use gateway_telemetry::exec::{find_program, ToolCommand};
use gateway_telemetry::firewall::{FirewallCollector, StreamEnd};

#[tokio::main]
async fn main() -> Result<()> {
    let settings_path = std::env::args_os().nth(1).map(PathBuf::from);
    let settings = Settings::load(settings_path.as_deref())?;

    init_logging(&settings.log_level);
    info!("Gateway Telemetry {} starting", env!("CARGO_PKG_VERSION"));

    let dns = DnsCache::system(
        settings.dns.max_entries,
        settings.dns.ttl(),
        settings.dns.timeout(),
    );

    let conntrack = ConntrackCollector::with_tool(
        ToolCommand::new(find_program(&settings.conntrack.program, "/usr/sbin/conntrack")),
        settings.conntrack.timeout(),
    );
    match conntrack.count().await {
        Ok(count) => info!(connections = count, "conntrack table readable"),
        Err(e) => warn!(error = %e, "conntrack unavailable"),
    }

    let firewall = FirewallCollector::with_tool(
        ToolCommand::new(find_program(&settings.firewall.program, "/usr/bin/journalctl")),
        settings.firewall.timeout(),
    )
    .with_default_since(settings.firewall.default_since.clone())
    .with_queue(settings.firewall.stream_queue)
    .with_dns(dns);

    let mut sampler = if settings.bandwidth.enabled && !settings.bandwidth.interfaces.is_empty() {
        let mut sampler = BandwidthSampler::new(
            settings.bandwidth.interfaces.clone(),
            settings.bandwidth.sample_rate(),
            settings.bandwidth.retention(),
            ProcNetDev::new(),
        );
        sampler.start();
        Some(sampler)
    } else {
        info!("Bandwidth sampling disabled or no interfaces configured");
        None
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Interrupt received, shutting down"),
                Err(e) => warn!(error = %e, "Failed to listen for interrupt"),
            }
            cancel.cancel();
        });
    }

    let end = firewall
        .stream(cancel.clone(), |entry| match serde_json::to_string(&entry) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "Failed to serialize log entry"),
        })
        .await
        .context("Firewall log stream failed");

    match &end {
        Ok(StreamEnd::Cancelled) => {}
        Ok(StreamEnd::SourceExited { code }) => {
            warn!(?code, "Firewall log source exited, waiting for interrupt");
            cancel.cancelled().await;
        }
        Err(e) => warn!("{:#}", e),
    }

    if let Some(sampler) = sampler.as_mut() {
        sampler.stop().await;
        for history in sampler.all_history(None) {
            if let Some(last) = history.samples.last() {
                info!(
                    interface = %history.name,
                    rx_bps = last.rx_bps,
                    tx_bps = last.tx_bps,
                    samples = history.samples.len(),
                    "Final bandwidth reading"
                );
            }
        }
    }

    end.map(|_| ())
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
