// Gateway Telemetry - Firewall Log Collector
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Kernel firewall log access through `journalctl`.
//!
//! Historical queries run the journal once under a deadline. Live streaming
//! runs it in follow mode inside a producer task that parses each line and
//! pushes entries onto a bounded queue; cancelling the token kills the
//! process before the producer returns.

use std::process::ExitStatus;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::aggregate;
use super::models::{
    AggregatedEntry, ChartPoint, FirewallLogEntry, FirewallStats, LogFilter, StreamEnd,
};
use super::parser;
use crate::dns::DnsCache;
use crate::error::{CollectorError, Result};
use crate::exec::{self, ToolCommand};

/// Journal selection shared by queries and streams: kernel messages that
/// look like netfilter log lines.
const JOURNAL_ARGS: [&str; 6] = [
    "-k",
    "--no-pager",
    "-o",
    "json",
    "-g",
    "IN=.*OUT=.*SRC=.*DST=",
];

pub const DEFAULT_SINCE: &str = "1 hour ago";
pub const DEFAULT_QUEUE: usize = 256;

/// Collector for firewall log entries.
#[derive(Debug, Clone)]
pub struct FirewallCollector {
    tool: ToolCommand,
    timeout: Duration,
    default_since: String,
    queue: usize,
    dns: Option<DnsCache>,
}

impl FirewallCollector {
    /// Create a collector using `journalctl` from `PATH`.
    pub fn new(timeout: Duration) -> Self {
        Self::with_tool(
            ToolCommand::new(exec::find_program("journalctl", "/usr/bin/journalctl")),
            timeout,
        )
    }

    pub fn with_tool(tool: ToolCommand, timeout: Duration) -> Self {
        Self {
            tool,
            timeout,
            default_since: DEFAULT_SINCE.to_string(),
            queue: DEFAULT_QUEUE,
            dns: None,
        }
    }

    /// Time expression used when a query passes no `since`.
    pub fn with_default_since(mut self, since: impl Into<String>) -> Self {
        let since = since.into();
        if !since.trim().is_empty() {
            self.default_since = since;
        }
        self
    }

    /// Capacity of the live stream queue.
    pub fn with_queue(mut self, queue: usize) -> Self {
        self.queue = queue.max(1);
        self
    }

    /// Fill `src_hostname` on queried and streamed entries from this cache.
    pub fn with_dns(mut self, dns: DnsCache) -> Self {
        self.dns = Some(dns);
        self
    }

    fn since_expr<'a>(&'a self, since: Option<&'a str>) -> &'a str {
        since
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.default_since)
    }

    /// Entries logged since `since`, at most `limit` of them (0 = no limit).
    pub async fn logs(&self, limit: usize, since: Option<&str>) -> Result<Vec<FirewallLogEntry>> {
        let since = self.since_expr(since);
        let limit_arg = limit.to_string();

        let mut args = JOURNAL_ARGS.to_vec();
        args.extend(["--since", since]);
        if limit > 0 {
            args.extend(["-n", limit_arg.as_str()]);
        }

        let output = self.tool.run(&args, self.timeout).await?;

        if output.timed_out {
            warn!(
                timeout = ?self.timeout,
                since,
                "journal query timed out, using partial output"
            );
        } else if !output.success() && output.stdout.trim().is_empty() {
            // The journal exits non-zero when the pattern matches nothing.
            if output.stderr.trim().is_empty() {
                return Ok(Vec::new());
            }
            return Err(CollectorError::CommandFailed {
                program: self.tool.program().display().to_string(),
                status: output.status_label(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        let mut entries = parser::parse_journal_output(&output.stdout);
        if limit > 0 {
            entries.truncate(limit);
        }
        debug!(count = entries.len(), since, "parsed firewall log entries");
        Ok(entries)
    }

    /// Filtered entries with source hostnames.
    ///
    /// Fetches twice `limit` so that filtering still leaves enough entries.
    /// Hostnames come from the cache only; addresses not yet resolved are
    /// looked up in the background and show up on later queries.
    pub async fn query(
        &self,
        limit: usize,
        since: Option<&str>,
        filter: &LogFilter,
    ) -> Result<Vec<FirewallLogEntry>> {
        let entries = self.logs(limit.saturating_mul(2), since).await?;

        let cap = if limit == 0 { usize::MAX } else { limit };
        let mut matched: Vec<FirewallLogEntry> = entries
            .into_iter()
            .filter(|entry| filter.matches(entry))
            .take(cap)
            .collect();

        for entry in &mut matched {
            self.enrich(entry);
        }
        Ok(matched)
    }

    pub async fn stats(&self, since: Option<&str>) -> Result<FirewallStats> {
        let entries = self.logs(0, since).await?;
        Ok(aggregate::stats(&entries))
    }

    /// Per-action counts in time buckets sized for the requested range.
    pub async fn chart_data(&self, since: Option<&str>) -> Result<Vec<ChartPoint>> {
        let since = self.since_expr(since);
        let entries = self.logs(0, Some(since)).await?;
        let width = aggregate::bucket_width(aggregate::since_range(since, Utc::now()));
        Ok(aggregate::chart_data(&entries, width))
    }

    pub async fn aggregated_logs(
        &self,
        since: Option<&str>,
        filter: &LogFilter,
    ) -> Result<Vec<AggregatedEntry>> {
        let entries = self.logs(0, since).await?;
        Ok(aggregate::aggregate(&entries, filter))
    }

    fn enrich(&self, entry: &mut FirewallLogEntry) {
        if let Some(dns) = &self.dns {
            entry.src_hostname = dns.lookup_nonblocking(&entry.src_ip);
        }
    }

    /// Start following the journal.
    ///
    /// Entries arrive on the returned [`LogStream`]. The producer stops when
    /// `cancel` fires, when the journal exits, or when the stream is dropped.
    pub fn subscribe(&self, cancel: CancellationToken) -> Result<LogStream> {
        let mut args = JOURNAL_ARGS.to_vec();
        args.push("-f");

        let mut child = self.tool.spawn_piped(&args)?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CollectorError::Task("journal stdout not captured".to_string()))?;

        let (tx, rx) = mpsc::channel(self.queue);
        let collector = self.clone();
        info!(program = %self.tool.program().display(), "following firewall log");

        let task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();

            loop {
                let line = tokio::select! {
                    _ = cancel.cancelled() => return stop(child).await,
                    _ = tx.closed() => {
                        debug!("log stream consumer went away");
                        return stop(child).await;
                    }
                    line = lines.next_line() => line,
                };

                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => return exited(child).await,
                    Err(e) => {
                        let _ = stop(child).await;
                        return Err(CollectorError::io("journal output", e));
                    }
                };

                let Some(mut entry) = parser::parse_journal_line(&line) else {
                    continue;
                };
                collector.enrich(&mut entry);

                tokio::select! {
                    _ = cancel.cancelled() => return stop(child).await,
                    sent = tx.send(entry) => {
                        if sent.is_err() {
                            debug!("log stream consumer went away");
                            return stop(child).await;
                        }
                    }
                }
            }
        });

        Ok(LogStream { rx, task })
    }

    /// Follow the journal, calling `callback` for every entry until `cancel`
    /// fires or the journal exits.
    pub async fn stream<F>(&self, cancel: CancellationToken, mut callback: F) -> Result<StreamEnd>
    where
        F: FnMut(FirewallLogEntry),
    {
        let mut stream = self.subscribe(cancel.clone())?;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                entry = stream.next() => match entry {
                    Some(entry) => callback(entry),
                    None => break,
                },
            }
        }

        stream.finish().await
    }
}

/// Kill the journal and wait for it to be reaped.
async fn stop(mut child: Child) -> Result<StreamEnd> {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill journal follower");
    }
    info!("firewall log stream cancelled");
    Ok(StreamEnd::Cancelled)
}

async fn exited(mut child: Child) -> Result<StreamEnd> {
    let status: ExitStatus = child
        .wait()
        .await
        .map_err(|e| CollectorError::io("waiting for journal follower", e))?;
    warn!(%status, "journal follower exited");
    Ok(StreamEnd::SourceExited {
        code: status.code(),
    })
}

/// Receiving side of a live firewall log subscription.
#[derive(Debug)]
pub struct LogStream {
    rx: mpsc::Receiver<FirewallLogEntry>,
    task: JoinHandle<Result<StreamEnd>>,
}

impl LogStream {
    /// Next entry, or `None` once the producer has stopped and the queue is
    /// drained.
    pub async fn next(&mut self) -> Option<FirewallLogEntry> {
        self.rx.recv().await
    }

    /// Close the stream and wait for the producer to kill the journal and
    /// finish. Dropping the stream stops the producer the same way.
    pub async fn finish(mut self) -> Result<StreamEnd> {
        self.rx.close();
        self.task
            .await
            .map_err(|e| CollectorError::Task(format!("log stream producer: {e}")))?
    }
}
