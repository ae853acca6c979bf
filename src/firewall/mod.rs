// Gateway Telemetry - Firewall Module
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Kernel firewall log collection: historical queries, live streams and
//! summaries.

mod aggregate;
mod collector;
pub mod models;
mod parser;

pub use aggregate::{aggregate, bucket_width, chart_data, since_range, stats};
pub use collector::{FirewallCollector, LogStream, DEFAULT_QUEUE, DEFAULT_SINCE};
pub use models::{
    Action, AggregatedEntry, ChartPoint, FirewallLogEntry, FirewallStats, LogFilter, PortCount,
    StreamEnd,
};
pub use parser::{parse_journal_line, parse_journal_output, parse_kernel_message};
