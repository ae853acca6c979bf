// Gateway Telemetry - Conntrack Module
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Snapshot of the kernel connection tracking table.

mod aggregate;
mod collector;
pub mod models;
mod parser;

pub use aggregate::{summarize, top_talkers};
pub use collector::{validate_protocol, ConntrackCollector, ALLOWED_PROTOCOLS};
pub use models::{Connection, ConnectionFilter, ConnectionStats, IpCount, TalkerStats};
pub use parser::{parse_line, parse_output};
