// Gateway Telemetry - Library Root
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Telemetry collectors for a Linux network gateway.
//!
//! - [`bandwidth`]: per-interface throughput sampling with bounded history
//! - [`conntrack`]: connection tracking table snapshots and top talkers
//! - [`firewall`]: kernel firewall log queries, live streams and summaries
//! - [`dns`]: reverse DNS cache used to label firewall sources
//!
//! Every external command runs under a deadline; see [`exec`].

pub mod bandwidth;
pub mod config;
pub mod conntrack;
pub mod dns;
pub mod error;
pub mod exec;
pub mod firewall;
pub mod net;
mod tally;

pub use error::{CollectorError, Result};
