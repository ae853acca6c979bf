// Gateway Telemetry - DNS Module
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Reverse DNS enrichment.

mod cache;
mod resolver;

pub use cache::{DnsCache, DEFAULT_MAX_ENTRIES, DEFAULT_TIMEOUT, DEFAULT_TTL};
pub use resolver::{ReverseResolver, SystemResolver};
