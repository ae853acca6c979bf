// Gateway Telemetry - Bandwidth Module
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Interface throughput sampling with bounded history.

mod counters;
mod interface;
pub mod models;
mod ring;
mod sampler;

pub use counters::{parse_proc_net_dev, CounterSource, ProcNetDev};
pub use interface::MonitoredInterface;
pub use models::{BandwidthSample, InterfaceCounters, InterfaceHistory, SamplerState};
pub use ring::SampleRing;
pub use sampler::BandwidthSampler;
