// Gateway Telemetry - Bandwidth Sampler
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Fixed-interval throughput sampling into per-interface history.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::counters::CounterSource;
use super::interface::MonitoredInterface;
use super::models::{BandwidthSample, InterfaceCounters, InterfaceHistory, SamplerState};
use super::ring::SampleRing;

/// Mutable sampler state, guarded by a single lock.
#[derive(Debug)]
struct SamplerInner {
    state: SamplerState,
    history: HashMap<String, SampleRing>,
    prev_counters: HashMap<String, InterfaceCounters>,
    prev_time: Option<Instant>,
}

impl SamplerInner {
    /// Fold one counter reading into history.
    ///
    /// Rates are only produced for interfaces that already have a baseline;
    /// every reading becomes the baseline for the next one. A reading taken
    /// before the current baseline is dropped and `false` returned.
    fn record(
        &mut self,
        counters: &HashMap<String, InterfaceCounters>,
        now: Instant,
        wall: DateTime<Utc>,
    ) -> bool {
        if let Some(prev_time) = self.prev_time {
            if now < prev_time {
                debug!("dropping counter reading older than the baseline");
                return false;
            }
            let elapsed = now.saturating_duration_since(prev_time).as_secs_f64();
            if elapsed > 0.0 {
                for (name, ring) in self.history.iter_mut() {
                    let Some(current) = counters.get(name) else {
                        continue;
                    };
                    let Some(prev) = self.prev_counters.get(name) else {
                        continue;
                    };

                    ring.add(BandwidthSample {
                        timestamp: wall,
                        rx_bps: per_second(prev.rx_bytes, current.rx_bytes, elapsed),
                        tx_bps: per_second(prev.tx_bytes, current.tx_bytes, elapsed),
                    });
                }
            }
        }

        for (name, current) in counters {
            self.prev_counters.insert(name.clone(), *current);
        }
        self.prev_time = Some(now);
        true
    }
}

/// Rate between two cumulative readings, zero when the counter went backwards.
fn per_second(prev: u64, current: u64, elapsed_secs: f64) -> u64 {
    current
        .checked_sub(prev)
        .map(|delta| (delta as f64 / elapsed_secs) as u64)
        .unwrap_or(0)
}

struct Shared {
    source: Box<dyn CounterSource>,
    inner: RwLock<SamplerInner>,
}

impl Shared {
    /// Take one reading. Returns whether anything was recorded.
    fn tick(&self) -> bool {
        // Read outside the lock; the source may touch the filesystem.
        let counters = match self.source.read() {
            Ok(counters) => counters,
            Err(e) => {
                warn!(error = %e, "interface counters unreadable, skipping sample");
                return false;
            }
        };
        let (now, wall) = (Instant::now(), Utc::now());

        let Ok(mut inner) = self.inner.write() else {
            return false;
        };
        if inner.state == SamplerState::Stopped {
            return false;
        }

        inner.record(&counters, now, wall)
    }
}

/// Background sampler computing per-interface receive/transmit rates.
pub struct BandwidthSampler {
    interfaces: Vec<MonitoredInterface>,
    sample_rate: Duration,
    capacity: usize,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl BandwidthSampler {
    /// Create a sampler keeping `retention / sample_rate` samples per interface.
    pub fn new(
        interfaces: Vec<MonitoredInterface>,
        sample_rate: Duration,
        retention: Duration,
        source: impl CounterSource,
    ) -> Self {
        let sample_rate = if sample_rate.is_zero() {
            Duration::from_secs(1)
        } else {
            sample_rate
        };
        let capacity = ((retention.as_nanos() / sample_rate.as_nanos()) as usize).max(1);

        let history = interfaces
            .iter()
            .map(|iface| (iface.name.clone(), SampleRing::new(capacity)))
            .collect();

        Self {
            interfaces,
            sample_rate,
            capacity,
            shared: Arc::new(Shared {
                source: Box::new(source),
                inner: RwLock::new(SamplerInner {
                    state: SamplerState::Idle,
                    history,
                    prev_counters: HashMap::new(),
                    prev_time: None,
                }),
            }),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Per-interface sample capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn interfaces(&self) -> &[MonitoredInterface] {
        &self.interfaces
    }

    pub fn state(&self) -> SamplerState {
        self.shared
            .inner
            .read()
            .map(|inner| inner.state)
            .unwrap_or(SamplerState::Stopped)
    }

    /// Start background sampling. Must be called from within a Tokio runtime.
    ///
    /// Takes a baseline reading immediately, then one every `sample_rate`.
    pub fn start(&mut self) {
        {
            let Ok(mut inner) = self.shared.inner.write() else {
                return;
            };
            if inner.state != SamplerState::Idle {
                warn!(state = ?inner.state, "bandwidth sampler already started");
                return;
            }
            inner.state = SamplerState::Sampling;
        }

        let shared = Arc::clone(&self.shared);
        let cancel = self.cancel.clone();
        let sample_rate = self.sample_rate;

        self.task = Some(tokio::spawn(async move {
            shared.tick();

            let mut ticker = tokio::time::interval(sample_rate);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; the baseline covers it.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        shared.tick();
                    }
                }
            }
            debug!("bandwidth sampler task exited");
        }));

        info!(
            interfaces = self.interfaces.len(),
            ?sample_rate,
            capacity = self.capacity,
            "bandwidth sampler started"
        );
    }

    /// Stop sampling and wait for the background task to exit.
    ///
    /// Once this returns no further samples are written.
    pub async fn stop(&mut self) {
        if let Ok(mut inner) = self.shared.inner.write() {
            inner.state = SamplerState::Stopped;
        }
        self.cancel.cancel();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "bandwidth sampler task failed");
            }
        }
        info!("bandwidth sampler stopped");
    }

    /// Take a reading right now, outside the schedule.
    ///
    /// Returns `false` when nothing was recorded (source unreadable or
    /// sampler stopped).
    pub fn sample_now(&self) -> bool {
        self.shared.tick()
    }

    /// History for one interface. `since` of `None` or zero returns everything retained.
    pub fn history(&self, name: &str, since: Option<Duration>) -> Option<InterfaceHistory> {
        let iface = self.interfaces.iter().find(|i| i.name == name)?;
        let inner = self.shared.inner.read().ok()?;
        let ring = inner.history.get(name)?;

        Some(build_history(iface, ring, cutoff(since)))
    }

    /// History for every monitored interface, in configuration order.
    pub fn all_history(&self, since: Option<Duration>) -> Vec<InterfaceHistory> {
        let Ok(inner) = self.shared.inner.read() else {
            return Vec::new();
        };
        let cutoff = cutoff(since);

        self.interfaces
            .iter()
            .filter_map(|iface| {
                inner
                    .history
                    .get(&iface.name)
                    .map(|ring| build_history(iface, ring, cutoff))
            })
            .collect()
    }
}

impl Drop for BandwidthSampler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn cutoff(since: Option<Duration>) -> Option<DateTime<Utc>> {
    let since = since.filter(|d| !d.is_zero())?;
    let delta = chrono::Duration::from_std(since).ok()?;
    Utc::now().checked_sub_signed(delta)
}

fn build_history(
    iface: &MonitoredInterface,
    ring: &SampleRing,
    cutoff: Option<DateTime<Utc>>,
) -> InterfaceHistory {
    InterfaceHistory {
        name: iface.name.clone(),
        display_name: iface.label().to_string(),
        kind: iface.interface_type(),
        samples: match cutoff {
            Some(cutoff) => ring.since(cutoff),
            None => ring.all(),
        },
    }
}
