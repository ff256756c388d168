//! In-process metrics for pipeline runs.
//!
//! Counters and histograms are only collected with the `telemetry` feature;
//! without it every recording call is a no-op and [`snapshot`] is empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod observer;
pub mod tags;

pub use observer::{NoopObserver, PipelineObserver, TracingObserver};

/// Running summary of one histogram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub total: u64,
    pub min: u64,
    pub max: u64,
}

impl HistogramSnapshot {
    /// Arithmetic mean of all samples, `0.0` when empty.
    pub fn mean(&self) -> f64 {
        match self.count {
            0 => 0.0,
            count => self.total as f64 / count as f64,
        }
    }

    #[cfg_attr(not(feature = "telemetry"), allow(dead_code))]
    fn observe(&mut self, sample: u64) {
        let first = self.count == 0;
        self.min = if first { sample } else { self.min.min(sample) };
        self.max = if first { sample } else { self.max.max(sample) };
        self.count = self.count.saturating_add(1);
        self.total = self.total.saturating_add(sample);
    }
}

/// Copy of the registry taken by [`snapshot`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub counters: BTreeMap<String, u64>,
    pub histograms: BTreeMap<String, HistogramSnapshot>,
}

impl TelemetrySnapshot {
    /// Value of a counter, if it was ever incremented.
    pub fn counter(&self, name: &str) -> Option<u64> {
        self.counters.get(name).copied()
    }

    /// Summary of a histogram, if it ever received a sample.
    pub fn histogram(&self, name: &str) -> Option<HistogramSnapshot> {
        self.histograms.get(name).copied()
    }
}

/// Adds `value` to a named counter.
#[inline]
pub fn increment_counter(name: &'static str, value: u64) {
    #[cfg(feature = "telemetry")]
    registry::with(|registry| {
        let counter = registry.counters.entry(name).or_default();
        *counter = counter.saturating_add(value);
    });

    #[cfg(not(feature = "telemetry"))]
    let _ = (name, value);
}

/// Records one sample into a named histogram.
#[inline]
pub fn record_histogram(name: &'static str, sample: u64) {
    #[cfg(feature = "telemetry")]
    registry::with(|registry| registry.histograms.entry(name).or_default().observe(sample));

    #[cfg(not(feature = "telemetry"))]
    let _ = (name, sample);
}

/// Point-in-time copy of every counter and histogram.
pub fn snapshot() -> TelemetrySnapshot {
    #[cfg(feature = "telemetry")]
    {
        registry::with(|registry| TelemetrySnapshot {
            counters: registry
                .counters
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
            histograms: registry
                .histograms
                .iter()
                .map(|(name, summary)| (name.to_string(), *summary))
                .collect(),
        })
    }

    #[cfg(not(feature = "telemetry"))]
    {
        TelemetrySnapshot::default()
    }
}

/// Drops every recorded value.
pub fn reset() {
    #[cfg(feature = "telemetry")]
    registry::with(|store| *store = registry::Registry::default());
}

#[cfg(feature = "telemetry")]
mod registry {
    use std::collections::BTreeMap;
    use std::sync::{Mutex, PoisonError};

    use super::HistogramSnapshot;

    #[derive(Default)]
    pub(super) struct Registry {
        pub(super) counters: BTreeMap<&'static str, u64>,
        pub(super) histograms: BTreeMap<&'static str, HistogramSnapshot>,
    }

    static REGISTRY: Mutex<Registry> = Mutex::new(Registry {
        counters: BTreeMap::new(),
        histograms: BTreeMap::new(),
    });

    /// Runs `f` with the registry locked, recovering from poisoning.
    pub(super) fn with<T>(f: impl FnOnce(&mut Registry) -> T) -> T {
        let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut registry)
    }
}
