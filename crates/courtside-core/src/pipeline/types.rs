use serde::{Deserialize, Serialize};

use crate::error::CourtsideError;
use crate::oracle::PrimeBudget;
use crate::stage::default_command_capacity;
use crate::types::{RecordFilter, Result};

/// Construction config for the pipeline.
///
/// Capacities are counted in records (or commands) per queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of worker threads draining the intake queue.
    pub workers: usize,
    /// Capacity of the intake queue feeding the workers.
    pub intake_capacity: usize,
    /// Capacity of each stage's command queue. Defaults to 3x the intake capacity.
    ///
    /// The input stage applies it per lane: `add`/`shutdown` commands and
    /// `remove` audits each get this many slots.
    pub command_capacity: Option<usize>,
    /// Capacity of the result queue feeding the sink. Defaults to the intake capacity.
    pub result_capacity: Option<usize>,
    /// Work budget of the primality oracle, per record.
    pub budget: PrimeBudget,
    /// Predicate deciding which enriched records reach the sink.
    pub filter: RecordFilter,
}

impl PipelineConfig {
    /// Worker count used when none is configured.
    pub const DEFAULT_WORKERS: usize = 4;
    /// Intake capacity used when the input length is unknown.
    pub const DEFAULT_INTAKE_CAPACITY: usize = 64;

    /// Config with explicit worker count and intake capacity; everything else defaults.
    pub fn new(workers: usize, intake_capacity: usize) -> Self {
        Self {
            workers,
            intake_capacity,
            ..Self::default()
        }
    }

    /// Sizes the intake queue to half of the input, as the batch job always has.
    pub fn for_input_len(len: usize) -> Self {
        Self {
            intake_capacity: (len / 2).max(1),
            ..Self::default()
        }
    }

    /// Sets the oracle budget spent on each record.
    pub fn with_budget(mut self, budget: PrimeBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Sets the predicate applied by the output stage.
    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Command queue capacity after applying the 3x default.
    pub fn effective_command_capacity(&self) -> usize {
        self.command_capacity
            .unwrap_or_else(|| default_command_capacity(self.intake_capacity))
    }

    /// Result queue capacity after falling back to the intake capacity.
    pub fn effective_result_capacity(&self) -> usize {
        self.result_capacity.unwrap_or(self.intake_capacity)
    }

    /// Rejects zero workers, zero capacities and non-finite thresholds.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(CourtsideError::InvalidConfig("workers must be at least 1"));
        }
        if self.intake_capacity == 0 {
            return Err(CourtsideError::InvalidConfig(
                "intake capacity must be greater than zero",
            ));
        }
        if self.command_capacity == Some(0) {
            return Err(CourtsideError::InvalidConfig(
                "command capacity must be greater than zero",
            ));
        }
        if self.result_capacity == Some(0) {
            return Err(CourtsideError::InvalidConfig(
                "result capacity must be greater than zero",
            ));
        }
        if !self.filter.min_rate.is_finite() {
            return Err(CourtsideError::InvalidConfig(
                "filter rate threshold must be finite",
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: Self::DEFAULT_WORKERS,
            intake_capacity: Self::DEFAULT_INTAKE_CAPACITY,
            command_capacity: None,
            result_capacity: None,
            budget: PrimeBudget::default(),
            filter: RecordFilter::default(),
        }
    }
}
