use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CourtsideError;

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, CourtsideError>;

/// A single player record flowing through the pipeline.
///
/// Records are created during ingestion, enriched exactly once by a worker
/// and are read-only afterwards. They move between stages by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    #[serde(rename = "lastName")]
    pub name: String,
    /// Birth year of the player; the source dataset stores it under `age`.
    #[serde(rename = "age")]
    pub origin_year: i64,
    #[serde(rename = "pointsPerGame")]
    pub rate: f64,
    #[serde(
        rename = "primeNumberCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub derived_metric: Option<u64>,
}

impl Record {
    /// Creates a record that has not been enriched yet.
    pub fn new(id: u64, name: impl Into<String>, origin_year: i64, rate: f64) -> Self {
        Self {
            id,
            name: name.into(),
            origin_year,
            rate,
            derived_metric: None,
        }
    }

    /// Stores the derived metric. A record can only be enriched once.
    pub fn enrich(&mut self, metric: u64) -> Result<()> {
        if self.derived_metric.is_some() {
            return Err(CourtsideError::AlreadyEnriched(self.id));
        }
        self.derived_metric = Some(metric);
        Ok(())
    }

    /// Whether a worker has already set the derived metric.
    pub fn is_enriched(&self) -> bool {
        self.derived_metric.is_some()
    }
}

/// Predicate applied by the output stage.
///
/// A record survives when `derived_metric >= min_metric` and
/// `rate > min_rate`. Records that were never enriched never survive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub min_metric: u64,
    pub min_rate: f64,
}

impl RecordFilter {
    /// Minimum derived metric a record needs by default.
    pub const DEFAULT_MIN_METRIC: u64 = 295;
    /// Rate a record must exceed by default.
    pub const DEFAULT_MIN_RATE: f64 = 15.0;

    pub fn new(min_metric: u64, min_rate: f64) -> Self {
        Self {
            min_metric,
            min_rate,
        }
    }

    /// Evaluates the predicate. Records that were never enriched are rejected.
    pub fn accepts(&self, record: &Record) -> bool {
        match record.derived_metric {
            Some(metric) => metric >= self.min_metric && record.rate > self.min_rate,
            None => false,
        }
    }
}

impl Default for RecordFilter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_METRIC, Self::DEFAULT_MIN_RATE)
    }
}

/// Kind of command exchanged between pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Add,
    Remove,
    Filter,
    Shutdown,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Filter => "filter",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which dispatcher a lifecycle event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Input,
    Output,
}

impl StageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
        }
    }
}

/// Lifecycle of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// Stages constructed, nothing submitted yet.
    Idle,
    /// The driver is issuing `add` commands.
    Ingesting,
    /// Input is closed and workers are draining the intake queue.
    Draining,
    /// All workers finished; the output stage shutdown is in flight.
    Finalizing,
    /// The sink signalled completion.
    Done,
}

impl RunPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ingesting => "ingesting",
            Self::Draining => "draining",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
        }
    }
}
