use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::WorkerReport;

/// Outcome of a completed pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub elapsed: Duration,
    /// Records handed to the pipeline by the caller.
    pub records_in: usize,
    /// Records pushed onto the intake queue by the input stage.
    pub records_added: usize,
    /// Removal audits announced by the input stage.
    pub records_removed: usize,
    pub records_accepted: usize,
    pub records_rejected: usize,
    pub records_written: usize,
    pub workers: Vec<WorkerReport>,
}

impl RunReport {
    /// Records enriched across all workers.
    pub fn records_enriched(&self) -> usize {
        self.workers
            .iter()
            .map(|worker| worker.records_processed)
            .sum()
    }

    /// Records enriched per second of wall-clock time.
    pub fn throughput(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds == 0.0 {
            0.0
        } else {
            self.records_enriched() as f64 / seconds
        }
    }
}
