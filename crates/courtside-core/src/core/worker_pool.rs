use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};
use serde::{Deserialize, Serialize};

use crate::core::panic_message;
use crate::error::CourtsideError;
use crate::stage::{InputHandle, OutputHandle};
use crate::telemetry::tags;
use crate::telemetry::{PipelineObserver, TracingObserver};
use crate::types::{Record, Result};

/// Enrichment function applied by every worker.
pub type Processor = Arc<dyn Fn(&Record) -> u64 + Send + Sync>;

/// Completion signal sent by a worker once the intake queue is exhausted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub records_processed: usize,
    /// Time spent inside the processor.
    pub busy: Duration,
    /// Lifetime of the worker thread.
    pub uptime: Duration,
}

impl WorkerReport {
    fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            records_processed: 0,
            busy: Duration::ZERO,
            uptime: Duration::ZERO,
        }
    }

    /// Fraction of the worker's lifetime spent enriching records.
    pub fn utilization(&self) -> f64 {
        if self.uptime.is_zero() {
            0.0
        } else {
            (self.busy.as_secs_f64() / self.uptime.as_secs_f64()).min(1.0)
        }
    }
}

/// Fixed-size pool of threads draining the intake queue.
pub struct WorkerPool {
    num_workers: usize,
    observer: Arc<dyn PipelineObserver>,
}

impl WorkerPool {
    /// Creates a pool reporting through [`TracingObserver`].
    pub fn new(num_workers: usize) -> Self {
        Self::with_observer(num_workers, Arc::new(TracingObserver))
    }

    /// Creates a pool that reports worker events to `observer`.
    pub fn with_observer(num_workers: usize, observer: Arc<dyn PipelineObserver>) -> Self {
        Self {
            num_workers: num_workers.max(1),
            observer,
        }
    }

    /// Number of workers configured in this pool.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Starts the workers.
    ///
    /// Each worker receives records from `intake` until it is closed and
    /// drained, stores `processor(&record)` as the derived metric, then sends
    /// a `filter` command to the output stage followed by a `remove` audit to
    /// the input stage.
    pub fn spawn<F>(
        &self,
        intake: Receiver<Record>,
        output: OutputHandle,
        input: InputHandle,
        processor: F,
    ) -> Result<WorkerPoolHandle>
    where
        F: Fn(&Record) -> u64 + Send + Sync + 'static,
    {
        self.spawn_shared(intake, output, input, Arc::new(processor))
    }

    pub(crate) fn spawn_shared(
        &self,
        intake: Receiver<Record>,
        output: OutputHandle,
        input: InputHandle,
        processor: Processor,
    ) -> Result<WorkerPoolHandle> {
        let (completions_tx, completions_rx) = bounded(self.num_workers);

        let mut worker_handles = Vec::with_capacity(self.num_workers);
        for worker_id in 0..self.num_workers {
            let worker = Worker {
                id: worker_id,
                intake: intake.clone(),
                output: output.clone(),
                input: input.clone(),
                processor: Arc::clone(&processor),
                observer: Arc::clone(&self.observer),
            };
            let completions = completions_tx.clone();

            let handle = thread::Builder::new()
                .name(format!("courtside-worker-{worker_id}"))
                .spawn(move || worker.run(completions))?;
            worker_handles.push(handle);
        }

        Ok(WorkerPoolHandle {
            num_workers: self.num_workers,
            completions: completions_rx,
            worker_handles,
        })
    }
}

/// Runtime handle for a spawned worker pool.
pub struct WorkerPoolHandle {
    num_workers: usize,
    completions: Receiver<WorkerReport>,
    worker_handles: Vec<JoinHandle<Result<()>>>,
}

impl WorkerPoolHandle {
    /// Number of workers the handle waits on.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Waits for exactly one completion signal per worker, then joins them.
    ///
    /// Reports are returned ordered by worker id. A worker that failed or
    /// panicked turns the whole wait into an error.
    pub fn wait(mut self) -> Result<Vec<WorkerReport>> {
        let mut reports = Vec::with_capacity(self.num_workers);
        while reports.len() < self.num_workers {
            match self.completions.recv() {
                Ok(report) => reports.push(report),
                // Every worker is gone; the missing ones died without reporting.
                Err(_) => break,
            }
        }

        self.join_workers()?;

        if reports.len() < self.num_workers {
            return Err(CourtsideError::ThreadPanicked(format!(
                "{} of {} workers exited without signalling completion",
                self.num_workers - reports.len(),
                self.num_workers
            )));
        }

        reports.sort_by_key(|report| report.worker_id);
        Ok(reports)
    }

    fn join_workers(&mut self) -> Result<()> {
        let mut first_error = None;
        for (worker_id, handle) in self.worker_handles.drain(..).enumerate() {
            let outcome = match handle.join() {
                Ok(outcome) => outcome,
                Err(payload) => Err(CourtsideError::ThreadPanicked(format!(
                    "worker {worker_id}: {}",
                    panic_message(payload)
                ))),
            };
            if let Err(err) = outcome {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct Worker {
    id: usize,
    intake: Receiver<Record>,
    output: OutputHandle,
    input: InputHandle,
    processor: Processor,
    observer: Arc<dyn PipelineObserver>,
}

impl Worker {
    fn run(self, completions: Sender<WorkerReport>) -> Result<()> {
        let started_at = Instant::now();
        let mut report = WorkerReport::new(self.id);

        let outcome = self.drain(&mut report);

        report.uptime = started_at.elapsed();
        self.observer.on_worker_finished(&report);
        if completions.send(report).is_err() {
            tracing::warn!(
                target: tags::TARGET_WORKER,
                worker_id = self.id,
                "completion signal dropped; pool handle is gone"
            );
        }
        outcome
    }

    fn drain(&self, report: &mut WorkerReport) -> Result<()> {
        // `iter` ends once the intake queue is closed and empty.
        for mut record in self.intake.iter() {
            let started_at = Instant::now();
            let metric = (self.processor)(&record);
            record.enrich(metric)?;
            let elapsed = started_at.elapsed();

            report.busy += elapsed;
            report.records_processed += 1;
            self.observer.on_record_enriched(self.id, &record, elapsed);

            self.output.filter(record.clone())?;
            self.input.remove(record)?;
        }
        Ok(())
    }
}
