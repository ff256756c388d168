use std::sync::Arc;
use std::time::Instant;

use crate::core::{Processor, WorkerPool};
use crate::oracle::PrimalityOracle;
use crate::sink::{RecordSink, SinkWorker};
use crate::stage::{InputStage, OutputStage};
use crate::telemetry::{PipelineObserver, TracingObserver, tags};
use crate::types::{Record, Result, RunPhase};

pub mod report;
pub mod types;

pub use report::RunReport;
pub use types::PipelineConfig;

/// End-to-end driver wiring the input stage, workers, output stage and sink.
///
/// The driver is the only synchronisation authority of a run: it closes the
/// input after the last `add`, waits for every worker to signal completion
/// before shutting the output stage down, and waits for the sink before
/// reporting the run as finished.
pub struct Pipeline {
    config: PipelineConfig,
    observer: Arc<dyn PipelineObserver>,
    processor: Processor,
}

impl Pipeline {
    /// Creates a pipeline enriching records with the [`PrimalityOracle`].
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let oracle = PrimalityOracle::new(config.budget);
        Ok(Self {
            config,
            observer: Arc::new(TracingObserver),
            processor: Arc::new(move |record: &Record| oracle.count_from(record.origin_year)),
        })
    }

    /// Replaces the default [`TracingObserver`].
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces the enrichment function run by the workers.
    pub fn with_processor<F>(mut self, processor: F) -> Self
    where
        F: Fn(&Record) -> u64 + Send + Sync + 'static,
    {
        self.processor = Arc::new(processor);
        self
    }

    /// Validated configuration of this pipeline.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Pushes every record through the pipeline and returns the sink once it
    /// has written every surviving record.
    pub fn run<I, S>(&self, records: I, sink: S) -> Result<(S, RunReport)>
    where
        I: IntoIterator<Item = Record>,
        S: RecordSink + Send + 'static,
    {
        let started_at = Instant::now();
        let config = &self.config;
        let observer = &self.observer;
        observer.on_phase(RunPhase::Idle);

        let command_capacity = config.effective_command_capacity();
        let (input_stage, input) = InputStage::new(
            config.intake_capacity,
            command_capacity,
            Arc::clone(observer),
        );
        let (output_stage, output) = OutputStage::new(
            config.effective_result_capacity(),
            command_capacity,
            config.filter,
            Arc::clone(observer),
        );

        let intake = input_stage.intake();
        let sink_handle = SinkWorker::spawn(sink, output_stage.results(), Arc::clone(observer))?;
        let output_stage = output_stage.spawn()?;
        let input_stage = input_stage.spawn()?;
        let pool = WorkerPool::with_observer(config.workers, Arc::clone(observer)).spawn_shared(
            intake,
            output.clone(),
            input.clone(),
            Arc::clone(&self.processor),
        )?;

        tracing::info!(
            target: tags::TARGET_PIPELINE,
            workers = config.workers,
            intake_capacity = config.intake_capacity,
            command_capacity,
            "pipeline started"
        );

        observer.on_phase(RunPhase::Ingesting);
        let mut records_in = 0usize;
        for record in records {
            input.add(record)?;
            records_in += 1;
        }
        input.shutdown()?;
        drop(input);

        observer.on_phase(RunPhase::Draining);
        let workers = pool.wait()?;

        // No worker can submit a filter any more; closing the result stream is safe.
        observer.on_phase(RunPhase::Finalizing);
        output.shutdown()?;
        drop(output);

        // A dead sink makes the output stage fail its next push, so the sink
        // outcome is reported ahead of the stages'.
        let output_outcome = output_stage.join();
        let input_outcome = input_stage.join();
        let (sink, sink_summary) = sink_handle.wait()?;
        let output_report = output_outcome?;
        let input_report = input_outcome?;
        observer.on_phase(RunPhase::Done);

        let report = RunReport {
            elapsed: started_at.elapsed(),
            records_in,
            records_added: input_report.added,
            records_removed: input_report.removed,
            records_accepted: output_report.accepted,
            records_rejected: output_report.rejected,
            records_written: sink_summary.written,
            workers,
        };

        tracing::info!(
            target: tags::TARGET_PIPELINE,
            records_in = report.records_in,
            accepted = report.records_accepted,
            written = report.records_written,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "pipeline finished"
        );

        Ok((sink, report))
    }
}
