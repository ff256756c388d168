use std::time::Duration;

use crate::core::WorkerReport;
use crate::telemetry::{self, tags};
use crate::types::{Record, RunPhase, StageKind};

/// Hooks fired by the stages, workers and sink of a pipeline run.
///
/// Implementations are shared across threads, so every hook takes `&self`.
/// All hooks default to doing nothing; implement the ones you care about.
pub trait PipelineObserver: Send + Sync {
    fn on_phase(&self, _phase: RunPhase) {}

    /// An `add` command pushed a record onto the intake queue.
    fn on_record_added(&self, _record: &Record) {}

    /// A worker announced removal of a record it finished with.
    ///
    /// This is the audit trail of the input stage; it has no data-plane effect.
    fn on_record_removed(&self, _record: &Record) {}

    fn on_record_enriched(&self, _worker_id: usize, _record: &Record, _elapsed: Duration) {}

    fn on_record_filtered(&self, _record: &Record, _accepted: bool) {}

    fn on_record_written(&self, _record: &Record) {}

    fn on_worker_finished(&self, _report: &WorkerReport) {}

    fn on_stage_shutdown(&self, _stage: StageKind) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Default observer: emits `tracing` events and bumps telemetry counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_phase(&self, phase: RunPhase) {
        tracing::debug!(target: tags::TARGET_PIPELINE, phase = phase.as_str(), "run phase changed");
    }

    fn on_record_added(&self, record: &Record) {
        telemetry::increment_counter(tags::METRIC_RECORD_ADDED_COUNT, 1);
        tracing::trace!(
            target: tags::TARGET_PIPELINE,
            id = record.id,
            name = %record.name,
            "record queued for enrichment"
        );
    }

    fn on_record_removed(&self, record: &Record) {
        telemetry::increment_counter(tags::METRIC_RECORD_REMOVED_COUNT, 1);
        tracing::info!(
            target: tags::TARGET_AUDIT,
            id = record.id,
            name = %record.name,
            "announcing removal of player"
        );
    }

    fn on_record_enriched(&self, worker_id: usize, record: &Record, elapsed: Duration) {
        let elapsed_us = elapsed.as_micros().min(u64::MAX as u128) as u64;
        let metric = record.derived_metric.unwrap_or_default();

        telemetry::increment_counter(tags::METRIC_RECORD_ENRICHED_COUNT, 1);
        telemetry::record_histogram(tags::METRIC_ENRICH_LATENCY_US, elapsed_us);
        telemetry::record_histogram(tags::METRIC_DERIVED_METRIC, metric);
        tracing::debug!(
            target: tags::TARGET_WORKER,
            worker_id,
            id = record.id,
            derived_metric = metric,
            elapsed_us,
            "record enriched"
        );
    }

    fn on_record_filtered(&self, record: &Record, accepted: bool) {
        if accepted {
            telemetry::increment_counter(tags::METRIC_RECORD_ACCEPTED_COUNT, 1);
        } else {
            telemetry::increment_counter(tags::METRIC_RECORD_REJECTED_COUNT, 1);
        }
        tracing::trace!(
            target: tags::TARGET_PIPELINE,
            id = record.id,
            accepted,
            "record filtered"
        );
    }

    fn on_record_written(&self, record: &Record) {
        telemetry::increment_counter(tags::METRIC_RECORD_WRITTEN_COUNT, 1);
        tracing::trace!(target: tags::TARGET_SINK, id = record.id, "record written");
    }

    fn on_worker_finished(&self, report: &WorkerReport) {
        telemetry::increment_counter(tags::METRIC_WORKER_FINISHED_COUNT, 1);
        tracing::debug!(
            target: tags::TARGET_WORKER,
            worker_id = report.worker_id,
            records = report.records_processed,
            busy_ms = report.busy.as_millis() as u64,
            "worker drained intake queue"
        );
    }

    fn on_stage_shutdown(&self, stage: StageKind) {
        telemetry::increment_counter(tags::METRIC_STAGE_SHUTDOWN_COUNT, 1);
        tracing::debug!(target: tags::TARGET_PIPELINE, stage = stage.as_str(), "stage shut down");
    }
}
