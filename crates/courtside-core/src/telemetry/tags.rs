/// Tracing target for dispatcher and driver events.
pub const TARGET_PIPELINE: &str = "courtside::pipeline";
/// Tracing target for worker events.
pub const TARGET_WORKER: &str = "courtside::worker";
/// Tracing target for the removal audit trail.
pub const TARGET_AUDIT: &str = "courtside::audit";
/// Tracing target for sink events.
pub const TARGET_SINK: &str = "courtside::sink";

pub const METRIC_RECORD_ADDED_COUNT: &str = "courtside.record.added.count";
pub const METRIC_RECORD_REMOVED_COUNT: &str = "courtside.record.removed.count";
pub const METRIC_RECORD_ENRICHED_COUNT: &str = "courtside.record.enriched.count";
pub const METRIC_RECORD_ACCEPTED_COUNT: &str = "courtside.record.accepted.count";
pub const METRIC_RECORD_REJECTED_COUNT: &str = "courtside.record.rejected.count";
pub const METRIC_RECORD_WRITTEN_COUNT: &str = "courtside.record.written.count";
pub const METRIC_WORKER_FINISHED_COUNT: &str = "courtside.worker.finished.count";
pub const METRIC_STAGE_SHUTDOWN_COUNT: &str = "courtside.stage.shutdown.count";

pub const METRIC_ENRICH_LATENCY_US: &str = "courtside.enrich.latency_us";
pub const METRIC_DERIVED_METRIC: &str = "courtside.enrich.derived_metric";
