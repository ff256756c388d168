mod support;

use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

use courtside_core::{
    CourtsideError, MemorySink, Pipeline, PipelineConfig, PrimeBudget, Record, RecordFilter,
    RecordSink, Result as CourtsideResult, RunPhase, StageKind,
};
use support::{RecordingObserver, player};

fn step_config(workers: usize, intake_capacity: usize) -> PipelineConfig {
    PipelineConfig::new(workers, intake_capacity).with_budget(PrimeBudget::Steps(2000))
}

fn varied_records(count: u64) -> Vec<Record> {
    (0..count)
        .map(|id| player(id, 1000 + (id as i64 * 37) % 1500, (id % 40) as f64))
        .collect()
}

#[test]
fn only_qualifying_records_reach_the_sink() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::new(step_config(4, 2))?;
    let records = vec![player(1, 2000, 20.0), player(2, 1000, 5.0)];

    let (sink, report) = pipeline.run(records, MemorySink::new())?;

    assert_eq!(sink.sorted_ids(), vec![1]);
    assert_eq!(sink.records()[0].derived_metric, Some(303));
    assert_eq!(report.records_in, 2);
    assert_eq!(report.records_added, 2);
    assert_eq!(report.records_removed, 2);
    assert_eq!(report.records_accepted, 1);
    assert_eq!(report.records_rejected, 1);
    assert_eq!(report.records_written, 1);
    assert_eq!(report.records_enriched(), 2);
    Ok(())
}

#[test]
fn empty_input_completes_without_writing() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::new(step_config(4, 1))?;

    let (sink, report) = pipeline.run(Vec::new(), MemorySink::new())?;

    assert!(sink.records().is_empty());
    assert_eq!(report.records_in, 0);
    assert_eq!(report.records_written, 0);
    assert_eq!(report.workers.len(), 4);
    assert!(report.workers.iter().all(|worker| worker.records_processed == 0));
    Ok(())
}

#[test]
fn every_surviving_record_is_written_exactly_once() -> Result<(), Box<dyn std::error::Error>> {
    let filter = RecordFilter::new(300, 15.0);
    let pipeline = Pipeline::new(PipelineConfig::new(6, 4).with_filter(filter))?
        .with_processor(|record| (record.id % 7) * 100);
    let records = varied_records(300);

    let expected: BTreeSet<u64> = records
        .iter()
        .filter(|record| (record.id % 7) * 100 >= 300 && record.rate > 15.0)
        .map(|record| record.id)
        .collect();

    let (sink, report) = pipeline.run(records, MemorySink::new())?;
    let written = sink.sorted_ids();
    let unique: BTreeSet<u64> = written.iter().copied().collect();

    assert_eq!(written.len(), unique.len(), "a record was written twice");
    assert_eq!(unique, expected);
    assert_eq!(report.records_accepted, expected.len());
    assert_eq!(report.records_accepted + report.records_rejected, 300);
    Ok(())
}

#[test]
fn no_record_is_lost_for_any_worker_count() -> Result<(), Box<dyn std::error::Error>> {
    for workers in [1, 2, 3, 8] {
        let config = PipelineConfig::new(workers, 3).with_filter(RecordFilter::new(0, f64::MIN));
        let pipeline = Pipeline::new(config)?.with_processor(|record| record.id);

        let (sink, report) = pipeline.run(varied_records(120), MemorySink::new())?;

        assert_eq!(sink.sorted_ids(), (0..120).collect::<Vec<_>>());
        assert_eq!(report.records_enriched(), 120);
        assert_eq!(report.records_removed, 120);
    }
    Ok(())
}

#[test]
fn one_worker_and_eight_workers_write_the_same_records() -> Result<(), Box<dyn std::error::Error>>
{
    let config = |workers| {
        PipelineConfig::new(workers, 8)
            .with_budget(PrimeBudget::Steps(1500))
            .with_filter(RecordFilter::new(150, 10.0))
    };

    let (single, _) = Pipeline::new(config(1))?.run(varied_records(80), MemorySink::new())?;
    let (many, _) = Pipeline::new(config(8))?.run(varied_records(80), MemorySink::new())?;

    let mut single = single.into_records();
    let mut many = many.into_records();
    single.sort_by_key(|record| record.id);
    many.sort_by_key(|record| record.id);

    assert!(!single.is_empty());
    assert_eq!(single, many);
    Ok(())
}

#[test]
fn output_stays_open_until_delayed_workers_finish() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = PipelineConfig::new(3, 1).with_filter(RecordFilter::new(0, f64::MIN));
    config.command_capacity = Some(1);
    config.result_capacity = Some(1);
    let pipeline = Pipeline::new(config)?.with_processor(|record| {
        thread::sleep(Duration::from_millis(2 * (record.id % 3)));
        record.id
    });

    let (sink, report) = pipeline.run(varied_records(30), MemorySink::new())?;

    assert_eq!(sink.sorted_ids(), (0..30).collect::<Vec<_>>());
    assert_eq!(report.records_accepted, 30);
    assert_eq!(report.records_written, 30);
    Ok(())
}

#[test]
fn minimal_queues_do_not_deadlock() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = PipelineConfig::new(2, 1).with_filter(RecordFilter::new(0, f64::MIN));
    config.command_capacity = Some(1);
    config.result_capacity = Some(1);
    let pipeline = Pipeline::new(config)?.with_processor(|record| record.id);

    let (sink, report) = pipeline.run(varied_records(500), MemorySink::new())?;

    assert_eq!(sink.records().len(), 500);
    assert_eq!(report.records_removed, 500);
    Ok(())
}

#[test]
fn observer_sees_the_run_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let observer = RecordingObserver::new();
    let pipeline = Pipeline::new(step_config(2, 2))?.with_observer(observer.clone());

    pipeline.run(
        vec![player(1, 2000, 20.0), player(2, 1000, 5.0)],
        MemorySink::new(),
    )?;

    let events = observer.events();
    assert_eq!(
        events.phases,
        vec![
            RunPhase::Idle,
            RunPhase::Ingesting,
            RunPhase::Draining,
            RunPhase::Finalizing,
            RunPhase::Done,
        ]
    );
    assert_eq!(events.added, vec![1, 2]);
    let mut removed = events.removed.clone();
    removed.sort_unstable();
    assert_eq!(removed, vec![1, 2]);
    assert_eq!(events.written, vec![1]);
    assert_eq!(events.workers_finished.len(), 2);
    assert!(events.shutdowns.contains(&StageKind::Input));
    assert!(events.shutdowns.contains(&StageKind::Output));
    Ok(())
}

struct FailingSink {
    fail_after: usize,
    written: usize,
}

impl RecordSink for FailingSink {
    fn write_record(&mut self, _record: &Record) -> CourtsideResult<()> {
        if self.written == self.fail_after {
            return Err(CourtsideError::SinkWrite("disk full".to_string()));
        }
        self.written += 1;
        Ok(())
    }
}

#[test]
fn sink_failure_fails_the_run_without_stalling() -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig::new(2, 1).with_filter(RecordFilter::new(0, f64::MIN));
    let pipeline = Pipeline::new(config)?.with_processor(|record| record.id);
    let sink = FailingSink {
        fail_after: 1,
        written: 0,
    };

    match pipeline.run(varied_records(40), sink) {
        Err(CourtsideError::SinkWrite(message)) => assert!(message.contains("disk full")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("run should fail when the sink cannot write"),
    }
    Ok(())
}

struct PanickingSink;

impl RecordSink for PanickingSink {
    fn write_record(&mut self, _record: &Record) -> CourtsideResult<()> {
        panic!("sink exploded");
    }
}

#[test]
fn sink_panic_is_reported_over_downstream_failures() -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig::new(2, 1).with_filter(RecordFilter::new(0, f64::MIN));
    let pipeline = Pipeline::new(config)?.with_processor(|record| record.id);

    match pipeline.run(varied_records(50), PanickingSink) {
        Err(CourtsideError::ThreadPanicked(message)) => {
            assert!(message.starts_with("sink"));
            assert!(message.contains("sink exploded"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("run should fail when the sink panics"),
    }
    Ok(())
}

#[test]
fn invalid_configuration_is_rejected() {
    let cases = [
        PipelineConfig::new(0, 4),
        PipelineConfig::new(4, 0),
        PipelineConfig {
            command_capacity: Some(0),
            ..PipelineConfig::default()
        },
        PipelineConfig::default().with_filter(RecordFilter::new(1, f64::NAN)),
    ];

    for config in cases {
        assert!(matches!(
            Pipeline::new(config),
            Err(CourtsideError::InvalidConfig(_))
        ));
    }
}

#[test]
fn config_defaults_follow_the_batch_job() {
    let config = PipelineConfig::default();
    assert_eq!(config.workers, 4);
    assert_eq!(config.effective_command_capacity(), 3 * config.intake_capacity);
    assert_eq!(config.effective_result_capacity(), config.intake_capacity);
    assert_eq!(config.filter, RecordFilter::default());

    assert_eq!(PipelineConfig::for_input_len(100).intake_capacity, 50);
    assert_eq!(PipelineConfig::for_input_len(1).intake_capacity, 1);
    assert_eq!(PipelineConfig::for_input_len(0).effective_command_capacity(), 3);
}

#[test]
fn default_processor_counts_primes_below_origin_year() -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig::new(1, 1)
        .with_budget(PrimeBudget::Steps(10))
        .with_filter(RecordFilter::new(4, 0.0));
    let pipeline = Pipeline::new(config)?;

    let (sink, _) = pipeline.run(
        vec![player(1, 10, 1.0), player(2, 4, 1.0)],
        MemorySink::new(),
    )?;

    assert_eq!(sink.sorted_ids(), vec![1]);
    assert_eq!(sink.records()[0].derived_metric, Some(4));
    Ok(())
}

#[test]
fn pipeline_can_be_reused_across_runs() -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::new(step_config(2, 4))?;
    for _ in 0..3 {
        let (sink, _) = pipeline.run(vec![player(1, 2000, 20.0)], MemorySink::new())?;
        assert_eq!(sink.sorted_ids(), vec![1]);
    }
    Ok(())
}
