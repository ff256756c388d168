mod support;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use courtside_core::{
    CourtsideError, InputStage, NoopObserver, OutputStage, PipelineObserver, RecordFilter,
    WorkerPool,
};
use support::{RecordingObserver, player};

fn accept_all() -> RecordFilter {
    RecordFilter::new(0, f64::MIN)
}

#[test]
fn worker_pool_enriches_every_record_once() -> Result<(), Box<dyn std::error::Error>> {
    let observer = RecordingObserver::new();
    let shared: Arc<dyn PipelineObserver> = observer.clone();
    let (input_stage, input) = InputStage::new(8, 24, Arc::clone(&shared));
    let (output_stage, output) = OutputStage::new(64, 192, accept_all(), Arc::clone(&shared));
    let intake = input_stage.intake();
    let results = output_stage.results();
    let input_dispatcher = input_stage.spawn()?;
    let output_dispatcher = output_stage.spawn()?;

    let pool = WorkerPool::with_observer(4, Arc::clone(&shared));
    let handle = pool.spawn(intake, output.clone(), input.clone(), |record| {
        record.origin_year as u64 * 2
    })?;

    for id in 0..50u64 {
        input.add(player(id, 1900 + id as i64, 10.0))?;
    }
    input.shutdown()?;
    drop(input);

    let reports = handle.wait()?;
    assert_eq!(reports.len(), 4);
    assert_eq!(
        reports.iter().map(|report| report.worker_id).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
    let processed: usize = reports.iter().map(|report| report.records_processed).sum();
    assert_eq!(processed, 50);

    output.shutdown()?;
    let mut written: Vec<_> = results.iter().collect();
    written.sort_by_key(|record| record.id);
    assert_eq!(written.len(), 50);
    for record in &written {
        assert_eq!(record.derived_metric, Some(record.origin_year as u64 * 2));
    }

    assert_eq!(output_dispatcher.join()?.accepted, 50);
    assert_eq!(input_dispatcher.join()?.removed, 50);

    let events = observer.events();
    let enriched_ids: BTreeSet<u64> = events.enriched.iter().map(|(_, id)| *id).collect();
    assert_eq!(enriched_ids.len(), 50);
    assert_eq!(events.enriched.len(), 50);
    assert_eq!(events.workers_finished.len(), 4);
    Ok(())
}

#[test]
fn worker_count_is_clamped_to_one() {
    assert_eq!(WorkerPool::new(0).num_workers(), 1);
    assert_eq!(WorkerPool::new(3).num_workers(), 3);
}

#[test]
fn workers_signal_completion_on_empty_input() -> Result<(), Box<dyn std::error::Error>> {
    let noop: Arc<dyn PipelineObserver> = Arc::new(NoopObserver);
    let (input_stage, input) = InputStage::new(1, 3, Arc::clone(&noop));
    let (output_stage, output) = OutputStage::new(1, 3, accept_all(), Arc::clone(&noop));
    let intake = input_stage.intake();
    let input_dispatcher = input_stage.spawn()?;
    let output_dispatcher = output_stage.spawn()?;

    let handle = WorkerPool::with_observer(3, noop).spawn(
        intake,
        output.clone(),
        input.clone(),
        |_| 0,
    )?;
    input.shutdown()?;
    drop(input);

    let reports = handle.wait()?;
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|report| report.records_processed == 0));

    output.shutdown()?;
    output_dispatcher.join()?;
    input_dispatcher.join()?;
    Ok(())
}

#[test]
fn slow_workers_spread_the_load() -> Result<(), Box<dyn std::error::Error>> {
    let noop: Arc<dyn PipelineObserver> = Arc::new(NoopObserver);
    let (input_stage, input) = InputStage::new(4, 12, Arc::clone(&noop));
    let (output_stage, output) = OutputStage::new(32, 96, accept_all(), Arc::clone(&noop));
    let intake = input_stage.intake();
    let results = output_stage.results();
    let input_dispatcher = input_stage.spawn()?;
    let output_dispatcher = output_stage.spawn()?;

    let handle = WorkerPool::with_observer(4, noop).spawn(
        intake,
        output.clone(),
        input.clone(),
        |record| {
            thread::sleep(Duration::from_millis(5));
            record.id
        },
    )?;
    for id in 0..32 {
        input.add(player(id, 1990, 10.0))?;
    }
    input.shutdown()?;
    drop(input);

    let reports = handle.wait()?;
    assert!(reports.iter().all(|report| report.records_processed > 0));
    assert!(reports.iter().all(|report| report.busy >= Duration::from_millis(5)));

    output.shutdown()?;
    assert_eq!(results.iter().count(), 32);
    output_dispatcher.join()?;
    input_dispatcher.join()?;
    Ok(())
}

#[test]
fn panicking_worker_fails_the_wait() -> Result<(), Box<dyn std::error::Error>> {
    let noop: Arc<dyn PipelineObserver> = Arc::new(NoopObserver);
    let (input_stage, input) = InputStage::new(8, 24, Arc::clone(&noop));
    let (output_stage, output) = OutputStage::new(8, 24, accept_all(), Arc::clone(&noop));
    let intake = input_stage.intake();
    let results = output_stage.results();
    let _input_dispatcher = input_stage.spawn()?;
    let output_dispatcher = output_stage.spawn()?;

    let handle = WorkerPool::with_observer(1, noop).spawn(
        intake,
        output.clone(),
        input.clone(),
        |record| {
            if record.id == 3 {
                panic!("boom");
            }
            1
        },
    )?;
    for id in 1..=5 {
        input.add(player(id, 1990, 10.0))?;
    }
    input.shutdown()?;
    drop(input);

    match handle.wait() {
        Err(CourtsideError::ThreadPanicked(message)) => assert!(message.contains("boom")),
        other => panic!("unexpected result: {other:?}"),
    }

    output.shutdown()?;
    let survivors: Vec<u64> = results.iter().map(|record| record.id).collect();
    assert_eq!(survivors, vec![1, 2]);
    output_dispatcher.join()?;
    Ok(())
}
