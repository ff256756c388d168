#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use courtside_core::{PipelineObserver, Record, RunPhase, StageKind, WorkerReport};
use crossbeam_channel::Sender;

pub fn player(id: u64, origin_year: i64, rate: f64) -> Record {
    Record::new(id, format!("player-{id}"), origin_year, rate)
}

pub fn enriched(id: u64, metric: u64, rate: f64) -> Record {
    let mut record = player(id, 1990, rate);
    record.derived_metric = Some(metric);
    record
}

#[derive(Debug, Clone, Default)]
pub struct Events {
    pub phases: Vec<RunPhase>,
    pub added: Vec<u64>,
    pub removed: Vec<u64>,
    pub enriched: Vec<(usize, u64)>,
    pub filtered: Vec<(u64, bool)>,
    pub written: Vec<u64>,
    pub workers_finished: Vec<usize>,
    pub shutdowns: Vec<StageKind>,
}

/// Observer that records every callback for later assertions.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Events>,
    removals: Option<Sender<u64>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Also forwards every removal audit to `removals` as it happens.
    pub fn forwarding_removals(removals: Sender<u64>) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Events::default()),
            removals: Some(removals),
        })
    }

    pub fn events(&self) -> Events {
        self.events.lock().expect("observer mutex poisoned").clone()
    }

    fn with_events(&self, update: impl FnOnce(&mut Events)) {
        update(&mut self.events.lock().expect("observer mutex poisoned"));
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_phase(&self, phase: RunPhase) {
        self.with_events(|events| events.phases.push(phase));
    }

    fn on_record_added(&self, record: &Record) {
        self.with_events(|events| events.added.push(record.id));
    }

    fn on_record_removed(&self, record: &Record) {
        self.with_events(|events| events.removed.push(record.id));
        if let Some(removals) = &self.removals {
            let _ = removals.send(record.id);
        }
    }

    fn on_record_enriched(&self, worker_id: usize, record: &Record, _elapsed: Duration) {
        self.with_events(|events| events.enriched.push((worker_id, record.id)));
    }

    fn on_record_filtered(&self, record: &Record, accepted: bool) {
        self.with_events(|events| events.filtered.push((record.id, accepted)));
    }

    fn on_record_written(&self, record: &Record) {
        self.with_events(|events| events.written.push(record.id));
    }

    fn on_worker_finished(&self, report: &WorkerReport) {
        self.with_events(|events| events.workers_finished.push(report.worker_id));
    }

    fn on_stage_shutdown(&self, stage: StageKind) {
        self.with_events(|events| events.shutdowns.push(stage));
    }
}
