use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::error::CourtsideError;
use crate::stage::StageHandle;
use crate::telemetry::PipelineObserver;
use crate::types::{CommandKind, Record, RecordFilter, Result, StageKind};

/// Commands understood by the output stage dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputCommand {
    /// Evaluate the filter and forward the record if it survives.
    Filter(Record),
    /// Close the result queue and stop.
    Shutdown,
}

impl OutputCommand {
    /// Stage-independent kind of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Filter(_) => CommandKind::Filter,
            Self::Shutdown => CommandKind::Shutdown,
        }
    }
}

/// Filter decisions counted by the output dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputStageReport {
    pub accepted: usize,
    pub rejected: usize,
}

impl OutputStageReport {
    /// Total number of `Filter` commands processed.
    pub fn filtered(&self) -> usize {
        self.accepted + self.rejected
    }
}

/// Cloneable sender side of the output stage command queue.
#[derive(Debug, Clone)]
pub struct OutputHandle {
    commands: Sender<OutputCommand>,
}

impl OutputHandle {
    /// Submits an enriched record. Blocks while the command queue is full.
    pub fn filter(&self, record: Record) -> Result<()> {
        self.send(OutputCommand::Filter(record))
    }

    /// Closes the result stream once queued filters are processed.
    ///
    /// Only the driver sends this, once, after every worker has finished.
    pub fn shutdown(&self) -> Result<()> {
        self.send(OutputCommand::Shutdown)
    }

    /// Sends any command. Fails with [`CourtsideError::Protocol`] once the
    /// dispatcher has shut down.
    pub fn send(&self, command: OutputCommand) -> Result<()> {
        self.commands.send(command).map_err(|err| {
            CourtsideError::Protocol(format!(
                "output stage already shut down (dropped `{}`)",
                err.0.kind()
            ))
        })
    }

    /// Commands waiting for the dispatcher.
    pub fn pending(&self) -> usize {
        self.commands.len()
    }
}

/// Result queue plus the filtering dispatcher that feeds it.
pub struct OutputStage {
    results_tx: Sender<Record>,
    results_rx: Receiver<Record>,
    commands_rx: Receiver<OutputCommand>,
    filter: RecordFilter,
    observer: Arc<dyn PipelineObserver>,
}

impl OutputStage {
    /// Creates the stage and the handle workers use to submit results.
    ///
    /// # Arguments
    /// * `result_capacity` - Slots in the result queue drained by the sink
    /// * `command_capacity` - Slots in the command queue
    /// * `filter` - Predicate a record must satisfy to reach the sink
    /// * `observer` - Notified of every filter decision
    pub fn new(
        result_capacity: usize,
        command_capacity: usize,
        filter: RecordFilter,
        observer: Arc<dyn PipelineObserver>,
    ) -> (Self, OutputHandle) {
        let (results_tx, results_rx) = bounded(result_capacity);
        let (commands_tx, commands_rx) = bounded(command_capacity);
        let stage = Self {
            results_tx,
            results_rx,
            commands_rx,
            filter,
            observer,
        };
        let handle = OutputHandle {
            commands: commands_tx,
        };
        (stage, handle)
    }

    /// Receiving end of the result queue. Exhausted once the stage shuts down.
    pub fn results(&self) -> Receiver<Record> {
        self.results_rx.clone()
    }

    /// Predicate applied to every `Filter` command.
    pub fn filter(&self) -> RecordFilter {
        self.filter
    }

    /// Runs the dispatcher on a dedicated thread.
    pub fn spawn(self) -> Result<StageHandle<OutputStageReport>> {
        let handle = thread::Builder::new()
            .name("courtside-output".to_string())
            .spawn(move || self.run())?;
        Ok(StageHandle::new(StageKind::Output, handle))
    }

    /// Dispatch loop.
    ///
    /// Returns as soon as `Shutdown` is processed, dropping the command
    /// receiver: a `Filter` sent afterwards fails on the sender side.
    pub fn run(self) -> Result<OutputStageReport> {
        let Self {
            results_tx,
            results_rx,
            commands_rx,
            filter,
            observer,
        } = self;
        drop(results_rx);

        let mut report = OutputStageReport::default();
        let mut violation: Option<CourtsideError> = None;

        for command in commands_rx.iter() {
            match command {
                OutputCommand::Filter(record) => {
                    let accepted = filter.accepts(&record);
                    observer.on_record_filtered(&record, accepted);
                    if !accepted {
                        report.rejected += 1;
                        continue;
                    }

                    match results_tx.send(record) {
                        Ok(()) => report.accepted += 1,
                        Err(err) => {
                            violation.get_or_insert_with(|| {
                                CourtsideError::Protocol(format!(
                                    "result queue has no sink attached (dropped record {})",
                                    err.0.id
                                ))
                            });
                        }
                    }
                }
                OutputCommand::Shutdown => {
                    drop(results_tx);
                    observer.on_stage_shutdown(StageKind::Output);
                    return match violation {
                        Some(err) => Err(err),
                        None => Ok(report),
                    };
                }
            }
        }

        Err(violation.unwrap_or_else(|| {
            CourtsideError::Protocol(
                "output command queue closed before shutdown was sent".to_string(),
            )
        }))
    }
}
