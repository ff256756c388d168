use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, RecvError, Select, Sender, bounded};

use crate::error::CourtsideError;
use crate::stage::StageHandle;
use crate::telemetry::PipelineObserver;
use crate::types::{CommandKind, Record, Result, StageKind};

/// Commands understood by the input stage dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    /// Push the record onto the intake queue.
    Add(Record),
    /// Announce that a worker is done with the record. Audit only.
    Remove(Record),
    /// No more records: close the intake queue.
    Shutdown,
}

impl InputCommand {
    /// Stage-independent kind of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Add(_) => CommandKind::Add,
            Self::Remove(_) => CommandKind::Remove,
            Self::Shutdown => CommandKind::Shutdown,
        }
    }
}

/// Counters returned when the input dispatcher exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputStageReport {
    pub added: usize,
    pub removed: usize,
}

/// Cloneable sender side of the input stage command queue.
///
/// `Remove` audits travel on their own lane of the command queue so a worker
/// announcing a removal can never wait behind `Add` commands that are
/// themselves waiting for that worker to drain the intake queue.
#[derive(Debug, Clone)]
pub struct InputHandle {
    commands: Sender<InputCommand>,
    audit: Sender<Record>,
}

impl InputHandle {
    /// Enqueues a record. Blocks while the command queue is full.
    pub fn add(&self, record: Record) -> Result<()> {
        self.send(InputCommand::Add(record))
    }

    /// Announces that a worker is done with `record`.
    ///
    /// Travels on the audit lane; the dispatcher serves it even while an `add`
    /// waits on a full intake queue.
    pub fn remove(&self, record: Record) -> Result<()> {
        self.send(InputCommand::Remove(record))
    }

    /// Signals end of input. Must be sent exactly once, after every `add`.
    pub fn shutdown(&self) -> Result<()> {
        self.send(InputCommand::Shutdown)
    }

    /// Sends any command, routing `Remove` to the audit lane.
    ///
    /// Fails with [`CourtsideError::Protocol`] once the dispatcher has exited.
    pub fn send(&self, command: InputCommand) -> Result<()> {
        let sent = match command {
            InputCommand::Remove(record) => self
                .audit
                .send(record)
                .map_err(|_| CommandKind::Remove),
            other => self.commands.send(other).map_err(|err| err.0.kind()),
        };
        sent.map_err(|kind| {
            CourtsideError::Protocol(format!(
                "input stage is no longer accepting commands (dropped `{kind}`)"
            ))
        })
    }

    /// Commands waiting for the dispatcher, audits included.
    pub fn pending(&self) -> usize {
        self.commands.len() + self.audit.len()
    }
}

/// Intake queue plus the dispatcher that feeds it.
pub struct InputStage {
    intake_tx: Sender<Record>,
    intake_rx: Receiver<Record>,
    commands_rx: Receiver<InputCommand>,
    audit_rx: Receiver<Record>,
    observer: Arc<dyn PipelineObserver>,
}

impl InputStage {
    /// Creates the stage and the handle producers use to talk to it.
    ///
    /// # Arguments
    /// * `intake_capacity` - Slots in the intake queue drained by workers
    /// * `command_capacity` - Slots in each lane of the command queue
    /// * `observer` - Receives the add/remove audit trail
    pub fn new(
        intake_capacity: usize,
        command_capacity: usize,
        observer: Arc<dyn PipelineObserver>,
    ) -> (Self, InputHandle) {
        let (intake_tx, intake_rx) = bounded(intake_capacity);
        let (commands_tx, commands_rx) = bounded(command_capacity);
        let (audit_tx, audit_rx) = bounded(command_capacity);
        let stage = Self {
            intake_tx,
            intake_rx,
            commands_rx,
            audit_rx,
            observer,
        };
        let handle = InputHandle {
            commands: commands_tx,
            audit: audit_tx,
        };
        (stage, handle)
    }

    /// Receiving end of the intake queue, shared by every worker.
    pub fn intake(&self) -> Receiver<Record> {
        self.intake_rx.clone()
    }

    /// Number of slots in the intake queue.
    pub fn intake_capacity(&self) -> Option<usize> {
        self.intake_tx.capacity()
    }

    /// Runs the dispatcher on a dedicated thread.
    pub fn spawn(self) -> Result<StageHandle<InputStageReport>> {
        let handle = thread::Builder::new()
            .name("courtside-input".to_string())
            .spawn(move || self.run())?;
        Ok(StageHandle::new(StageKind::Input, handle))
    }

    /// Dispatch loop.
    ///
    /// Processes commands until every [`InputHandle`] has been dropped. The
    /// intake queue is closed when `Shutdown` arrives; commands received
    /// after that are still drained so late `Remove` audits never block a
    /// worker. Protocol violations do not stop the loop; the first one is
    /// returned once the command queue is exhausted.
    pub fn run(self) -> Result<InputStageReport> {
        let Self {
            intake_tx,
            intake_rx,
            commands_rx,
            audit_rx,
            observer,
        } = self;
        // Workers hold their own receivers; keeping one here would let an
        // `Add` block forever once every worker is gone.
        drop(intake_rx);

        let mut dispatcher = Dispatcher {
            intake: Some(intake_tx),
            audit_rx,
            audit_open: true,
            observer,
            report: InputStageReport::default(),
            violation: None,
        };
        let audit_rx = dispatcher.audit_rx.clone();
        let mut commands_open = true;

        while commands_open || dispatcher.audit_open {
            let mut select = Select::new();
            let commands_index = commands_open.then(|| select.recv(&commands_rx));
            if dispatcher.audit_open {
                select.recv(&audit_rx);
            }

            let operation = select.select();
            if Some(operation.index()) == commands_index {
                match operation.recv(&commands_rx) {
                    Ok(command) => dispatcher.handle(command),
                    Err(_) => commands_open = false,
                }
            } else {
                dispatcher.audit(operation.recv(&audit_rx));
            }
        }

        dispatcher.finish()
    }
}

struct Dispatcher {
    intake: Option<Sender<Record>>,
    audit_rx: Receiver<Record>,
    audit_open: bool,
    observer: Arc<dyn PipelineObserver>,
    report: InputStageReport,
    violation: Option<CourtsideError>,
}

impl Dispatcher {
    fn handle(&mut self, command: InputCommand) {
        match command {
            InputCommand::Add(record) => self.add(record),
            InputCommand::Remove(record) => self.audit(Ok(record)),
            InputCommand::Shutdown => {
                if self.intake.take().is_some() {
                    self.observer.on_stage_shutdown(StageKind::Input);
                } else {
                    self.violate("input stage received a second shutdown".to_string());
                }
            }
        }
    }

    /// Pushes a record onto the intake queue, blocking while it is full.
    ///
    /// Removal audits keep being served while the push waits.
    fn add(&mut self, record: Record) {
        let Some(intake) = self.intake.clone() else {
            self.violate(format!("record {} added after input shutdown", record.id));
            return;
        };

        self.observer.on_record_added(&record);
        let audit_rx = self.audit_rx.clone();
        loop {
            let mut select = Select::new();
            let send_index = select.send(&intake);
            if self.audit_open {
                select.recv(&audit_rx);
            }

            let operation = select.select();
            if operation.index() == send_index {
                match operation.send(&intake, record) {
                    Ok(()) => self.report.added += 1,
                    Err(err) => self.violate(format!(
                        "intake queue has no workers left (dropped record {})",
                        err.0.id
                    )),
                }
                return;
            }

            self.audit(operation.recv(&audit_rx));
        }
    }

    fn audit(&mut self, audit: std::result::Result<Record, RecvError>) {
        match audit {
            Ok(record) => {
                self.observer.on_record_removed(&record);
                self.report.removed += 1;
            }
            Err(_) => self.audit_open = false,
        }
    }

    fn violate(&mut self, message: String) {
        self.violation
            .get_or_insert_with(|| CourtsideError::Protocol(message));
    }

    fn finish(mut self) -> Result<InputStageReport> {
        if self.intake.is_some() {
            self.violate("input command queue closed before shutdown was sent".to_string());
        }

        match self.violation {
            Some(err) => Err(err),
            None => Ok(self.report),
        }
    }
}
