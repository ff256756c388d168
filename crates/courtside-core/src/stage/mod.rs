//! Command-driven dispatchers that own the pipeline's bounded queues.
//!
//! Each stage pairs a data queue with a command queue sized for bursts of
//! commands that are still waiting to drain into the data queue. The stage
//! value owns the receiving end of its command queue; producers talk to it
//! through a cloneable handle.

use std::thread::JoinHandle;

use crate::core::panic_message;
use crate::error::CourtsideError;
use crate::types::{Result, StageKind};

pub mod input;
pub mod output;

pub use input::{InputCommand, InputHandle, InputStage, InputStageReport};
pub use output::{OutputCommand, OutputHandle, OutputStage, OutputStageReport};

/// Multiplier applied to a data queue capacity to size its command queue.
pub const COMMAND_CAPACITY_FACTOR: usize = 3;

/// Default command queue capacity for a data queue of `data_capacity` slots.
pub fn default_command_capacity(data_capacity: usize) -> usize {
    data_capacity.saturating_mul(COMMAND_CAPACITY_FACTOR).max(1)
}

/// Join handle for a dispatcher running on its own thread.
#[derive(Debug)]
pub struct StageHandle<R> {
    stage: StageKind,
    handle: JoinHandle<Result<R>>,
}

impl<R> StageHandle<R> {
    pub(crate) fn new(stage: StageKind, handle: JoinHandle<Result<R>>) -> Self {
        Self { stage, handle }
    }

    /// Which stage this dispatcher runs.
    pub fn stage(&self) -> StageKind {
        self.stage
    }

    /// Returns `true` once the dispatcher thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the dispatcher loop to return.
    pub fn join(self) -> Result<R> {
        match self.handle.join() {
            Ok(result) => result,
            Err(payload) => Err(CourtsideError::ThreadPanicked(format!(
                "{} stage: {}",
                self.stage.as_str(),
                panic_message(payload)
            ))),
        }
    }
}
