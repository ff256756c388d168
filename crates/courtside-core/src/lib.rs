pub mod core;
pub mod error;
pub mod io;
pub mod oracle;
pub mod pipeline;
pub mod sink;
pub mod stage;
pub mod telemetry;
pub mod types;

pub use crate::core::{WorkerPool, WorkerPoolHandle, WorkerReport};
pub use error::CourtsideError;
pub use io::{load_records, read_records};
pub use oracle::{PrimalityOracle, PrimeBudget, is_prime};
pub use pipeline::{Pipeline, PipelineConfig, RunReport};
pub use sink::{JsonLinesSink, MemorySink, RecordSink, SinkSummary, SinkWorker, TextSink};
pub use stage::{InputCommand, InputHandle, InputStage, OutputCommand, OutputHandle, OutputStage};
pub use telemetry::{NoopObserver, PipelineObserver, TracingObserver};
pub use types::{CommandKind, Record, RecordFilter, Result, RunPhase, StageKind};
