//! Terminal stage: persists the filtered record stream.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, bounded};
use serde::{Deserialize, Serialize};

use crate::core::panic_message;
use crate::error::CourtsideError;
use crate::telemetry::{PipelineObserver, tags};
use crate::types::{Record, Result};

pub mod json;
pub mod memory;
pub mod text;

pub use json::JsonLinesSink;
pub use memory::MemorySink;
pub use text::TextSink;

/// Destination for records that survived the output filter.
pub trait RecordSink {
    fn write_record(&mut self, record: &Record) -> Result<()>;

    /// Called once after the result stream closed without a write failure.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        (**self).write_record(record)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Counters reported by the sink when the result stream is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkSummary {
    pub written: usize,
    /// Records received after a write failure; drained but never written.
    pub discarded: usize,
}

/// Runs a [`RecordSink`] on its own thread.
pub struct SinkWorker;

impl SinkWorker {
    /// Consumes `results` until the output stage closes it.
    ///
    /// The first write failure stops all further writes for the run. The
    /// worker keeps draining the queue afterwards so the output stage never
    /// blocks on a dead sink, and reports the failure on completion.
    pub fn spawn<S>(
        sink: S,
        results: Receiver<Record>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Result<SinkHandle<S>>
    where
        S: RecordSink + Send + 'static,
    {
        let (done_tx, done_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("courtside-sink".to_string())
            .spawn(move || drain_into(sink, results, observer.as_ref(), done_tx))?;

        Ok(SinkHandle {
            done: done_rx,
            handle,
        })
    }
}

/// Completion handle for a running sink.
pub struct SinkHandle<S> {
    done: Receiver<Result<SinkSummary>>,
    handle: JoinHandle<S>,
}

impl<S> SinkHandle<S> {
    /// Blocks until the sink signals completion, then returns it with its summary.
    pub fn wait(self) -> Result<(S, SinkSummary)> {
        let outcome = self.done.recv();
        let sink = self.handle.join().map_err(|payload| {
            CourtsideError::ThreadPanicked(format!("sink: {}", panic_message(payload)))
        })?;

        match outcome {
            Ok(Ok(summary)) => Ok((sink, summary)),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(CourtsideError::Protocol(
                "sink exited without signalling completion".to_string(),
            )),
        }
    }
}

fn drain_into<S: RecordSink>(
    mut sink: S,
    results: Receiver<Record>,
    observer: &dyn PipelineObserver,
    done: Sender<Result<SinkSummary>>,
) -> S {
    let mut summary = SinkSummary::default();
    let mut failure: Option<CourtsideError> = None;

    for record in results.iter() {
        if failure.is_some() {
            summary.discarded += 1;
            continue;
        }

        match sink.write_record(&record) {
            Ok(()) => {
                summary.written += 1;
                observer.on_record_written(&record);
            }
            Err(err) => {
                tracing::error!(
                    target: tags::TARGET_SINK,
                    id = record.id,
                    error = %err,
                    "sink write failed; discarding remaining records"
                );
                summary.discarded += 1;
                failure = Some(into_sink_error(err));
            }
        }
    }

    if failure.is_none() {
        if let Err(err) = sink.finish() {
            failure = Some(into_sink_error(err));
        }
    }

    let outcome = match failure {
        Some(err) => Err(err),
        None => Ok(summary),
    };
    if done.send(outcome).is_err() {
        tracing::warn!(target: tags::TARGET_SINK, "sink completion signal dropped");
    }
    sink
}

fn into_sink_error(err: CourtsideError) -> CourtsideError {
    match err {
        CourtsideError::SinkWrite(_) => err,
        other => CourtsideError::SinkWrite(other.to_string()),
    }
}
