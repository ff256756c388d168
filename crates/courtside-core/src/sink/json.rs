use std::io::Write;

use crate::error::CourtsideError;
use crate::sink::RecordSink;
use crate::types::{Record, Result};

/// Writes records as newline-delimited JSON using the input field names.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wraps `writer`. Buffering is left to the caller.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)
            .map_err(|err| CourtsideError::SinkWrite(format!("record {}: {err}", record.id)))?;
        self.writer
            .write_all(b"\n")
            .map_err(|err| CourtsideError::SinkWrite(format!("record {}: {err}", record.id)))
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|err| CourtsideError::SinkWrite(format!("flush: {err}")))
    }
}
