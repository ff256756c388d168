use std::io::Write;

use crate::error::CourtsideError;
use crate::sink::RecordSink;
use crate::types::{Record, Result};

/// Writes one human-readable line per record.
///
/// ```text
/// ID: 7, LastName: Doncic, BirthYear: 1999, PointsPerGame: 28.40, PrimeNumberCount: 301
/// ```
#[derive(Debug)]
pub struct TextSink<W: Write> {
    writer: W,
}

impl<W: Write> TextSink<W> {
    /// Wraps `writer`. Buffering is left to the caller.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Borrows the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for TextSink<W> {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        writeln!(
            self.writer,
            "ID: {}, LastName: {}, BirthYear: {}, PointsPerGame: {:.2}, PrimeNumberCount: {}",
            record.id,
            record.name,
            record.origin_year,
            record.rate,
            record.derived_metric.unwrap_or_default()
        )
        .map_err(|err| CourtsideError::SinkWrite(format!("record {}: {err}", record.id)))
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|err| CourtsideError::SinkWrite(format!("flush: {err}")))
    }
}
