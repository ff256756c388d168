use crate::sink::RecordSink;
use crate::types::{Record, Result};

/// Collects records in memory, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Vec<Record>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records written so far, in arrival order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Consumes the sink, returning the written records.
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Written record ids in ascending order.
    pub fn sorted_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.records.iter().map(|record| record.id).collect();
        ids.sort_unstable();
        ids
    }
}

impl RecordSink for MemorySink {
    fn write_record(&mut self, record: &Record) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
