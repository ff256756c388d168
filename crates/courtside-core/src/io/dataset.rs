use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::CourtsideError;
use crate::types::{Record, Result};

/// Parses a JSON array of records.
///
/// Fails if the payload is not valid JSON, if a record is already enriched,
/// or if two records share an id.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<Record>> {
    let records: Vec<Record> = serde_json::from_reader(reader)?;

    let mut seen = HashSet::with_capacity(records.len());
    for record in &records {
        if !seen.insert(record.id) {
            return Err(CourtsideError::InvalidInput(format!(
                "duplicate record id {}",
                record.id
            )));
        }
        if record.is_enriched() {
            return Err(CourtsideError::InvalidInput(format!(
                "record {} arrived with a derived metric already set",
                record.id
            )));
        }
    }

    Ok(records)
}

/// Opens `path` and parses it with [`read_records`].
pub fn load_records<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| {
        CourtsideError::from(err).with_context(format!("opening {}", path.display()))
    })?;
    read_records(BufReader::new(file))
        .map_err(|err| err.with_context(format!("reading {}", path.display())))
}
