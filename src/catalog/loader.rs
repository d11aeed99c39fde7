//! CSV table readers

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// How to treat rows that fail to deserialize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPolicy {
    /// Abort the load. Used where row position carries meaning.
    Strict,
    /// Log and drop the row.
    SkipInvalid,
}

/// Read every row of a headered CSV file into `T`.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_table<T: DeserializeOwned>(path: &Path, policy: RowPolicy) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| Error::io(path.display().to_string(), e))?;
    read_table_from(file, policy)
}

pub fn read_table_from<T: DeserializeOwned, R: std::io::Read>(
    reader: R,
    policy: RowPolicy,
) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for record in reader.deserialize::<T>() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) if policy == RowPolicy::SkipInvalid => {
                debug!("Skipping malformed row: {}", e);
                skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed rows", skipped);
    }
    Ok(rows)
}
