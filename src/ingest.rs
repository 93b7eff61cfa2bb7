//! Loading customer records from CSV exports

use crate::error::{ChurnError, Result};
use crate::types::CustomerRecord;
use csv::StringRecord;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Read every row of a headed CSV into records.
///
/// Headers are the source column names; unknown columns are ignored and
/// missing ones take their defaults. Cells are handed over as raw strings,
/// so a CSV row decodes exactly like the same values sent as JSON. The first
/// undecodable row aborts.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<CustomerRecord>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    let headers = csv.headers()?.clone();

    let mut records = Vec::new();
    for (row, result) in csv.records().enumerate() {
        let record = result
            .map_err(ChurnError::from)
            .and_then(|cells| decode_row(&headers, &cells))
            .map_err(|e| ChurnError::Row {
                row,
                source: Box::new(e),
            })?;
        records.push(record);
    }

    debug!(rows = records.len(), "CSV decoded");
    Ok(records)
}

fn decode_row(headers: &StringRecord, cells: &StringRecord) -> Result<CustomerRecord> {
    let object: Map<String, Value> = headers
        .iter()
        .zip(cells.iter())
        .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
        .collect();
    Ok(serde_json::from_value(Value::Object(object))?)
}

/// [`read_csv`] over a file
pub fn read_csv_path<P: AsRef<Path>>(path: P) -> Result<Vec<CustomerRecord>> {
    let path = path.as_ref();
    let records = read_csv(File::open(path)?)?;
    info!(path = %path.display(), rows = records.len(), "Customer records loaded");
    Ok(records)
}
