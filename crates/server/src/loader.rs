//! CSV-backed [`CatalogueLoader`] (§ Event Catalogue of the design).
//!
//! File/tabular parsing is deliberately kept out of `replay-core`; this
//! is the one concrete loader the server ships. One configured column
//! is the timestamp, every other column becomes a field of the event's
//! JSON payload.

use std::fs::File;
use std::path::Path;

use csv::{Reader, StringRecord};
use replay_core::catalogue::{CatalogueLoader, RawRow};
use replay_core::error::{CatalogueError, CatalogueResult};

/// Reads events from a CSV file, one row at a time.
pub struct CsvCatalogueLoader {
    reader: Reader<File>,
    headers: StringRecord,
    timestamp_index: usize,
}

impl CsvCatalogueLoader {
    /// Open `path` and resolve `timestamp_column` against its header row.
    pub fn open(path: &Path, timestamp_column: &str) -> CatalogueResult<Self> {
        let mut reader = Reader::from_path(path).map_err(|e| CatalogueError::Load(e.to_string()))?;

        let headers = reader
            .headers()
            .map_err(|e| CatalogueError::Load(e.to_string()))?
            .clone();
        let headers = strip_bom_from_first_header(headers);

        let timestamp_index = headers
            .iter()
            .position(|h| h == timestamp_column)
            .ok_or_else(|| {
                CatalogueError::Load(format!(
                    "timestamp column '{timestamp_column}' not found in header"
                ))
            })?;

        Ok(CsvCatalogueLoader {
            reader,
            headers,
            timestamp_index,
        })
    }
}

fn strip_bom_from_first_header(headers: StringRecord) -> StringRecord {
    let mut fields: Vec<String> = headers.iter().map(str::to_string).collect();
    if let Some(first) = fields.first_mut() {
        if let Some(stripped) = first.strip_prefix('\u{feff}') {
            *first = stripped.to_string();
        }
    }
    StringRecord::from(fields)
}

impl CatalogueLoader for CsvCatalogueLoader {
    fn next_row(&mut self) -> Option<CatalogueResult<RawRow>> {
        let mut record = StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(false) => None,
            Err(e) => Some(Err(CatalogueError::Load(e.to_string()))),
            Ok(true) => Some(parse_row(&self.headers, &record, self.timestamp_index)),
        }
    }
}

fn parse_row(
    headers: &StringRecord,
    record: &StringRecord,
    timestamp_index: usize,
) -> CatalogueResult<RawRow> {
    let timestamp_field = record
        .get(timestamp_index)
        .ok_or_else(|| CatalogueError::Load("row missing timestamp field".to_string()))?;
    let timestamp_millis: i64 = timestamp_field
        .trim()
        .parse()
        .map_err(|_| CatalogueError::Load(format!("invalid timestamp: {timestamp_field}")))?;

    let mut payload = serde_json::Map::new();
    for (i, header) in headers.iter().enumerate() {
        if i == timestamp_index {
            continue;
        }
        let value = record.get(i).unwrap_or("");
        payload.insert(header.to_string(), json_value_for(value));
    }

    Ok(RawRow {
        timestamp_millis,
        payload: serde_json::Value::Object(payload),
    })
}

fn json_value_for(raw: &str) -> serde_json::Value {
    if let Ok(i) = raw.parse::<i64>() {
        return serde_json::Value::from(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return serde_json::Value::from(f);
    }
    serde_json::Value::from(raw.to_string())
}
