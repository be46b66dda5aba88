//! CSV rendering of report rows and combined records.

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::{ExportError, ExportResult};

/// Renders `records` as CSV.
///
/// The header is the union of all keys in first-seen order; a record missing
/// a column gets an empty cell. Strings are written as-is, null as empty and
/// any other value in its JSON form.
pub fn records_to_csv(records: &[Map<String, Value>]) -> ExportResult<Vec<u8>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut columns: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if seen.insert(key) {
                columns.push(key);
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    if !columns.is_empty() {
        writer.write_record(&columns)?;
    }

    for record in records {
        writer.write_record(
            columns
                .iter()
                .map(|column| record.get(*column).map(cell).unwrap_or_default()),
        )?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.to_string()))
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
