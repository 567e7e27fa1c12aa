//! CSV export of enriched records
//!
//! Records are flattened the way a JSON normalizer would: nested objects turn
//! into dotted columns, arrays are written as compact JSON text, and `null`
//! becomes an empty cell. The header is the union of all flattened keys in the
//! order they are first seen.

use crate::error::{Error, Result};
use crate::types::{JsonObject, OutputRecord};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::Path;

/// A rectangular view of the records
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    /// Column names in output order
    pub columns: Vec<String>,
    /// One row per record, aligned with `columns`
    pub rows: Vec<Vec<String>>,
}

/// Flatten one record into `(column, cell)` pairs in field order
pub fn flatten(record: &JsonObject) -> Vec<(String, String)> {
    let mut cells = Vec::with_capacity(record.len());
    for (key, value) in record {
        flatten_value(key.clone(), value, &mut cells);
    }
    cells
}

fn flatten_value(column: String, value: &Value, cells: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_value(format!("{column}.{key}"), nested, cells);
            }
        }
        Value::Array(_) => cells.push((column, value.to_string())),
        Value::Null => cells.push((column, String::new())),
        Value::String(s) => cells.push((column, s.clone())),
        Value::Number(n) => cells.push((column, n.to_string())),
        Value::Bool(b) => cells.push((column, b.to_string())),
    }
}

/// Build the table for `records`
///
/// With no records the table has `fallback_header` as its columns and no rows.
pub fn tabulate(records: &[OutputRecord], fallback_header: &[String]) -> Table {
    if records.is_empty() {
        return Table {
            columns: fallback_header.to_vec(),
            rows: Vec::new(),
        };
    }

    let flattened: Vec<Vec<(String, String)>> =
        records.iter().map(|r| flatten(r.fields())).collect();

    let mut columns = Vec::new();
    let mut known = HashSet::new();
    for cells in &flattened {
        for (column, _) in cells {
            if known.insert(column.as_str()) {
                columns.push(column.clone());
            }
        }
    }

    let rows = flattened
        .iter()
        .map(|cells| {
            let by_column: HashMap<&str, &str> = cells
                .iter()
                .map(|(c, v)| (c.as_str(), v.as_str()))
                .collect();
            columns
                .iter()
                .map(|c| by_column.get(c.as_str()).copied().unwrap_or_default().to_string())
                .collect()
        })
        .collect();

    Table { columns, rows }
}

/// Write `records` as CSV to any writer
pub fn write_csv_to<W: Write>(
    records: &[OutputRecord],
    writer: W,
    fallback_header: &[String],
) -> Result<()> {
    let table = tabulate(records, fallback_header);
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&table.columns)?;
    for row in &table.rows {
        csv.write_record(row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Write `records` as CSV to `path`, replacing it only once fully written
///
/// The file is written to a temporary sibling and renamed into place, so a
/// failure never leaves a partial CSV behind.
pub fn write_csv(records: &[OutputRecord], path: &Path, fallback_header: &[String]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    write_csv_to(records, std::io::BufWriter::new(file.as_file_mut()), fallback_header)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!(path = %path.display(), rows = records.len(), "CSV written");
    Ok(())
}
