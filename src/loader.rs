//! Reading collected metric CSV files.

use crate::error::CollectError;
use crate::models::{MetricKind, MetricTable, ModelDir, ReferenceTable};
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Parse one cell. Empty cells read as NaN, like missing values in the
/// collected tables.
fn parse_cell(path: &Path, column: &str, row: usize, raw: &str) -> Result<f64, CollectError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(f64::NAN);
    }
    trimmed
        .parse::<f64>()
        .map_err(|_| CollectError::InvalidValue {
            path: path.to_path_buf(),
            column: column.to_string(),
            row,
            value: raw.to_string(),
        })
}

/// Read the named numeric columns of a CSV file with a header row.
///
/// Columns are returned in the order requested.
pub fn read_columns(path: &Path, columns: &[&str]) -> Result<Vec<Vec<f64>>, CollectError> {
    let file = File::open(path).map_err(|e| CollectError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| CollectError::csv(path, e))?
        .clone();
    debug!("{} columns: {:?}", path.display(), headers);

    let indices = columns
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h == *column)
                .ok_or_else(|| CollectError::MissingColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut values = vec![Vec::new(); columns.len()];
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| CollectError::csv(path, e))?;
        for (slot, (&index, column)) in indices.iter().zip(columns).enumerate() {
            let raw = record.get(index).unwrap_or("");
            values[slot].push(parse_cell(path, column, row + 1, raw)?);
        }
    }

    Ok(values)
}

/// Load the reference (TPL) table of a model directory.
pub fn load_reference(model_dir: &ModelDir) -> Result<ReferenceTable, CollectError> {
    let path = model_dir.path.join(MetricKind::Tpl.file_name());
    let mut columns = read_columns(
        &path,
        &[
            MetricKind::Tpl.value_column(),
            MetricKind::ACTIVE_DIMS_COLUMN,
        ],
    )?;

    let active_dims = columns.pop().unwrap_or_default();
    let values = columns.pop().unwrap_or_default();
    Ok(ReferenceTable {
        path,
        values,
        active_dims,
    })
}

/// Load the value column of a non-reference metric file.
pub fn load_metric(model_dir: &ModelDir, kind: MetricKind) -> Result<MetricTable, CollectError> {
    let path = model_dir.path.join(kind.file_name());
    let values = read_columns(&path, &[kind.value_column()])?
        .pop()
        .unwrap_or_default();
    Ok(MetricTable { kind, path, values })
}
