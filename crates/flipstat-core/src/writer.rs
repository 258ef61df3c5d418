//! CSV/JSON output. Every file is written to a temp file in the target
//! directory and renamed into place.

use crate::aggregate::GroupSummary;
use crate::reshape::ReshapedMatrix;
use crate::{FlipstatError, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Atomically replaces `path` with `bytes`, creating parent directories.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| FlipstatError::io(parent, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".flipstat-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| FlipstatError::io(parent, e))?;
    tmp.write_all(bytes).map_err(|e| FlipstatError::io(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| FlipstatError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| FlipstatError::io(path, e.error))?;
    Ok(())
}

/// Empty string for missing values; shortest round-trip form otherwise.
pub fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn to_csv_bytes<I, R>(path: &Path, delimiter: u8, records: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let csv_err = |e: csv::Error| FlipstatError::Csv {
        path: path.to_path_buf(),
        source: e,
    };
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    for record in records {
        wtr.write_record(record).map_err(csv_err)?;
    }
    wtr.into_inner().map_err(|e| FlipstatError::io(path, e.into_error()))
}

/// Summary table: header from [`GroupSummary::header`], one line per group.
pub fn write_summary_csv(summary: &GroupSummary, path: &Path, delimiter: u8) -> Result<()> {
    let mut records = vec![summary.header()];
    for row in &summary.rows {
        let mut record = vec![row.key.to_string()];
        for stats in &row.stats {
            for &stat in &summary.statistics {
                record.push(format_value(stats.get(stat)));
            }
        }
        records.push(record);
    }
    let bytes = to_csv_bytes(path, delimiter, records)?;
    write_atomic(path, &bytes)?;
    tracing::info!(path = %path.display(), groups = summary.rows.len(), "wrote summary");
    Ok(())
}

/// Matrix table: row key name then column labels; rows in display order.
pub fn write_matrix_csv(matrix: &ReshapedMatrix, path: &Path, delimiter: u8) -> Result<()> {
    let mut header = vec![matrix.row_key.name().to_string()];
    header.extend(matrix.col_labels.iter().map(ToString::to_string));

    let mut records = vec![header];
    for (label, cells) in matrix.rows() {
        let mut record = vec![label.to_string()];
        record.extend(cells.iter().map(|c| format_value(c.value())));
        records.push(record);
    }
    let bytes = to_csv_bytes(path, delimiter, records)?;
    write_atomic(path, &bytes)?;
    tracing::info!(
        path = %path.display(),
        rows = matrix.row_labels.len(),
        cols = matrix.col_labels.len(),
        "wrote matrix"
    );
    Ok(())
}

pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| FlipstatError::io(path, std::io::Error::other(e)))?;
    write_atomic(path, json.as_bytes())
}
