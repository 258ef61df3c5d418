//! CSV loader with per-cell numeric coercion.
//!
//! Unparseable or empty cells become missing values; only structural problems
//! (unreadable file, absent column, broken quoting) are errors.

use crate::model::{GroupKey, KeyColumn, MetricRow, MetricTable, STANDARD_METRICS};
use crate::{FlipstatError, Result};
use serde::Serialize;
use std::io::Read;
use std::path::Path;

/// What the loader recovered from while reading the input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows: usize,
    pub missing_percent: usize,
    pub missing_bits: usize,
    pub missing_metric_cells: usize,
}

impl LoadReport {
    pub fn missing_keys(&self, column: KeyColumn) -> usize {
        match column {
            KeyColumn::Percent => self.missing_percent,
            KeyColumn::Bits => self.missing_bits,
        }
    }
}

/// Coerces one cell to a finite number; anything else is missing.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Metric columns to load: the standard set first, then any extras in request order.
pub fn metric_columns(requested: &[String]) -> Vec<String> {
    let mut cols: Vec<String> = STANDARD_METRICS.iter().map(|s| s.to_string()).collect();
    for m in requested {
        if !cols.contains(m) {
            cols.push(m.clone());
        }
    }
    cols
}

/// Loads `path`, requiring `percent`, `bits`, the standard metrics and `extra_metrics`.
pub fn load_table(
    path: &Path,
    delimiter: u8,
    extra_metrics: &[String],
) -> Result<(MetricTable, LoadReport)> {
    let file = std::fs::File::open(path).map_err(|source| FlipstatError::MissingFile {
        path: path.to_path_buf(),
        source,
    })?;
    read_table(file, path, delimiter, extra_metrics)
}

/// Same as [`load_table`] over any reader; `source` is only used in errors and logs.
pub fn read_table<R: Read>(
    reader: R,
    source: &Path,
    delimiter: u8,
    extra_metrics: &[String],
) -> Result<(MetricTable, LoadReport)> {
    let csv_err = |e: csv::Error| FlipstatError::Csv {
        path: source.to_path_buf(),
        source: e,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers().map_err(csv_err)?.clone();
    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| FlipstatError::Schema {
                path: source.to_path_buf(),
                column: name.to_string(),
            })
    };

    let percent_idx = column(KeyColumn::Percent.name())?;
    let bits_idx = column(KeyColumn::Bits.name())?;
    let metrics = metric_columns(extra_metrics);
    let metric_idx = metrics
        .iter()
        .map(|m| column(m))
        .collect::<Result<Vec<_>>>()?;

    let mut table = MetricTable::new(metrics);
    let mut report = LoadReport::default();

    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        // header is line 1
        let line = i + 2;
        let cell = |idx: usize| record.get(idx).unwrap_or("");

        let percent = coerce_number(cell(percent_idx)).and_then(GroupKey::new);
        if percent.is_none() {
            report.missing_percent += 1;
            tracing::debug!(line, value = cell(percent_idx), "percent is not numeric");
        }
        let bits = coerce_number(cell(bits_idx)).and_then(GroupKey::new);
        if bits.is_none() {
            report.missing_bits += 1;
            tracing::debug!(line, value = cell(bits_idx), "bits is not numeric");
        }

        let values: Vec<Option<f64>> = metric_idx
            .iter()
            .zip(table.metrics())
            .map(|(&idx, name)| {
                let v = coerce_number(cell(idx));
                if v.is_none() {
                    report.missing_metric_cells += 1;
                    tracing::debug!(line, column = %name, value = cell(idx), "metric is not numeric");
                }
                v
            })
            .collect();

        table.push(MetricRow {
            percent,
            bits,
            values,
        });
    }

    report.rows = table.len();
    if report.missing_percent + report.missing_bits + report.missing_metric_cells > 0 {
        tracing::warn!(
            source = %source.display(),
            missing_percent = report.missing_percent,
            missing_bits = report.missing_bits,
            missing_metric_cells = report.missing_metric_cells,
            "non-numeric cells treated as missing"
        );
    }
    tracing::info!(source = %source.display(), rows = report.rows, "loaded metric table");

    Ok((table, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "percent,bits,ssim_vs_baseline,avg_hamming_percent,mean_pixel_diff_percent\n";

    fn read(body: &str) -> Result<(MetricTable, LoadReport)> {
        let input = format!("{HEADER}{body}");
        read_table(input.as_bytes(), Path::new("mem.csv"), b',', &[])
    }

    #[test]
    fn coerce_number_treats_garbage_as_missing() {
        assert_eq!(coerce_number(" 12 "), Some(12.0));
        assert_eq!(coerce_number("1e1"), Some(10.0));
        assert_eq!(coerce_number("abc"), None);
        assert_eq!(coerce_number(""), None);
        assert_eq!(coerce_number("NaN"), None);
        assert_eq!(coerce_number("inf"), None);
    }

    #[test]
    fn non_numeric_keys_become_missing_not_zero() {
        let (table, report) = read("abc,2,0.9,10,1\n10,x,0.8,11,2\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].percent, None);
        assert_eq!(table.rows()[0].bits, GroupKey::new(2.0));
        assert_eq!(table.rows()[1].bits, None);
        assert_eq!(report.missing_percent, 1);
        assert_eq!(report.missing_bits, 1);
        assert_eq!(report.missing_metric_cells, 0);
    }

    #[test]
    fn short_rows_read_as_missing_metrics() {
        let (table, report) = read("10,2,0.9\n").unwrap();
        assert_eq!(table.rows()[0].values, vec![Some(0.9), None, None]);
        assert_eq!(report.missing_metric_cells, 2);
    }

    #[test]
    fn missing_required_column_is_schema_error() {
        let input = "percent,ssim_vs_baseline,avg_hamming_percent,mean_pixel_diff_percent\n1,0.9,1,1\n";
        let err = read_table(input.as_bytes(), Path::new("mem.csv"), b',', &[]).unwrap_err();
        match err {
            FlipstatError::Schema { column, .. } => assert_eq!(column, "bits"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn extra_metric_must_exist() {
        let input = format!("{HEADER}1,1,0.5,1,1\n");
        let err = read_table(
            input.as_bytes(),
            Path::new("mem.csv"),
            b',',
            &["psnr".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, FlipstatError::Schema { ref column, .. } if column == "psnr"));
    }

    #[test]
    fn honours_delimiter_and_trims_headers() {
        let input = "percent ; bits ; ssim_vs_baseline ; avg_hamming_percent ; mean_pixel_diff_percent\n5;1;0.5;2;3\n";
        let (table, _) = read_table(input.as_bytes(), Path::new("mem.csv"), b';', &[]).unwrap();
        assert_eq!(table.rows()[0].percent, GroupKey::new(5.0));
        assert_eq!(table.rows()[0].values, vec![Some(0.5), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn missing_file_is_reported_as_such() {
        let err = load_table(Path::new("/definitely/not/here.csv"), b',', &[]).unwrap_err();
        assert!(matches!(err, FlipstatError::MissingFile { .. }));
    }

    #[test]
    fn metric_columns_keep_standard_order_and_dedupe() {
        let cols = metric_columns(&["psnr".into(), "ssim_vs_baseline".into()]);
        assert_eq!(
            cols,
            vec![
                "ssim_vs_baseline",
                "avg_hamming_percent",
                "mean_pixel_diff_percent",
                "psnr"
            ]
        );
    }
}
