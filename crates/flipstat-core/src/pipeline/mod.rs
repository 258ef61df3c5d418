//! The three runnable stages: load, reduce, write, plot.

pub mod heatmap;
pub mod minmax;
pub mod summary;

pub use heatmap::run_heatmap;
pub use minmax::run_minmax;
pub use summary::run_summary;

use crate::aggregate::{aggregate, AggregationSpec, GroupSummary};
use crate::config::PipelineConfig;
use crate::loader::{load_table, LoadReport};
use crate::model::{KeyColumn, MetricTable};
use crate::report::{GroupingReport, StageReport};
use crate::writer;
use crate::Result;

fn load(cfg: &PipelineConfig, metrics: &[String]) -> Result<(MetricTable, LoadReport)> {
    load_table(&cfg.input_path, cfg.delimiter, metrics)
}

/// Aggregates by `spec.key`, writes `file_name` under `output_dir`, records it.
fn aggregate_and_write(
    table: &MetricTable,
    spec: &AggregationSpec,
    cfg: &PipelineConfig,
    file_name: &str,
    report: &mut StageReport,
) -> Result<GroupSummary> {
    let summary = aggregate(table, spec)?;
    let output = cfg.output_dir.join(file_name);
    writer::write_summary_csv(&summary, &output, cfg.delimiter)?;
    report.groupings.push(GroupingReport {
        key: spec.key,
        groups: summary.rows.len(),
        excluded_rows: summary.excluded_rows,
        output,
    });
    Ok(summary)
}

fn finish(cfg: &PipelineConfig, report: StageReport) -> Result<StageReport> {
    if cfg.write_report {
        let path = cfg
            .output_dir
            .join(format!("{}_report.json", report.pipeline.name()));
        writer::write_json(&report, &path)?;
    }
    tracing::info!(
        pipeline = report.pipeline.name(),
        outputs = report.outputs().count(),
        "stage complete"
    );
    Ok(report)
}

/// Axis title for a key column, as the charts show it.
fn key_axis(key: KeyColumn) -> &'static str {
    match key {
        KeyColumn::Percent => "Flip Percentage (%)",
        KeyColumn::Bits => "Bits Flipped",
    }
}

/// Key name as used in chart captions.
fn key_title(key: KeyColumn) -> &'static str {
    match key {
        KeyColumn::Percent => "Flip Percentage",
        KeyColumn::Bits => "Bits Flipped",
    }
}

/// `(file stem fragment, human title)` for the well-known metrics.
fn metric_names(metric: &str) -> (&str, &str) {
    match metric {
        "ssim_vs_baseline" => ("ssim", "SSIM"),
        "avg_hamming_percent" => ("hamming", "Hamming Distance (%)"),
        "mean_pixel_diff_percent" => ("pixel_diff", "Mean Pixel Difference (%)"),
        other => (other, other),
    }
}
