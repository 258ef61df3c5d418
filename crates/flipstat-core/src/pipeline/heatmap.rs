//! bits x percent matrices, one CSV and one heatmap per metric.

use super::{finish, key_axis, load};
use crate::chart::{ChartLabels, ChartSink, HeatmapChart};
use crate::config::{HeatmapConfig, PipelineConfig};
use crate::model::KeyColumn;
use crate::report::{MatrixReport, PipelineKind, StageReport};
use crate::reshape::{reshape, PivotSpec};
use crate::writer;
use crate::Result;

fn heatmap_title(metric: &str) -> &str {
    match metric {
        "avg_hamming_percent" => "Average Hamming Distance (%)",
        "mean_pixel_diff_percent" => "Mean Pixel Difference (%)",
        "ssim_vs_baseline" => "SSIM vs Baseline",
        other => other,
    }
}

pub fn run_heatmap(
    cfg: &PipelineConfig,
    opts: &HeatmapConfig,
    sink: &mut dyn ChartSink,
) -> Result<StageReport> {
    let domain = opts.column_domain.build()?;
    let (table, load_report) = load(cfg, &opts.metrics)?;
    let mut report = StageReport::new(PipelineKind::Heatmap, cfg.input_path.clone(), load_report);

    for metric in &opts.metrics {
        let spec = PivotSpec {
            row_key: KeyColumn::Bits,
            col_key: KeyColumn::Percent,
            metric: metric.clone(),
            domain: domain.clone(),
            on_duplicate: opts.on_duplicate,
        };
        let matrix = reshape(&table, &spec)?;

        let output = cfg.output_dir.join(format!("heatmap_{metric}.csv"));
        writer::write_matrix_csv(&matrix, &output, cfg.delimiter)?;

        let title = heatmap_title(metric);
        let chart = HeatmapChart {
            name: format!("heatmap_{metric}"),
            labels: ChartLabels {
                title: title.to_string(),
                x: key_axis(spec.col_key).to_string(),
                y: key_axis(spec.row_key).to_string(),
            },
            matrix: &matrix,
        };
        report.charts.push(sink.heatmap(&cfg.plot_dir, &chart)?);

        report.matrices.push(MatrixReport {
            metric: metric.clone(),
            rows: matrix.row_labels.len(),
            cols: matrix.col_labels.len(),
            missing_cells: matrix.missing_cells(),
            stats: matrix.stats.clone(),
            output,
        });
    }

    finish(cfg, report)
}
