//! Mean of each metric by flip percentage and by bits flipped, one line
//! chart per (metric, key).

use super::{aggregate_and_write, finish, key_axis, key_title, load, metric_names};
use crate::aggregate::{AggregationSpec, Statistic};
use crate::chart::{mean_line, ChartLabels, ChartSink};
use crate::config::{PipelineConfig, SummaryConfig};
use crate::model::KeyColumn;
use crate::report::{PipelineKind, StageReport};
use crate::Result;

fn output_name(key: KeyColumn) -> &'static str {
    match key {
        KeyColumn::Percent => "summary_percentages.csv",
        KeyColumn::Bits => "summary_bits.csv",
    }
}

pub fn run_summary(
    cfg: &PipelineConfig,
    opts: &SummaryConfig,
    sink: &mut dyn ChartSink,
) -> Result<StageReport> {
    let (table, load_report) = load(cfg, &opts.metrics)?;
    let mut report = StageReport::new(PipelineKind::Summary, cfg.input_path.clone(), load_report);

    let mut summaries = Vec::new();
    for key in KeyColumn::ALL {
        let spec = AggregationSpec {
            key,
            metrics: opts.metrics.clone(),
            statistics: vec![Statistic::Mean],
        };
        let summary = aggregate_and_write(&table, &spec, cfg, output_name(key), &mut report)?;
        summaries.push(summary);
    }

    for summary in &summaries {
        for metric in &opts.metrics {
            let (short, title) = metric_names(metric);
            let labels = ChartLabels {
                title: format!("Average {} vs {}", title, key_title(summary.key)),
                x: key_axis(summary.key).to_string(),
                y: format!("Average {title}"),
            };
            let name = format!("{}_vs_{}", short, summary.key.name());
            if let Some(chart) = mean_line(summary, metric, name, labels) {
                report.charts.push(sink.line(&cfg.plot_dir, &chart)?);
            }
        }
    }

    finish(cfg, report)
}
