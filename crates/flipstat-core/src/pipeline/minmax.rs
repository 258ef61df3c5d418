//! Mean, min and max of one metric per key, drawn as a shaded band.

use super::{aggregate_and_write, finish, key_axis, key_title, load, metric_names};
use crate::aggregate::{AggregationSpec, Statistic};
use crate::chart::{min_max_band, ChartLabels, ChartSink};
use crate::config::{MinMaxConfig, PipelineConfig};
use crate::model::KeyColumn;
use crate::report::{PipelineKind, StageReport};
use crate::Result;

fn key_slug(key: KeyColumn) -> &'static str {
    match key {
        KeyColumn::Percent => "percentage",
        KeyColumn::Bits => "bits",
    }
}

pub fn run_minmax(
    cfg: &PipelineConfig,
    opts: &MinMaxConfig,
    sink: &mut dyn ChartSink,
) -> Result<StageReport> {
    let metrics = vec![opts.metric.clone()];
    let (table, load_report) = load(cfg, &metrics)?;
    let mut report = StageReport::new(PipelineKind::Minmax, cfg.input_path.clone(), load_report);
    let (short, title) = metric_names(&opts.metric);

    for key in KeyColumn::ALL {
        let spec = AggregationSpec {
            key,
            metrics: metrics.clone(),
            statistics: vec![Statistic::Mean, Statistic::Min, Statistic::Max],
        };
        let file_name = format!("{}_stats_by_{}.csv", short, key_slug(key));
        let summary = aggregate_and_write(&table, &spec, cfg, &file_name, &mut report)?;

        let labels = ChartLabels {
            title: format!("{} vs {} (Average, Min, Max)", title, key_title(key)),
            x: key_axis(key).to_string(),
            y: title.to_string(),
        };
        let name = format!("{}_vs_{}", short, key_slug(key));
        if let Some(mut chart) = min_max_band(&summary, &opts.metric, name, labels) {
            chart.series_label = format!("Average {title}");
            report.charts.push(sink.band(&cfg.plot_dir, &chart)?);
        }
    }

    finish(cfg, report)
}
