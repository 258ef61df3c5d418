//! Chart descriptions handed to a [`ChartSink`].
//!
//! The core only decides what to plot; drawing is the sink's job.

use crate::aggregate::GroupSummary;
use crate::reshape::ReshapedMatrix;
use crate::Result;
use std::path::{Path, PathBuf};

/// Axis titles and caption shared by every chart kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLabels {
    pub title: String,
    pub x: String,
    pub y: String,
}

/// Single series, one point per group.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    /// File stem; the sink chooses the extension.
    pub name: String,
    pub labels: ChartLabels,
    pub points: Vec<(f64, f64)>,
}

/// Mean line over a shaded min..max band.
#[derive(Debug, Clone, PartialEq)]
pub struct BandChart {
    pub name: String,
    pub labels: ChartLabels,
    pub series_label: String,
    pub band_label: String,
    /// `(x, mean, min, max)`.
    pub points: Vec<(f64, f64, f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapChart<'a> {
    pub name: String,
    pub labels: ChartLabels,
    pub matrix: &'a ReshapedMatrix,
}

/// Destination for rendered charts.
pub trait ChartSink {
    /// Returns the path of the written image.
    fn line(&mut self, dir: &Path, chart: &LineChart) -> Result<PathBuf>;
    fn band(&mut self, dir: &Path, chart: &BandChart) -> Result<PathBuf>;
    fn heatmap(&mut self, dir: &Path, chart: &HeatmapChart<'_>) -> Result<PathBuf>;
}

/// Builds a line chart of one metric's mean. Groups without a mean are skipped.
pub fn mean_line(
    summary: &GroupSummary,
    metric: &str,
    name: impl Into<String>,
    labels: ChartLabels,
) -> Option<LineChart> {
    let points = summary
        .metric_series(metric)?
        .into_iter()
        .filter_map(|(key, stats)| stats.mean.map(|m| (key.value(), m)))
        .collect();
    Some(LineChart {
        name: name.into(),
        labels,
        points,
    })
}

/// Builds a mean/min/max band chart of one metric.
pub fn min_max_band(
    summary: &GroupSummary,
    metric: &str,
    name: impl Into<String>,
    labels: ChartLabels,
) -> Option<BandChart> {
    let points = summary
        .metric_series(metric)?
        .into_iter()
        .filter_map(|(key, s)| Some((key.value(), s.mean?, s.min?, s.max?)))
        .collect();
    Some(BandChart {
        name: name.into(),
        labels,
        series_label: "Average".to_string(),
        band_label: "Min-Max Range".to_string(),
        points,
    })
}

/// Sink that records chart descriptions instead of drawing them.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub lines: Vec<LineChart>,
    pub bands: Vec<BandChart>,
    /// `(name, rows, cols)` of each heatmap.
    pub heatmaps: Vec<(String, usize, usize)>,
}

impl ChartSink for RecordingSink {
    fn line(&mut self, dir: &Path, chart: &LineChart) -> Result<PathBuf> {
        self.lines.push(chart.clone());
        Ok(dir.join(&chart.name))
    }

    fn band(&mut self, dir: &Path, chart: &BandChart) -> Result<PathBuf> {
        self.bands.push(chart.clone());
        Ok(dir.join(&chart.name))
    }

    fn heatmap(&mut self, dir: &Path, chart: &HeatmapChart<'_>) -> Result<PathBuf> {
        self.heatmaps.push((
            chart.name.clone(),
            chart.matrix.row_labels.len(),
            chart.matrix.col_labels.len(),
        ));
        Ok(dir.join(&chart.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, AggregationSpec, Statistic};
    use crate::model::{GroupKey, KeyColumn, MetricRow, MetricTable};

    fn labels() -> ChartLabels {
        ChartLabels {
            title: "t".into(),
            x: "x".into(),
            y: "y".into(),
        }
    }

    fn summary() -> GroupSummary {
        let mut t = MetricTable::new(vec!["ssim_vs_baseline".into()]);
        for (p, v) in [(1.0, Some(0.9)), (1.0, Some(0.5)), (2.0, None), (3.0, Some(0.1))] {
            t.push(MetricRow {
                percent: GroupKey::new(p),
                bits: GroupKey::new(0.0),
                values: vec![v],
            });
        }
        aggregate(
            &t,
            &AggregationSpec {
                key: KeyColumn::Percent,
                metrics: vec!["ssim_vs_baseline".into()],
                statistics: vec![Statistic::Mean, Statistic::Min, Statistic::Max],
            },
        )
        .unwrap()
    }

    #[test]
    fn line_skips_groups_without_a_mean() {
        let chart = mean_line(&summary(), "ssim_vs_baseline", "ssim", labels()).unwrap();
        assert_eq!(chart.points.len(), 2);
        assert_eq!(chart.points[1], (3.0, 0.1));
        assert!(mean_line(&summary(), "psnr", "psnr", labels()).is_none());
    }

    #[test]
    fn band_carries_min_and_max() {
        let chart = min_max_band(&summary(), "ssim_vs_baseline", "band", labels()).unwrap();
        let (x, mean, min, max) = chart.points[0];
        assert_eq!(x, 1.0);
        assert!((mean - 0.7).abs() < 1e-12);
        assert_eq!((min, max), (0.5, 0.9));
    }
}
