//! Group-by-key aggregation of metric columns.

use crate::model::{GroupKey, KeyColumn, MetricTable};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Mean,
    Min,
    Max,
}

impl Statistic {
    pub fn suffix(self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Min => "min",
            Statistic::Max => "max",
        }
    }
}

/// Reduced statistics of one metric within one group.
///
/// `n` counts only rows where the metric was present; all fields are `None`
/// when `n == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricStats {
    pub n: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl MetricStats {
    pub fn get(&self, stat: Statistic) -> Option<f64> {
        match stat {
            Statistic::Mean => self.mean,
            Statistic::Min => self.min,
            Statistic::Max => self.max,
        }
    }
}

#[derive(Default)]
struct Accumulator {
    n: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn push(&mut self, v: f64) {
        if self.n == 0 {
            self.min = v;
            self.max = v;
        } else {
            self.min = self.min.min(v);
            self.max = self.max.max(v);
        }
        self.n += 1;
        self.sum += v;
    }

    fn finish(&self) -> MetricStats {
        if self.n == 0 {
            return MetricStats::default();
        }
        MetricStats {
            n: self.n,
            mean: Some(self.sum / self.n as f64),
            min: Some(self.min),
            max: Some(self.max),
        }
    }
}

/// One output row: a key value and per-metric statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub key: GroupKey,
    /// Rows in the group, regardless of metric presence.
    pub rows: usize,
    /// Indexed like [`GroupSummary::metrics`].
    pub stats: Vec<MetricStats>,
}

/// Grouped statistics ordered by ascending key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: KeyColumn,
    pub metrics: Vec<String>,
    pub statistics: Vec<Statistic>,
    pub rows: Vec<SummaryRow>,
    /// Input rows skipped because their key was missing.
    pub excluded_rows: usize,
}

impl GroupSummary {
    /// Header: key column, then `<metric>_<stat>` per metric and statistic.
    pub fn header(&self) -> Vec<String> {
        let mut header = vec![self.key.name().to_string()];
        for m in &self.metrics {
            for s in &self.statistics {
                header.push(format!("{}_{}", m, s.suffix()));
            }
        }
        header
    }

    /// `(key, stats)` pairs of one metric, in key order.
    pub fn metric_series(&self, metric: &str) -> Option<Vec<(GroupKey, MetricStats)>> {
        let idx = self.metrics.iter().position(|m| m == metric)?;
        Some(self.rows.iter().map(|r| (r.key, r.stats[idx])).collect())
    }
}

/// What to group by and what to compute.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSpec {
    pub key: KeyColumn,
    pub metrics: Vec<String>,
    pub statistics: Vec<Statistic>,
}

/// Groups `table` by `spec.key` and reduces every requested metric.
pub fn aggregate(table: &MetricTable, spec: &AggregationSpec) -> Result<GroupSummary> {
    let indices = spec
        .metrics
        .iter()
        .map(|m| table.metric_index(m))
        .collect::<Result<Vec<_>>>()?;

    let mut groups: BTreeMap<GroupKey, (usize, Vec<Accumulator>)> = BTreeMap::new();
    let mut excluded_rows = 0;

    for row in table.rows() {
        let Some(key) = row.key(spec.key) else {
            excluded_rows += 1;
            continue;
        };
        let (count, accs) = groups.entry(key).or_insert_with(|| {
            (
                0,
                std::iter::repeat_with(Accumulator::default)
                    .take(indices.len())
                    .collect(),
            )
        });
        *count += 1;
        for (acc, &idx) in accs.iter_mut().zip(&indices) {
            if let Some(v) = row.values[idx] {
                acc.push(v);
            }
        }
    }

    let rows = groups
        .into_iter()
        .map(|(key, (rows, accs))| SummaryRow {
            key,
            rows,
            stats: accs.iter().map(Accumulator::finish).collect(),
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        key = %spec.key,
        groups = rows.len(),
        excluded_rows,
        "aggregated metric table"
    );

    Ok(GroupSummary {
        key: spec.key,
        metrics: spec.metrics.clone(),
        statistics: spec.statistics.clone(),
        rows,
        excluded_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MetricRow;

    fn k(v: f64) -> Option<GroupKey> {
        GroupKey::new(v)
    }

    fn table(rows: &[(Option<GroupKey>, Option<GroupKey>, Option<f64>)]) -> MetricTable {
        let mut t = MetricTable::new(vec!["ssim_vs_baseline".into()]);
        for &(percent, bits, ssim) in rows {
            t.push(MetricRow {
                percent,
                bits,
                values: vec![ssim],
            });
        }
        t
    }

    fn spec(key: KeyColumn) -> AggregationSpec {
        AggregationSpec {
            key,
            metrics: vec!["ssim_vs_baseline".into()],
            statistics: vec![Statistic::Mean, Statistic::Min, Statistic::Max],
        }
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-12)
    }

    #[test]
    fn groups_by_percent_with_min_mean_max() {
        let t = table(&[
            (k(10.0), k(2.0), Some(0.9)),
            (k(10.0), k(2.0), Some(0.7)),
            (k(20.0), k(3.0), Some(0.5)),
        ]);
        let s = aggregate(&t, &spec(KeyColumn::Percent)).unwrap();
        assert_eq!(s.rows.len(), 2);

        let first = &s.rows[0];
        assert_eq!(first.key, k(10.0).unwrap());
        assert_eq!(first.rows, 2);
        assert!(close(first.stats[0].mean, 0.8));
        assert!(close(first.stats[0].min, 0.7));
        assert!(close(first.stats[0].max, 0.9));

        let second = &s.rows[1];
        assert_eq!(second.key, k(20.0).unwrap());
        assert_eq!(second.stats[0].mean, Some(0.5));
        assert_eq!(second.stats[0].min, Some(0.5));
        assert_eq!(second.stats[0].max, Some(0.5));
    }

    #[test]
    fn missing_key_only_drops_row_from_that_grouping() {
        let t = table(&[(None, k(4.0), Some(0.3)), (k(1.0), k(4.0), Some(0.5))]);

        let by_percent = aggregate(&t, &spec(KeyColumn::Percent)).unwrap();
        assert_eq!(by_percent.rows.len(), 1);
        assert_eq!(by_percent.excluded_rows, 1);

        let by_bits = aggregate(&t, &spec(KeyColumn::Bits)).unwrap();
        assert_eq!(by_bits.rows.len(), 1);
        assert_eq!(by_bits.rows[0].rows, 2);
        assert!(close(by_bits.rows[0].stats[0].mean, 0.4));
    }

    #[test]
    fn missing_metric_is_excluded_from_that_metric_only() {
        let t = table(&[(k(5.0), k(1.0), None), (k(5.0), k(1.0), Some(0.6))]);
        let s = aggregate(&t, &spec(KeyColumn::Percent)).unwrap();
        assert_eq!(s.rows[0].rows, 2);
        assert_eq!(s.rows[0].stats[0].n, 1);
        assert_eq!(s.rows[0].stats[0].mean, Some(0.6));
    }

    #[test]
    fn all_missing_metric_reports_missing_stats() {
        let t = table(&[(k(5.0), k(1.0), None)]);
        let s = aggregate(&t, &spec(KeyColumn::Percent)).unwrap();
        assert_eq!(s.rows[0].stats[0], MetricStats::default());
    }

    #[test]
    fn header_lists_metric_stat_pairs() {
        let t = table(&[]);
        let s = aggregate(&t, &spec(KeyColumn::Bits)).unwrap();
        assert!(s.rows.is_empty());
        assert_eq!(
            s.header(),
            vec![
                "bits",
                "ssim_vs_baseline_mean",
                "ssim_vs_baseline_min",
                "ssim_vs_baseline_max"
            ]
        );
    }

    #[test]
    fn unknown_metric_is_an_error() {
        let t = table(&[]);
        let mut bad = spec(KeyColumn::Bits);
        bad.metrics.push("psnr".into());
        assert!(aggregate(&t, &bad).is_err());
    }
}
