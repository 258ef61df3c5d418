//! Long-form to matrix pivot for heatmaps.
//!
//! Row labels come from the data (descending); column labels come from a
//! fixed [`ColumnDomain`] (ascending) whether or not they were observed.

use crate::model::{GroupKey, KeyColumn, MetricTable};
use crate::{FlipstatError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Matrix cell. `Missing` means no source row, which is distinct from zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Value(f64),
    Missing,
}

impl Cell {
    pub fn value(self) -> Option<f64> {
        match self {
            Cell::Value(v) => Some(v),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Cell::Missing)
    }
}

/// What to do when two rows land on the same `(row, col)` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    Fail,
    KeepLast,
}

/// Upper bound on the number of heatmap columns.
pub const MAX_COLUMNS: usize = 100_000;

/// Integers above 2^53 no longer map to distinct `f64` values.
const MAX_EXACT_INT: u64 = 1 << 53;

/// Full, sorted, de-duplicated set of column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDomain {
    labels: Vec<GroupKey>,
}

impl ColumnDomain {
    /// Integers `start..=end`, at most [`MAX_COLUMNS`] of them.
    pub fn range(start: i64, end: i64) -> Result<Self> {
        if start > end {
            return Err(FlipstatError::config(format!(
                "column domain start {start} is greater than end {end}"
            )));
        }
        if start.unsigned_abs() > MAX_EXACT_INT || end.unsigned_abs() > MAX_EXACT_INT {
            return Err(FlipstatError::config(format!(
                "column domain {start}..={end} is outside the exactly representable range"
            )));
        }
        let width = end.abs_diff(start) + 1;
        if width > MAX_COLUMNS as u64 {
            return Err(FlipstatError::config(format!(
                "column domain {start}..={end} has {width} columns, limit is {MAX_COLUMNS}"
            )));
        }
        Self::from_values((start..=end).map(|v| v as f64))
    }

    /// Explicit labels; sorted ascending and de-duplicated.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Result<Self> {
        let mut set = BTreeSet::new();
        for v in values {
            let key = GroupKey::new(v).ok_or_else(|| {
                FlipstatError::config(format!("column domain value {v} is not finite"))
            })?;
            set.insert(key);
        }
        if set.is_empty() {
            return Err(FlipstatError::config("column domain is empty"));
        }
        if set.len() > MAX_COLUMNS {
            return Err(FlipstatError::config(format!(
                "column domain has {} columns, limit is {MAX_COLUMNS}",
                set.len()
            )));
        }
        Ok(Self {
            labels: set.into_iter().collect(),
        })
    }

    /// Percentages 1 through 100.
    pub fn percent() -> Self {
        Self {
            labels: (1..=100)
                .filter_map(|v| GroupKey::new(f64::from(v)))
                .collect(),
        }
    }

    pub fn labels(&self) -> &[GroupKey] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for ColumnDomain {
    fn default() -> Self {
        Self::percent()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PivotSpec {
    pub row_key: KeyColumn,
    pub col_key: KeyColumn,
    pub metric: String,
    pub domain: ColumnDomain,
    pub on_duplicate: DuplicatePolicy,
}

impl PivotSpec {
    /// Bits as rows, percent as columns over 1..=100.
    pub fn bits_by_percent(metric: impl Into<String>) -> Self {
        Self {
            row_key: KeyColumn::Bits,
            col_key: KeyColumn::Percent,
            metric: metric.into(),
            domain: ColumnDomain::percent(),
            on_duplicate: DuplicatePolicy::Fail,
        }
    }
}

/// Counters describing what the pivot skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReshapeStats {
    pub excluded_rows: usize,
    pub out_of_domain: usize,
    pub duplicates_overwritten: usize,
}

/// Dense row-major matrix with labelled axes.
#[derive(Debug, Clone, PartialEq)]
pub struct ReshapedMatrix {
    pub row_key: KeyColumn,
    pub col_key: KeyColumn,
    pub metric: String,
    /// Descending.
    pub row_labels: Vec<GroupKey>,
    /// Ascending, exactly the domain.
    pub col_labels: Vec<GroupKey>,
    cells: Vec<Cell>,
    pub stats: ReshapeStats,
}

impl ReshapedMatrix {
    /// `None` when either label is not part of the matrix.
    pub fn get(&self, row: GroupKey, col: GroupKey) -> Option<Cell> {
        let r = self.row_labels.iter().position(|&l| l == row)?;
        let c = self.col_labels.binary_search(&col).ok()?;
        Some(self.cells[r * self.col_labels.len() + c])
    }

    pub fn row(&self, index: usize) -> &[Cell] {
        let width = self.col_labels.len();
        &self.cells[index * width..(index + 1) * width]
    }

    pub fn rows(&self) -> impl Iterator<Item = (GroupKey, &[Cell])> + '_ {
        self.row_labels
            .iter()
            .enumerate()
            .map(|(i, &label)| (label, self.row(i)))
    }

    pub fn missing_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_missing()).count()
    }

    /// Smallest and largest present value, if any.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.cells
            .iter()
            .filter_map(|c| c.value())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Pivots `table` according to `spec`.
pub fn reshape(table: &MetricTable, spec: &PivotSpec) -> Result<ReshapedMatrix> {
    let metric_idx = table.metric_index(&spec.metric)?;
    let col_labels = spec.domain.labels().to_vec();
    let mut stats = ReshapeStats::default();

    let mut placed: HashMap<(GroupKey, GroupKey), Cell> = HashMap::new();
    let mut row_set = BTreeSet::new();

    for row in table.rows() {
        let (Some(r), Some(c)) = (row.key(spec.row_key), row.key(spec.col_key)) else {
            stats.excluded_rows += 1;
            continue;
        };
        // every observed row key gets a row, even if none of its columns are in range
        row_set.insert(r);
        if col_labels.binary_search(&c).is_err() {
            stats.out_of_domain += 1;
            continue;
        }
        let cell = row.values[metric_idx].map_or(Cell::Missing, Cell::Value);
        if placed.insert((r, c), cell).is_some() {
            match spec.on_duplicate {
                DuplicatePolicy::Fail => {
                    return Err(FlipstatError::DuplicateKey {
                        row_key: spec.row_key.name().to_string(),
                        col_key: spec.col_key.name().to_string(),
                        row: r.to_string(),
                        col: c.to_string(),
                        metric: spec.metric.clone(),
                    })
                }
                DuplicatePolicy::KeepLast => stats.duplicates_overwritten += 1,
            }
        }
    }

    let row_labels: Vec<GroupKey> = row_set.into_iter().rev().collect();
    let mut cells = Vec::with_capacity(row_labels.len() * col_labels.len());
    for &r in &row_labels {
        for &c in &col_labels {
            cells.push(placed.get(&(r, c)).copied().unwrap_or(Cell::Missing));
        }
    }

    if stats.out_of_domain > 0 {
        tracing::warn!(
            metric = %spec.metric,
            out_of_domain = stats.out_of_domain,
            "rows outside the column domain were dropped"
        );
    }

    Ok(ReshapedMatrix {
        row_key: spec.row_key,
        col_key: spec.col_key,
        metric: spec.metric.clone(),
        row_labels,
        col_labels,
        cells,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MetricRow;

    fn k(v: f64) -> GroupKey {
        GroupKey::new(v).unwrap()
    }

    fn table(rows: &[(f64, f64, Option<f64>)]) -> MetricTable {
        let mut t = MetricTable::new(vec!["ssim_vs_baseline".into()]);
        for &(percent, bits, v) in rows {
            t.push(MetricRow {
                percent: GroupKey::new(percent),
                bits: GroupKey::new(bits),
                values: vec![v],
            });
        }
        t
    }

    #[test]
    fn fixed_domain_and_missing_cells() {
        let t = table(&[(10.0, 2.0, Some(0.9)), (20.0, 3.0, Some(0.5))]);
        let m = reshape(&t, &PivotSpec::bits_by_percent("ssim_vs_baseline")).unwrap();

        assert_eq!(m.col_labels.len(), 100);
        assert_eq!(m.col_labels.first(), Some(&k(1.0)));
        assert_eq!(m.col_labels.last(), Some(&k(100.0)));
        assert_eq!(m.row_labels, vec![k(3.0), k(2.0)]);

        assert_eq!(m.get(k(2.0), k(10.0)), Some(Cell::Value(0.9)));
        assert_eq!(m.get(k(2.0), k(57.0)), Some(Cell::Missing));
        assert_eq!(m.get(k(3.0), k(10.0)), Some(Cell::Missing));
        assert_eq!(m.get(k(4.0), k(10.0)), None);
        assert_eq!(m.row(0).len(), 100);
    }

    #[test]
    fn duplicates_fail_by_default() {
        let t = table(&[(10.0, 2.0, Some(0.9)), (10.0, 2.0, Some(0.7))]);
        let err = reshape(&t, &PivotSpec::bits_by_percent("ssim_vs_baseline")).unwrap_err();
        assert!(matches!(err, FlipstatError::DuplicateKey { ref row, ref col, .. }
            if row == "2" && col == "10"));
    }

    #[test]
    fn keep_last_overwrites_and_counts() {
        let t = table(&[(10.0, 2.0, Some(0.9)), (10.0, 2.0, Some(0.7))]);
        let mut spec = PivotSpec::bits_by_percent("ssim_vs_baseline");
        spec.on_duplicate = DuplicatePolicy::KeepLast;
        let m = reshape(&t, &spec).unwrap();
        assert_eq!(m.get(k(2.0), k(10.0)), Some(Cell::Value(0.7)));
        assert_eq!(m.stats.duplicates_overwritten, 1);
    }

    #[test]
    fn out_of_domain_and_missing_keys_are_counted() {
        let mut t = table(&[(0.0, 1.0, Some(0.1)), (50.5, 1.0, Some(0.2)), (5.0, 1.0, Some(0.3))]);
        t.push(MetricRow {
            percent: None,
            bits: GroupKey::new(1.0),
            values: vec![Some(0.4)],
        });
        let m = reshape(&t, &PivotSpec::bits_by_percent("ssim_vs_baseline")).unwrap();
        assert_eq!(m.stats.out_of_domain, 2);
        assert_eq!(m.stats.excluded_rows, 1);
        assert_eq!(m.row_labels, vec![k(1.0)]);
        assert_eq!(m.value_range(), Some((0.3, 0.3)));
    }

    #[test]
    fn row_seen_only_outside_the_domain_keeps_an_empty_row() {
        let t = table(&[(0.0, 5.0, Some(0.1)), (10.0, 2.0, Some(0.9))]);
        let m = reshape(&t, &PivotSpec::bits_by_percent("ssim_vs_baseline")).unwrap();
        assert_eq!(m.row_labels, vec![k(5.0), k(2.0)]);
        assert!(m.row(0).iter().all(|c| c.is_missing()));
        assert_eq!(m.get(k(2.0), k(10.0)), Some(Cell::Value(0.9)));
        assert_eq!(m.stats.out_of_domain, 1);
    }

    #[test]
    fn missing_metric_still_occupies_the_cell() {
        let t = table(&[(10.0, 2.0, None), (10.0, 2.0, Some(0.7))]);
        assert!(reshape(&t, &PivotSpec::bits_by_percent("ssim_vs_baseline")).is_err());

        let t = table(&[(10.0, 2.0, None)]);
        let m = reshape(&t, &PivotSpec::bits_by_percent("ssim_vs_baseline")).unwrap();
        assert!(m.get(k(2.0), k(10.0)).unwrap().is_missing());
        assert_eq!(m.value_range(), None);
    }

    #[test]
    fn domain_constructors_validate() {
        assert!(ColumnDomain::range(5, 1).is_err());
        assert!(ColumnDomain::from_values(Vec::new()).is_err());
        assert!(ColumnDomain::from_values([1.0, f64::NAN]).is_err());

        let d = ColumnDomain::from_values([50.0, 0.0, 25.0, 50.0]).unwrap();
        assert_eq!(d.labels(), &[k(0.0), k(25.0), k(50.0)]);
        assert_eq!(ColumnDomain::range(0, 100).unwrap().len(), 101);
        assert!(ColumnDomain::range(0, 10_000_000_000).is_err());
        assert!(ColumnDomain::range(1 << 60, (1 << 60) + 1).is_err());
        assert!(ColumnDomain::range(1, MAX_COLUMNS as i64).is_ok());
        assert!(ColumnDomain::range(1, MAX_COLUMNS as i64 + 1).is_err());
        assert_eq!(ColumnDomain::default(), ColumnDomain::percent());
    }
}
