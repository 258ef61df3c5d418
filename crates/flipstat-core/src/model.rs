use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Metric columns every input table must carry.
pub const STANDARD_METRICS: [&str; 3] = [
    "ssim_vs_baseline",
    "avg_hamming_percent",
    "mean_pixel_diff_percent",
];

/// The two numeric trial parameters rows can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyColumn {
    Percent,
    Bits,
}

impl KeyColumn {
    pub const ALL: [KeyColumn; 2] = [KeyColumn::Percent, KeyColumn::Bits];

    pub fn name(self) -> &'static str {
        match self {
            KeyColumn::Percent => "percent",
            KeyColumn::Bits => "bits",
        }
    }
}

impl fmt::Display for KeyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric grouping key with exact equality and a total order.
///
/// Always finite; `-0.0` is folded into `0.0` so both land in one group.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct GroupKey(f64);

impl GroupKey {
    /// Returns `None` for NaN and infinities.
    pub fn new(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(Self(if value == 0.0 { 0.0 } else { value }))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One observation. Missing values are `None`, never zero.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub percent: Option<GroupKey>,
    pub bits: Option<GroupKey>,
    /// Indexed by the owning table's `metrics` order.
    pub values: Vec<Option<f64>>,
}

impl MetricRow {
    pub fn key(&self, column: KeyColumn) -> Option<GroupKey> {
        match column {
            KeyColumn::Percent => self.percent,
            KeyColumn::Bits => self.bits,
        }
    }
}

/// In-memory long-form table of trial metrics.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricTable {
    metrics: Vec<String>,
    rows: Vec<MetricRow>,
}

impl MetricTable {
    pub fn new(metrics: Vec<String>) -> Self {
        Self {
            metrics,
            rows: Vec::new(),
        }
    }

    /// Appends a row. `values` must follow the table's metric order.
    pub fn push(&mut self, row: MetricRow) {
        debug_assert_eq!(row.values.len(), self.metrics.len());
        self.rows.push(row);
    }

    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn metric_index(&self, name: &str) -> crate::Result<usize> {
        self.metrics
            .iter()
            .position(|m| m == name)
            .ok_or_else(|| crate::FlipstatError::UnknownMetric {
                column: name.to_string(),
            })
    }
}
