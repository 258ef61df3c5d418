//! Structured per-stage report returned by every pipeline.

use crate::loader::LoadReport;
use crate::model::KeyColumn;
use crate::reshape::ReshapeStats;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Summary,
    Minmax,
    Heatmap,
}

impl PipelineKind {
    pub fn name(self) -> &'static str {
        match self {
            PipelineKind::Summary => "summary",
            PipelineKind::Minmax => "minmax",
            PipelineKind::Heatmap => "heatmap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupingReport {
    pub key: KeyColumn,
    pub groups: usize,
    pub excluded_rows: usize,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixReport {
    pub metric: String,
    pub rows: usize,
    pub cols: usize,
    pub missing_cells: usize,
    #[serde(flatten)]
    pub stats: ReshapeStats,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub pipeline: PipelineKind,
    pub input: PathBuf,
    pub load: LoadReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groupings: Vec<GroupingReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matrices: Vec<MatrixReport>,
    pub charts: Vec<PathBuf>,
}

impl StageReport {
    pub fn new(pipeline: PipelineKind, input: PathBuf, load: LoadReport) -> Self {
        Self {
            pipeline,
            input,
            load,
            groupings: Vec::new(),
            matrices: Vec::new(),
            charts: Vec::new(),
        }
    }

    /// Every file written by the stage, CSVs first.
    pub fn outputs(&self) -> impl Iterator<Item = &PathBuf> + '_ {
        self.groupings
            .iter()
            .map(|g| &g.output)
            .chain(self.matrices.iter().map(|m| &m.output))
            .chain(self.charts.iter())
    }

    /// Human readable lines for stderr.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{}: {} rows from {}",
            self.pipeline.name(),
            self.load.rows,
            self.input.display()
        )];
        for g in &self.groupings {
            lines.push(format!(
                "  by {}: {} groups ({} rows without {}) -> {}",
                g.key,
                g.groups,
                g.excluded_rows,
                g.key,
                g.output.display()
            ));
        }
        for m in &self.matrices {
            lines.push(format!(
                "  {}: {}x{} matrix, {} missing cells -> {}",
                m.metric,
                m.rows,
                m.cols,
                m.missing_cells,
                m.output.display()
            ));
        }
        for c in &self.charts {
            lines.push(format!("  chart {}", c.display()));
        }
        lines
    }
}
