//! `flipstat.yaml` loading.
//!
//! Unknown keys are collected through `serde_ignored` and logged, not rejected.

use crate::reshape::{ColumnDomain, DuplicatePolicy};
use crate::{FlipstatError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "flipstat.yaml";
const RESULTS_DIR: &str = "bitflip_results";

/// Paths for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub plot_dir: PathBuf,
    pub delimiter: u8,
    pub write_report: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub delimiter: char,
    /// Write `<pipeline>_report.json` next to the CSV outputs.
    pub write_report: bool,
    pub summary: SummaryConfig,
    pub minmax: MinMaxConfig,
    pub heatmap: HeatmapConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_path: Path::new(RESULTS_DIR).join("matrix_results.csv"),
            output_dir: PathBuf::from(RESULTS_DIR),
            delimiter: ',',
            write_report: true,
            summary: SummaryConfig::default(),
            minmax: MinMaxConfig::default(),
            heatmap: HeatmapConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub plot_dir: PathBuf,
    pub metrics: Vec<String>,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            plot_dir: Path::new(RESULTS_DIR).join("summary_plots"),
            metrics: vec!["ssim_vs_baseline".into(), "avg_hamming_percent".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MinMaxConfig {
    pub plot_dir: PathBuf,
    pub metric: String,
}

impl Default for MinMaxConfig {
    fn default() -> Self {
        Self {
            plot_dir: Path::new(RESULTS_DIR).join("ssim_stats_plots"),
            metric: "ssim_vs_baseline".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub plot_dir: PathBuf,
    pub metrics: Vec<String>,
    pub column_domain: DomainConfig,
    pub on_duplicate: DuplicatePolicy,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            plot_dir: Path::new(RESULTS_DIR).join("heatmaps"),
            metrics: vec![
                "avg_hamming_percent".into(),
                "mean_pixel_diff_percent".into(),
                "ssim_vs_baseline".into(),
            ],
            column_domain: DomainConfig::default(),
            on_duplicate: DuplicatePolicy::Fail,
        }
    }
}

/// Heatmap column labels: an inclusive integer range or an explicit list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DomainConfig {
    Range { start: i64, end: i64 },
    Values { values: Vec<f64> },
}

impl Default for DomainConfig {
    fn default() -> Self {
        DomainConfig::Range { start: 1, end: 100 }
    }
}

impl DomainConfig {
    pub fn build(&self) -> Result<ColumnDomain> {
        match self {
            DomainConfig::Range { start, end } => ColumnDomain::range(*start, *end),
            DomainConfig::Values { values } => ColumnDomain::from_values(values.iter().copied()),
        }
    }
}

impl Config {
    /// Reads `path` if it exists, otherwise returns defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FlipstatError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        let cfg = Self::from_yaml(&raw).map_err(|e| match e {
            FlipstatError::Config { message } => {
                FlipstatError::config(format!("{}: {message}", path.display()))
            }
            other => other,
        })?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        let mut ignored = Vec::new();
        let de = serde_yaml::Deserializer::from_str(raw);
        let cfg: Config = serde_ignored::deserialize(de, |path| ignored.push(path.to_string()))
            .map_err(|e| FlipstatError::config(format!("failed to parse yaml: {e}")))?;
        for key in &ignored {
            tracing::warn!(key = %key, "ignoring unknown config key");
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;
        self.heatmap.column_domain.build()?;
        if self.summary.metrics.is_empty() {
            return Err(FlipstatError::config("summary.metrics must not be empty"));
        }
        if self.heatmap.metrics.is_empty() {
            return Err(FlipstatError::config("heatmap.metrics must not be empty"));
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(FlipstatError::config(format!(
                "delimiter {:?} must be a single ASCII character",
                self.delimiter
            )))
        }
    }

    /// Shared paths plus the given plot directory.
    pub fn pipeline(&self, plot_dir: &Path) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            input_path: self.input_path.clone(),
            output_dir: self.output_dir.clone(),
            plot_dir: plot_dir.to_path_buf(),
            delimiter: self.delimiter_byte()?,
            write_report: self.write_report,
        })
    }
}
