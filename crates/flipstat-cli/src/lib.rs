//! Shared entry point for the `flipstat-*` binaries.
//!
//! Each binary reads `flipstat.yaml` from the working directory (defaults
//! apply when it is absent), runs one pipeline and renders charts as SVG.

pub mod exit_codes;
pub mod render;

use anyhow::Context;
use flipstat_core::config::{Config, DEFAULT_CONFIG_FILE};
use flipstat_core::pipeline::{run_heatmap, run_minmax, run_summary};
use flipstat_core::report::{PipelineKind, StageReport};
use render::SvgSink;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; `RUST_LOG` overrides the default `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn execute(kind: PipelineKind, config_path: &Path) -> anyhow::Result<StageReport> {
    let config = Config::load_or_default(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let mut sink = SvgSink;

    let report = match kind {
        PipelineKind::Summary => {
            let cfg = config.pipeline(&config.summary.plot_dir)?;
            run_summary(&cfg, &config.summary, &mut sink)
        }
        PipelineKind::Minmax => {
            let cfg = config.pipeline(&config.minmax.plot_dir)?;
            run_minmax(&cfg, &config.minmax, &mut sink)
        }
        PipelineKind::Heatmap => {
            let cfg = config.pipeline(&config.heatmap.plot_dir)?;
            run_heatmap(&cfg, &config.heatmap, &mut sink)
        }
    };
    report.with_context(|| format!("{} pipeline failed", kind.name()))
}

/// Runs `kind` against `./flipstat.yaml` and returns the process exit code.
pub fn run(kind: PipelineKind) -> i32 {
    match execute(kind, Path::new(DEFAULT_CONFIG_FILE)) {
        Ok(report) => {
            for line in report.summary_lines() {
                eprintln!("{line}");
            }
            exit_codes::SUCCESS
        }
        Err(e) => {
            eprintln!("fatal: {e:#}");
            exit_codes::for_error(&e)
        }
    }
}
