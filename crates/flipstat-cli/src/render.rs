//! `ChartSink` backed by plotters' SVG backend.
//!
//! Charts are rendered into memory and written with the same atomic rename
//! as the CSV outputs.

use flipstat_core::chart::{BandChart, ChartSink, HeatmapChart, LineChart};
use flipstat_core::reshape::Cell;
use flipstat_core::writer::write_atomic;
use flipstat_core::{FlipstatError, Result};
use plotters::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};

type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

const LINE_SIZE: (u32, u32) = (800, 400);
const BAND_SIZE: (u32, u32) = (1000, 500);
const HEATMAP_SIZE: (u32, u32) = (1200, 450);
const MISSING_COLOR: RGBColor = RGBColor(220, 220, 220);

#[derive(Debug, Default)]
pub struct SvgSink;

impl SvgSink {
    fn emit(
        dir: &Path,
        name: &str,
        size: (u32, u32),
        draw: impl FnOnce(DrawingArea<SVGBackend<'_>, plotters::coord::Shift>) -> DrawResult,
    ) -> Result<PathBuf> {
        let path = dir.join(format!("{name}.svg"));
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
            draw(root).map_err(|e| FlipstatError::render(&path, e))?;
        }
        write_atomic(&path, svg.as_bytes())?;
        tracing::info!(path = %path.display(), "rendered chart");
        Ok(path)
    }
}

impl ChartSink for SvgSink {
    fn line(&mut self, dir: &Path, chart: &LineChart) -> Result<PathBuf> {
        Self::emit(dir, &chart.name, LINE_SIZE, |root| draw_line(root, chart))
    }

    fn band(&mut self, dir: &Path, chart: &BandChart) -> Result<PathBuf> {
        Self::emit(dir, &chart.name, BAND_SIZE, |root| draw_band(root, chart))
    }

    fn heatmap(&mut self, dir: &Path, chart: &HeatmapChart<'_>) -> Result<PathBuf> {
        Self::emit(dir, &chart.name, HEATMAP_SIZE, |root| draw_heatmap(root, chart))
    }
}

/// Axis range covering `values` with a 5% margin; never empty.
fn padded_range(values: impl IntoIterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let span = hi - lo;
    let pad = if span > 0.0 {
        span * 0.05
    } else {
        (lo.abs() * 0.05).max(0.5)
    };
    (lo - pad)..(hi + pad)
}

fn draw_line(root: DrawingArea<SVGBackend<'_>, plotters::coord::Shift>, chart: &LineChart) -> DrawResult {
    root.fill(&WHITE)?;
    let x_range = padded_range(chart.points.iter().map(|p| p.0));
    let y_range = padded_range(chart.points.iter().map(|p| p.1));

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.labels.title, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;
    ctx.configure_mesh()
        .x_desc(&chart.labels.x)
        .y_desc(&chart.labels.y)
        .draw()?;

    ctx.draw_series(LineSeries::new(
        chart.points.iter().copied(),
        BLUE.stroke_width(2),
    ))?;
    ctx.draw_series(
        chart
            .points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, BLUE.filled())),
    )?;
    root.present()?;
    Ok(())
}

fn draw_band(root: DrawingArea<SVGBackend<'_>, plotters::coord::Shift>, chart: &BandChart) -> DrawResult {
    root.fill(&WHITE)?;
    let x_range = padded_range(chart.points.iter().map(|p| p.0));
    let y_range = padded_range(chart.points.iter().flat_map(|p| [p.2, p.3]));

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.labels.title, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;
    ctx.configure_mesh()
        .x_desc(&chart.labels.x)
        .y_desc(&chart.labels.y)
        .draw()?;

    // upper edge left to right, lower edge back
    let mut outline: Vec<(f64, f64)> = chart.points.iter().map(|p| (p.0, p.3)).collect();
    outline.extend(chart.points.iter().rev().map(|p| (p.0, p.2)));
    let band_style = BLUE.mix(0.25).filled();
    ctx.draw_series(std::iter::once(Polygon::new(outline, band_style)))?
        .label(&chart.band_label)
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], band_style));

    ctx.draw_series(LineSeries::new(
        chart.points.iter().map(|p| (p.0, p.1)),
        BLUE.stroke_width(2),
    ))?
    .label(&chart.series_label)
    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));

    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// Dark purple for the low end through to yellow for the high end.
fn heat_color(t: f64) -> HSLColor {
    let t = t.clamp(0.0, 1.0);
    HSLColor(0.75 - 0.6 * t, 0.8, 0.25 + 0.35 * t)
}

fn draw_heatmap(
    root: DrawingArea<SVGBackend<'_>, plotters::coord::Shift>,
    chart: &HeatmapChart<'_>,
) -> DrawResult {
    root.fill(&WHITE)?;
    let matrix = chart.matrix;
    let cols = matrix.col_labels.len();
    let rows = matrix.row_labels.len();

    let caption = match matrix.value_range() {
        Some((lo, hi)) => format!("{} [{lo:.3} .. {hi:.3}]", chart.labels.title),
        None => format!("{} [no data]", chart.labels.title),
    };
    let (lo, hi) = matrix.value_range().unwrap_or((0.0, 1.0));
    let span = if hi > lo { hi - lo } else { 1.0 };

    // Cell centres sit on integer coordinates so tick labels map 1:1 to labels.
    let mut ctx = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 20))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..(cols as f64 - 0.5), -0.5..(rows.max(1) as f64 - 0.5))?;

    let col_label = |x: &f64| {
        let i = x.round();
        if (x - i).abs() > 1e-6 || i < 0.0 {
            return String::new();
        }
        matrix
            .col_labels
            .get(i as usize)
            .map(ToString::to_string)
            .unwrap_or_default()
    };
    let row_label = |y: &f64| {
        let i = y.round();
        if (y - i).abs() > 1e-6 || i < 0.0 || i as usize >= rows {
            return String::new();
        }
        matrix.row_labels[rows - 1 - i as usize].to_string()
    };

    ctx.configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(11)
        .y_labels(rows.max(1))
        .x_label_formatter(&col_label)
        .y_label_formatter(&row_label)
        .x_desc(&chart.labels.x)
        .y_desc(&chart.labels.y)
        .draw()?;

    ctx.draw_series(matrix.rows().enumerate().flat_map(|(i, (_, cells))| {
        let y = (rows - 1 - i) as f64;
        cells.iter().enumerate().map(move |(j, cell)| {
            let x = j as f64;
            let style = match cell {
                Cell::Value(v) => heat_color((v - lo) / span).filled(),
                Cell::Missing => MISSING_COLOR.filled(),
            };
            Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)], style)
        })
    }))?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipstat_core::chart::ChartLabels;
    use flipstat_core::reshape::{reshape, ColumnDomain, PivotSpec};
    use flipstat_core::{GroupKey, MetricRow, MetricTable};

    fn labels() -> ChartLabels {
        ChartLabels {
            title: "Average SSIM vs Bits Flipped".into(),
            x: "Bits Flipped".into(),
            y: "Average SSIM".into(),
        }
    }

    #[test]
    fn padded_range_handles_flat_and_empty_input() {
        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
        let r = padded_range([2.0, 2.0]);
        assert!(r.start < 2.0 && r.end > 2.0);
        let r = padded_range([0.0, 10.0]);
        assert_eq!(r, -0.5..10.5);
    }

    #[test]
    fn line_chart_writes_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let chart = LineChart {
            name: "ssim_vs_bits".into(),
            labels: labels(),
            points: vec![(0.0, 1.0), (1.0, 0.9), (2.0, 0.7)],
        };
        let path = SvgSink.line(dir.path(), &chart).unwrap();
        assert_eq!(path, dir.path().join("ssim_vs_bits.svg"));
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Average SSIM vs Bits Flipped"));
    }

    #[test]
    fn band_chart_with_single_point_renders() {
        let dir = tempfile::tempdir().unwrap();
        let chart = BandChart {
            name: "ssim_vs_percentage".into(),
            labels: labels(),
            series_label: "Average SSIM".into(),
            band_label: "Min-Max Range".into(),
            points: vec![(10.0, 0.8, 0.7, 0.9)],
        };
        let path = SvgSink.band(dir.path(), &chart).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn heatmap_renders_missing_cells() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = MetricTable::new(vec!["ssim_vs_baseline".into()]);
        table.push(MetricRow {
            percent: GroupKey::new(2.0),
            bits: GroupKey::new(1.0),
            values: vec![Some(0.5)],
        });
        let mut spec = PivotSpec::bits_by_percent("ssim_vs_baseline");
        spec.domain = ColumnDomain::range(1, 5).unwrap();
        let matrix = reshape(&table, &spec).unwrap();

        let chart = HeatmapChart {
            name: "heatmap_ssim_vs_baseline".into(),
            labels: labels(),
            matrix: &matrix,
        };
        let path = SvgSink.heatmap(dir.path(), &chart).unwrap();
        let svg = std::fs::read_to_string(path).unwrap();
        assert!(svg.contains("rgb(220,220,220)") || svg.contains("#DCDCDC"));
    }
}
