//! Time-series chart rendering.

use crate::{FieldSeries, ReportError};
use plotters::prelude::*;
use std::path::Path;

/// Renders one field's series as an SVG line chart of value against height.
///
/// A series with no points produces no file; there is nothing to draw for
/// a store that only holds height 1's absent derived field, for example.
pub fn render_chart(series: &FieldSeries, path: &Path) -> Result<(), ReportError> {
    if series.points.is_empty() {
        return Ok(());
    }

    let (x_min, x_max) = padded_range(
        series.points.first().map(|&(h, _)| h as f64).unwrap_or_default(),
        series.points.last().map(|&(h, _)| h as f64).unwrap_or_default(),
    );
    let (y_lo, y_hi) = series
        .points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, v)| (lo.min(v), hi.max(v)));
    let (y_min, y_max) = padded_range(y_lo, y_hi);

    let root = SVGBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{} vs height", series.name), ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(48)
        .y_label_area_size(64)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(chart_err)?;
    chart
        .configure_mesh()
        .x_desc("height")
        .y_desc(series.name)
        .draw()
        .map_err(chart_err)?;
    chart
        .draw_series(LineSeries::new(
            series.points.iter().map(|&(height, value)| (height as f64, value)),
            &BLUE,
        ))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

/// Widens a degenerate range so the axis always has extent.
fn padded_range(lo: f64, hi: f64) -> (f64, f64) {
    if lo < hi { (lo, hi) } else { (lo - 0.5, hi + 0.5) }
}

fn chart_err(err: impl std::fmt::Display) -> ReportError {
    ReportError::Chart(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn renders_svg_for_a_simple_series() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("block_size.svg");
        let series = FieldSeries {
            name: "block_size",
            points: vec![(1, 100.0), (2, 200.0), (3, 150.0)],
        };

        render_chart(&series, &path).expect("render");
        let svg = std::fs::read_to_string(&path).expect("read");
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn single_point_series_still_renders() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("num_txs.svg");
        let series = FieldSeries { name: "num_txs", points: vec![(1, 5.0)] };
        render_chart(&series, &path).expect("render");
        assert!(path.exists());
    }

    #[test]
    fn empty_series_writes_nothing() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("time_since_prev_block.svg");
        let series = FieldSeries { name: "time_since_prev_block", points: vec![] };
        render_chart(&series, &path).expect("render");
        assert!(!path.exists());
    }
}
