//! SVG rendering of chart series.
//!
//! Pure function of its inputs: the engines hand over a `ChartSeries` and
//! a style, and an SVG lands at the given path. Nothing upstream depends
//! on how the drawing happens.

use anyhow::{Context, Result};
use plotters::prelude::*;
use std::path::Path;

use crate::models::ChartSeries;

const CHART_SIZE: (u32, u32) = (1280, 760);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartStyle {
    /// Cumulative totals, y grows upward (standings).
    Aggregate,
    /// Finishing positions, y inverted so first place sits on top.
    PositionHistory,
}

/// Render a series set as a line chart. Empty input renders nothing and
/// succeeds, so callers can chart sparse history without special-casing.
pub fn render_svg(series: &ChartSeries, style: ChartStyle, path: &Path) -> Result<()> {
    if series.columns.is_empty() || series.series.is_empty() {
        return Ok(());
    }

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let x_max = (series.columns.len() - 1).max(1) as f64;
    let max_value = series
        .series
        .iter()
        .flat_map(|(_, values)| values.iter().flatten())
        .copied()
        .max()
        .unwrap_or(1) as f64;

    let (y_from, y_to) = match style {
        ChartStyle::Aggregate => (0.0, max_value * 1.05 + 1.0),
        // Reversed range: position 1 renders at the top.
        ChartStyle::PositionHistory => (max_value + 1.0, 0.0),
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(&series.title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(32)
        .y_label_area_size(44)
        .build_cartesian_2d(0f64..x_max, y_from..y_to)?;

    let columns = &series.columns;
    chart
        .configure_mesh()
        .x_labels(columns.len())
        .x_label_formatter(&|x| {
            let idx = x.round() as usize;
            columns.get(idx).cloned().unwrap_or_default()
        })
        .y_desc(match style {
            ChartStyle::Aggregate => "Points",
            ChartStyle::PositionHistory => "Position",
        })
        .draw()?;

    for (i, (rider, values)) in series.series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        let points: Vec<(f64, f64)> = values
            .iter()
            .enumerate()
            .filter_map(|(x, v)| v.map(|v| (x as f64, v as f64)))
            .collect();

        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))?
            .label(rider.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .draw()?;

    root.present()
        .with_context(|| format!("Failed to write chart {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChartSeries {
        ChartSeries {
            title: "1999 500cc Championship".into(),
            columns: vec!["TT".into(), "SWI".into()],
            series: vec![
                ("D. RIDERONE".into(), vec![Some(25), Some(45)]),
                ("D. RIDERTWO".into(), vec![Some(20), Some(36)]),
                ("D. RIDERTHREE".into(), vec![None, Some(16)]),
            ],
        }
    }

    #[test]
    fn writes_an_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1999-500cc.svg");

        render_svg(&sample(), ChartStyle::Aggregate, &path).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.contains("<svg"));
        assert!(body.contains("1999 500cc Championship"));
    }

    #[test]
    fn inverted_axis_variant_renders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist.svg");
        render_svg(&sample(), ChartStyle::PositionHistory, &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn empty_series_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.svg");
        render_svg(&ChartSeries::default(), ChartStyle::Aggregate, &path).unwrap();
        assert!(!path.exists());
    }
}
