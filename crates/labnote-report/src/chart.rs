//! Line charts of result tables, drawn to SVG with plotters.

use plotters::prelude::*;
use thiserror::Error;

/// Chart drawing failed.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart size must be non-zero, got {0}x{1}")]
    EmptyCanvas(u32, u32),
    #[error("drawing failed: {0}")]
    Draw(String),
}

/// One labelled line. Only rows where both axes parsed are kept as points.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    pub color: RGBColor,
}

impl Series {
    pub fn new(label: impl Into<String>, points: Vec<(f64, f64)>, color: RGBColor) -> Self {
        Self {
            label: label.into(),
            points,
            color,
        }
    }
}

/// A line chart with markers, a grid, and a legend for plotted series.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub x_desc: Option<String>,
    pub y_desc: String,
    pub series: Vec<Series>,
    /// Canvas size in pixels.
    pub size: (u32, u32),
}

impl LineChart {
    /// Series that will actually be drawn.
    pub fn plotted(&self) -> impl Iterator<Item = &Series> {
        self.series.iter().filter(|s| !s.points.is_empty())
    }

    pub fn has_points(&self) -> bool {
        self.plotted().next().is_some()
    }

    /// Draw the chart and return the SVG markup.
    pub fn render_svg(&self) -> Result<String, ChartError> {
        let (width, height) = self.size;
        if width == 0 || height == 0 {
            return Err(ChartError::EmptyCanvas(width, height));
        }
        let mut svg = String::new();
        self.draw(&mut svg)
            .map_err(|e| ChartError::Draw(e.to_string()))?;
        Ok(svg)
    }

    fn draw(&self, svg: &mut String) -> Result<(), Box<dyn std::error::Error>> {
        let (x_range, y_range) = self.ranges();
        let root = SVGBackend::with_string(svg, self.size).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .margin(12)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)?;

        let mut mesh = chart.configure_mesh();
        mesh.y_desc(self.y_desc.as_str());
        if let Some(x_desc) = &self.x_desc {
            mesh.x_desc(x_desc.as_str());
        }
        mesh.draw()?;

        for series in self.plotted() {
            let color = series.color;
            chart
                .draw_series(LineSeries::new(series.points.iter().copied(), &color))?
                .label(series.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
            chart.draw_series(
                series
                    .points
                    .iter()
                    .map(|&p| Circle::new(p, 3, color.filled())),
            )?;
        }

        if self.has_points() {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }

        root.present()?;
        Ok(())
    }

    /// Axis ranges covering every plotted point with a little headroom.
    fn ranges(&self) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
        let points: Vec<(f64, f64)> = self
            .plotted()
            .flat_map(|s| s.points.iter().copied())
            .collect();
        let xs = points.iter().map(|p| p.0);
        let ys = points.iter().map(|p| p.1);
        (padded_range(xs), padded_range(ys))
    }
}

fn padded_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let span = max - min;
    let pad = if span > 0.0 { span * 0.05 } else { 1.0 };
    (min - pad)..(max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(series: Vec<Series>) -> LineChart {
        LineChart {
            x_desc: Some("距離(cm)".into()),
            y_desc: "融解時間 (sec)".into(),
            series,
            size: (600, 400),
        }
    }

    #[test]
    fn renders_svg_with_legend_for_plotted_series() {
        let svg = chart(vec![
            Series::new("銅", vec![(2.0, 10.0), (4.0, 25.0)], RGBColor(255, 127, 14)),
            Series::new("アルミ", vec![], RGBColor(31, 119, 180)),
        ])
        .render_svg()
        .unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("銅"));
        assert!(!svg.contains("アルミ"));
    }

    #[test]
    fn empty_chart_still_draws_axes() {
        let c = chart(vec![Series::new("銅", vec![], RGBColor(0, 0, 0))]);
        assert!(!c.has_points());
        let svg = c.render_svg().unwrap();
        assert!(svg.contains("<svg"));
        assert!(!svg.contains("銅"));
    }

    #[test]
    fn zero_canvas_is_rejected() {
        let mut c = chart(vec![]);
        c.size = (0, 400);
        assert!(matches!(c.render_svg(), Err(ChartError::EmptyCanvas(0, 400))));
    }

    #[test]
    fn single_point_range_is_padded() {
        let r = padded_range([5.0].into_iter());
        assert_eq!(r, 4.0..6.0);
        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);
    }
}
