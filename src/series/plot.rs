use super::{Series, Synthesis};
use plotters::{coord::Shift, prelude::*};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error("failed to draw the chart: {0}")]
    Drawing(String),
}

impl Synthesis {
    /// Draws the series into a SVG (`.svg` extension) or bitmap file
    pub fn plot<P: AsRef<Path>>(&self, path: P, title: Option<&str>) -> crate::Result<()> {
        let path = path.as_ref();
        log::info!("plotting {} series into {:?}", self.series.len(), path);
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("svg") => draw(
                SVGBackend::new(path, (768, 512)).into_drawing_area(),
                &self.series,
                title,
            )?,
            _ => draw(
                BitMapBackend::new(path, (768, 512)).into_drawing_area(),
                &self.series,
                title,
            )?,
        }
        Ok(())
    }
}

fn draw<DB: DrawingBackend>(
    plot: DrawingArea<DB, Shift>,
    series: &[Series],
    title: Option<&str>,
) -> Result<(), PlotError> {
    let drawing = |e: DrawingAreaErrorKind<DB::ErrorType>| PlotError::Drawing(e.to_string());

    plot.fill(&WHITE).map_err(drawing)?;
    let x_max = max_value(series.iter().flat_map(|s| s.points.iter().map(|p| p.0)));
    let y_max = max_value(series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));

    let mut builder = ChartBuilder::on(&plot);
    if let Some(title) = title {
        builder.caption(title, ("sans-serif", 20));
    }
    let mut chart = builder
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(0f64..x_max * 1.05, 0f64..y_max * 1.1)
        .map_err(drawing)?;
    chart
        .configure_mesh()
        .x_desc("Focal length [mm]")
        .y_desc("Score")
        .draw()
        .map_err(drawing)?;

    for s in series {
        let rgb = RGBColor(s.color.r, s.color.g, s.color.b).mix(s.color.alpha);
        let line = chart
            .draw_series(LineSeries::new(s.points.iter().copied(), rgb.stroke_width(2)))
            .map_err(drawing)?;
        if !s.label.is_empty() {
            line.label(s.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], rgb));
        }
        if s.is_measured() {
            chart
                .draw_series(s.points.iter().map(|&p| Circle::new(p, 3, rgb.filled())))
                .map_err(drawing)?;
        }
    }
    if series.iter().any(|s| !s.label.is_empty()) {
        chart
            .configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .position(SeriesLabelPosition::UpperRight)
            .draw()
            .map_err(drawing)?;
    }
    plot.present().map_err(drawing)?;
    Ok(())
}

fn max_value<I: Iterator<Item = f64>>(x: I) -> f64 {
    x.fold(1f64, f64::max)
}
