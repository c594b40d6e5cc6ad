use super::Synthesis;
use std::path::Path;

impl Synthesis {
    /// Writes the series points to a CSV file, one point per row
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        self.write_csv(&mut wtr)?;
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }
    pub(crate) fn write_csv<W: std::io::Write>(
        &self,
        wtr: &mut csv::Writer<W>,
    ) -> Result<(), csv::Error> {
        wtr.write_record([
            "Series",
            "Lens",
            "Label",
            "Kind",
            "Color",
            "Focal length [mm]",
            "Score",
        ])?;
        for (i, series) in self.series.iter().enumerate() {
            for (focal, score) in &series.points {
                wtr.write_record(&[
                    i.to_string(),
                    series.lens_id.to_string(),
                    series.label.clone(),
                    series.kind.to_string(),
                    series.color.to_string(),
                    focal.to_string(),
                    score.to_string(),
                ])?;
            }
        }
        Ok(())
    }
    pub fn summary(&self) {
        println!("SUMMARY:");
        println!(" - # of series: {}", self.series.len());
        println!(
            "    {:^24}: {:^6} ({:^16})  ({:^16})",
            "LENS", "POINTS", "FOCAL [mm]", "SCORE"
        );
        for series in self.measured() {
            println!(
                "  - {:24}: {:>6} {:>18.1?} {:>18.1?}",
                series.label,
                series.points.len(),
                minmax(series.points.iter().map(|p| p.0)),
                minmax(series.points.iter().map(|p| p.1)),
            );
        }
        let n_extrapolated = self.extrapolated().count();
        if n_extrapolated > 0 {
            println!(" - # of extrapolated series: {}", n_extrapolated);
        }
        if !self.skipped.is_empty() {
            println!(" - outside of the display window: {:?}", self.skipped);
        }
        if !self.empty.is_empty() {
            println!(" - without samples: {:?}", self.empty);
        }
        if !self.failures.is_empty() {
            println!(" - fetch failures:");
            for failure in &self.failures {
                println!("  - #{}: {}", failure.lens_id, failure.error);
            }
        }
    }
}

fn minmax<I: Iterator<Item = f64>>(x: I) -> (f64, f64) {
    x.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}
