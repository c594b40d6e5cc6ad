use crate::{
    lens::{LensId, Sample},
    series::Synthesis,
};

/// Estimates the score of a lens at any focal length
///
/// A measured focal length returns its score. Beyond the longest measured focal
/// length the image is assumed to be cropped, the score decreasing in inverse
/// proportion to the focal length. In between, the score is linearly
/// interpolated. There is no estimate below the shortest focal length.
pub fn predict_score(samples: &[Sample], focal: f64) -> Option<f64> {
    let valid: Vec<&Sample> = samples.iter().filter(|s| s.is_valid()).collect();
    if valid.is_empty() || !focal.is_finite() || focal <= 0. {
        return None;
    }
    if let Some(hit) = valid.iter().find(|s| s.focal == focal) {
        return Some(hit.score);
    }
    let first_at = |f: f64| valid.iter().find(|s| s.focal == f).map(|s| s.score);
    let lower = valid
        .iter()
        .map(|s| s.focal)
        .filter(|&f| f < focal)
        .fold(None, |acc: Option<f64>, f| Some(acc.map_or(f, |a| a.max(f))));
    let upper = valid
        .iter()
        .map(|s| s.focal)
        .filter(|&f| f > focal)
        .fold(None, |acc: Option<f64>, f| Some(acc.map_or(f, |a| a.min(f))));
    match (lower, upper) {
        (None, _) => None,
        (Some(max_focal), None) => first_at(max_focal).map(|score| score * max_focal / focal),
        (Some(x0), Some(x1)) => {
            let (y0, y1) = (first_at(x0)?, first_at(x1)?);
            Some(y0 + (y1 - y0) * (focal - x0) / (x1 - x0))
        }
    }
}

impl Synthesis {
    /// Score estimates at `focal` for each measured series, in display order
    pub fn estimates(&self, focal: f64) -> Vec<(LensId, &str, Option<f64>)> {
        self.measured()
            .map(|series| {
                let samples: Vec<Sample> = series.points.iter().copied().map(Sample::from).collect();
                (
                    series.lens_id,
                    series.label.as_str(),
                    predict_score(&samples, focal),
                )
            })
            .collect()
    }
}
