use super::{Color, DisplayWindow, Palette, Series, SeriesKind, EXTRAPOLATION_ALPHA};
use crate::{
    api::ApiError,
    catalog::Catalog,
    lens::{LensId, Sample},
};
use itertools::Itertools;
use rayon::prelude::*;
use std::{collections::BTreeMap, time::Instant};

/// A lens whose samples could not be fetched
#[derive(Debug)]
pub struct FetchFailure {
    pub lens_id: LensId,
    pub error: ApiError,
}

/// The series of a lens selection
#[derive(Debug, Default)]
pub struct Synthesis {
    /// measured series, each one followed by its extrapolation if any
    pub series: Vec<Series>,
    pub failures: Vec<FetchFailure>,
    /// lenses without any usable sample
    pub empty: Vec<LensId>,
    /// lenses whose focal range does not fit in the display window
    pub skipped: Vec<LensId>,
}
impl Synthesis {
    pub fn measured(&self) -> impl Iterator<Item = &Series> {
        self.series.iter().filter(|s| s.is_measured())
    }
    pub fn extrapolated(&self) -> impl Iterator<Item = &Series> {
        self.series.iter().filter(|s| !s.is_measured())
    }
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Fetched samples keyed by lens, failed fetches are missing
pub(crate) struct Fetched {
    pub samples: BTreeMap<LensId, Vec<Sample>>,
    pub failures: Vec<FetchFailure>,
}

impl Fetched {
    pub(crate) fn into_synthesis(
        self,
        selection: &[LensId],
        catalog: &Catalog,
        window: &DisplayWindow,
        palette: &Palette,
    ) -> Synthesis {
        Synthesis {
            failures: self.failures,
            ..build_series(selection, catalog, &self.samples, window, palette)
        }
    }
}

/// Fetches the samples of every selected lens in parallel
///
/// Returns once all the fetches have settled, malformed samples are dropped.
pub(crate) fn fetch_all<F>(selection: &[LensId], fetch: F) -> Fetched
where
    F: Fn(LensId) -> Result<Vec<Sample>, ApiError> + Sync,
{
    let lens_ids: Vec<LensId> = selection.iter().copied().unique().collect();
    log::info!("fetching the samples of {} lenses...", lens_ids.len());
    let now = Instant::now();
    let outcomes: Vec<_> = lens_ids
        .par_iter()
        .map(|&lens_id| (lens_id, fetch(lens_id)))
        .collect();
    log::info!("... fetched in {}ms", now.elapsed().as_millis());

    let mut fetched = Fetched {
        samples: BTreeMap::new(),
        failures: vec![],
    };
    for (lens_id, outcome) in outcomes {
        match outcome {
            Ok(samples) => {
                let n = samples.len();
                let valid: Vec<Sample> = samples.into_iter().filter(Sample::is_valid).collect();
                if valid.len() < n {
                    log::warn!(
                        "lens #{}: dropped {} malformed samples",
                        lens_id,
                        n - valid.len()
                    );
                }
                fetched.samples.insert(lens_id, valid);
            }
            Err(error) => {
                log::warn!("lens #{}: {}", lens_id, error);
                fetched.failures.push(FetchFailure { lens_id, error });
            }
        }
    }
    fetched
}

/// Fetches the samples of the selected lenses and builds their chart series
///
/// A failed fetch only removes the series of that lens, the failure is
/// reported in [`Synthesis::failures`].
pub fn synthesize<F>(
    selection: &[LensId],
    catalog: &Catalog,
    fetch: F,
    window: &DisplayWindow,
    palette: &Palette,
) -> Synthesis
where
    F: Fn(LensId) -> Result<Vec<Sample>, ApiError> + Sync,
{
    fetch_all(selection, fetch).into_synthesis(selection, catalog, window, palette)
}

/// Builds the chart series of the selected lenses from their samples
///
/// Lenses missing from `samples` contribute no series. The k-th selected lens
/// is always drawn with the k-th palette color whether or not the lenses
/// before it are displayed.
pub fn build_series(
    selection: &[LensId],
    catalog: &Catalog,
    samples: &BTreeMap<LensId, Vec<Sample>>,
    window: &DisplayWindow,
    palette: &Palette,
) -> Synthesis {
    let max_focal_global = samples
        .values()
        .flatten()
        .map(|s| s.focal)
        .fold(0f64, f64::max);

    let mut synthesis = Synthesis::default();
    for (k, &lens_id) in selection.iter().enumerate() {
        let Some(lens_samples) = samples.get(&lens_id) else {
            continue;
        };
        if lens_samples.is_empty() {
            synthesis.empty.push(lens_id);
            continue;
        }
        let (focal_min, focal_max) = lens_samples
            .iter()
            .map(|s| s.focal)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), f| {
                (lo.min(f), hi.max(f))
            });
        if !window.admits(focal_min, focal_max) {
            log::debug!(
                "lens #{}: [{},{}]mm outside of {:?}",
                lens_id,
                focal_min,
                focal_max,
                window
            );
            synthesis.skipped.push(lens_id);
            continue;
        }

        let color = palette.color(k);
        synthesis.series.push(Series {
            lens_id,
            kind: SeriesKind::Measured,
            label: catalog.label(lens_id),
            color,
            points: lens_samples.iter().map(|s| (s.focal, s.score)).collect(),
        });

        let last = lens_samples
            .iter()
            .fold(lens_samples[0], |last, s| if s.focal > last.focal { *s } else { last });
        if last.focal < max_focal_global {
            synthesis
                .series
                .push(extrapolated(lens_id, color, last, max_focal_global));
        }
    }
    synthesis
}

fn extrapolated(lens_id: LensId, color: Color, last: Sample, focal_end: f64) -> Series {
    Series {
        lens_id,
        kind: SeriesKind::Extrapolated,
        label: String::new(),
        color: color.with_alpha(EXTRAPOLATION_ALPHA),
        points: extrapolate(last, focal_end),
    }
}

/// Largest number of grid points of an extrapolated series
pub const MAX_EXTRAPOLATION_STEPS: f64 = 10_000.;

/// Score decay beyond the last measured sample
///
/// The score falls off in inverse proportion to the focal length:
/// `score(f) = last.score * last.focal / f`, evaluated at `last.focal`,
/// at every integer focal length in between and at `focal_end`.
/// Spans longer than [`MAX_EXTRAPOLATION_STEPS`] use a coarser integer step.
pub fn extrapolate(last: Sample, focal_end: f64) -> Vec<(f64, f64)> {
    let decay = |f: f64| last.score * last.focal / f;
    let mut points = vec![(last.focal, last.score)];
    if !focal_end.is_finite() || focal_end <= last.focal {
        return points;
    }
    let step = ((focal_end - last.focal) / MAX_EXTRAPOLATION_STEPS).ceil().max(1.);
    if step > 1. {
        log::warn!(
            "extrapolating from {}mm to {}mm with a {}mm step",
            last.focal,
            focal_end,
            step
        );
    }
    let mut f = last.focal.floor() + step;
    while f < focal_end {
        points.push((f, decay(f)));
        f += step;
    }
    points.push((focal_end, decay(focal_end)));
    points
}
