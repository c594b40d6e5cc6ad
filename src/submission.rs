//! Lens registration form
//!
//! A lens id must be pre-checked against the measurement source before it
//! can be submitted: an unknown lens keeps the form disabled.

use crate::{
    api::{ApiError, LensApi, PreCheck, PreRecord, Submission},
    lens::{parse_lens_id, Aperture, LensId, Region, Sample},
};
use itertools::Itertools;

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("lens #{0} has not been checked yet")]
    NotChecked(LensId),
    #[error("lens #{0} not found")]
    LensNotFound(LensId),
    #[error("the device name is missing")]
    MissingDevice,
    #[error("Error in the `api` module")]
    Api(#[from] ApiError),
}

/// State of the form as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStatus {
    Unchecked,
    NotFound,
    MissingDevice,
    Ready,
}

#[derive(Debug, Default, Clone)]
pub struct SubmissionForm {
    lens_id: LensId,
    device: String,
    pre: Option<PreCheck>,
}
impl SubmissionForm {
    pub fn new() -> Self {
        Default::default()
    }
    /// Sets the lens id from user input, non-numeric input becomes 0
    ///
    /// Changing the lens id invalidates a previous pre-check.
    pub fn lens_id(self, input: &str) -> Self {
        let lens_id = parse_lens_id(input);
        let pre = if lens_id == self.lens_id { self.pre } else { None };
        Self {
            lens_id,
            pre,
            ..self
        }
    }
    pub fn device<S: Into<String>>(self, device: S) -> Self {
        Self {
            device: device.into(),
            ..self
        }
    }
    pub fn id(&self) -> LensId {
        self.lens_id
    }
    pub fn pre_check_result(&self) -> Option<&PreCheck> {
        self.pre.as_ref()
    }
    /// Asks the measurement source about the lens
    pub fn precheck<A: LensApi + ?Sized>(&mut self, api: &A) -> Result<&PreCheck, ApiError> {
        let pre = api.pre_check(self.lens_id)?;
        if pre == PreCheck::NotFound {
            log::warn!("lens #{} not found, submission disabled", self.lens_id);
        }
        Ok(self.pre.insert(pre))
    }
    pub fn status(&self) -> FormStatus {
        match &self.pre {
            None => FormStatus::Unchecked,
            Some(PreCheck::NotFound) => FormStatus::NotFound,
            Some(_) if self.device.trim().is_empty() => FormStatus::MissingDevice,
            Some(_) => FormStatus::Ready,
        }
    }
    pub fn can_submit(&self) -> bool {
        self.status() == FormStatus::Ready
    }
    /// The request body, or the reason the form cannot be submitted
    pub fn submission(&self) -> Result<Submission, SubmissionError> {
        match (&self.pre, self.status()) {
            (_, FormStatus::Unchecked) => Err(SubmissionError::NotChecked(self.lens_id)),
            (_, FormStatus::NotFound) => Err(SubmissionError::LensNotFound(self.lens_id)),
            (_, FormStatus::MissingDevice) => Err(SubmissionError::MissingDevice),
            (Some(PreCheck::Text { records, .. }), FormStatus::Ready) => Ok(Submission {
                device: self.device.trim().to_string(),
                data: Some(records.clone()),
            }),
            (_, FormStatus::Ready) => Ok(Submission {
                device: self.device.trim().to_string(),
                data: None,
            }),
        }
    }
    /// Posts the form, the caller is expected to refresh its catalog afterwards
    pub fn submit<A: LensApi + ?Sized>(&self, api: &A) -> Result<(), SubmissionError> {
        let submission = self.submission()?;
        api.submit(self.lens_id, &submission)?;
        log::info!("lens #{} submitted ({})", self.lens_id, submission.device);
        Ok(())
    }
}

/// Reduces measurement records to the (focal, score) samples of a region
///
/// Per focal length, [`Aperture::Best`] keeps the best score,
/// [`Aperture::WideOpen`] the score at the smallest F-number and
/// [`Aperture::FNumber`] the best score at that F-number. Samples are sorted by
/// focal length.
pub fn reduce_records(records: &[PreRecord], region: Region, aperture: Aperture) -> Vec<Sample> {
    let mut valid: Vec<PreRecord> = records
        .iter()
        .filter(|r| r.focal.is_finite() && r.f.is_finite() && r.score(region).is_finite())
        .copied()
        .collect();
    valid.sort_by(|a, b| a.focal.total_cmp(&b.focal));
    valid
        .into_iter()
        .chunk_by(|r| r.focal)
        .into_iter()
        .filter_map(|(focal, group)| {
            let group: Vec<PreRecord> = group.collect();
            let score = match aperture {
                Aperture::Best => best_score(group.iter(), region),
                Aperture::WideOpen => group
                    .iter()
                    .min_by(|a, b| a.f.total_cmp(&b.f))
                    .map(|r| r.score(region)),
                Aperture::FNumber(f) => {
                    best_score(group.iter().filter(|r| (r.f - f).abs() < 1e-6), region)
                }
            };
            score.map(|score| Sample::new(focal, score))
        })
        .collect()
}

fn best_score<'a, I: Iterator<Item = &'a PreRecord>>(records: I, region: Region) -> Option<f64> {
    records.map(|r| r.score(region)).reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::Lens;
    use std::sync::Mutex;

    fn record(focal: f64, f: f64, center: f64, edge: f64) -> PreRecord {
        PreRecord {
            focal,
            f,
            center,
            edge,
        }
    }
    fn records() -> Vec<PreRecord> {
        vec![
            record(40., 2.8, 2500., 2000.),
            record(12., 4., 2900., 2500.),
            record(12., 2.8, 2700., 2300.),
            record(40., 5.6, 2600., 2250.),
            record(25., 5.6, 2750., 2350.),
        ]
    }

    #[derive(Default)]
    struct Registry {
        known: Vec<LensId>,
        posted: Mutex<Vec<(LensId, Submission)>>,
    }
    impl LensApi for Registry {
        fn lenses(&self) -> Result<Vec<Lens>, ApiError> {
            Ok(vec![])
        }
        fn samples(&self, _: LensId, _: Region, _: Aperture) -> Result<Vec<Sample>, ApiError> {
            Ok(vec![])
        }
        fn pre_check(&self, lens_id: LensId) -> Result<PreCheck, ApiError> {
            if self.known.contains(&lens_id) {
                Ok(PreCheck::Text {
                    title: format!("lens {}", lens_id),
                    records: records(),
                })
            } else {
                Ok(PreCheck::NotFound)
            }
        }
        fn submit(&self, lens_id: LensId, submission: &Submission) -> Result<(), ApiError> {
            self.posted
                .lock()
                .unwrap()
                .push((lens_id, submission.clone()));
            Ok(())
        }
    }

    #[test]
    fn unknown_lens_is_never_submitted() {
        let api = Registry {
            known: vec![1088],
            ..Default::default()
        };
        let mut form = SubmissionForm::new().lens_id("abc").device("m43");
        assert_eq!(form.id(), 0);
        assert!(matches!(
            form.submit(&api),
            Err(SubmissionError::NotChecked(0))
        ));
        form.precheck(&api).unwrap();
        assert_eq!(form.status(), FormStatus::NotFound);
        assert!(!form.can_submit());
        assert!(matches!(
            form.submit(&api),
            Err(SubmissionError::LensNotFound(0))
        ));
        assert!(api.posted.lock().unwrap().is_empty());
    }

    #[test]
    fn checked_lens_is_submitted_with_its_records() {
        let api = Registry {
            known: vec![1088],
            ..Default::default()
        };
        let mut form = SubmissionForm::new().lens_id("1088");
        form.precheck(&api).unwrap();
        assert_eq!(form.status(), FormStatus::MissingDevice);
        let form = form.device(" m43 ");
        assert!(form.can_submit());
        form.submit(&api).unwrap();
        let posted = api.posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].0, 1088);
        assert_eq!(posted[0].1.device, "m43");
        assert_eq!(posted[0].1.data.as_ref().map(|d| d.len()), Some(5));
    }

    #[test]
    fn changing_the_lens_resets_the_check() {
        let api = Registry {
            known: vec![7],
            ..Default::default()
        };
        let mut form = SubmissionForm::new().lens_id("7").device("m43");
        form.precheck(&api).unwrap();
        assert!(form.can_submit());
        let form = form.lens_id("7");
        assert!(form.can_submit());
        let form = form.lens_id("8");
        assert_eq!(form.status(), FormStatus::Unchecked);
    }

    #[test]
    fn reduce_best() {
        let samples = reduce_records(&records(), Region::Center, Aperture::Best);
        assert_eq!(
            samples,
            vec![
                Sample::new(12., 2900.),
                Sample::new(25., 2750.),
                Sample::new(40., 2600.)
            ]
        );
    }

    #[test]
    fn reduce_wide_open() {
        let samples = reduce_records(&records(), Region::Edge, Aperture::WideOpen);
        assert_eq!(
            samples,
            vec![
                Sample::new(12., 2300.),
                Sample::new(25., 2350.),
                Sample::new(40., 2000.)
            ]
        );
    }

    #[test]
    fn reduce_f_number() {
        let samples = reduce_records(&records(), Region::Center, Aperture::FNumber(5.6));
        assert_eq!(
            samples,
            vec![Sample::new(25., 2750.), Sample::new(40., 2600.)]
        );
    }
}
