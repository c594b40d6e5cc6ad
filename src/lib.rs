//! Lens sharpness scores
//!
//! Fetches the sharpness scores measured for a selection of camera lenses and
//! turns them into chart series that can be compared side by side:
//!
//!  - [`Catalog`]: the lenses available for selection,
//!  - [`synthesize`]: the measured series of each lens and the decay curve
//!    extending it up to the longest focal length of the selection,
//!  - [`SynthesisRunner`]: background synthesis where only the latest request
//!    is ever rendered,
//!  - [`SubmissionForm`]: registration of new lenses.

pub mod api;
pub mod catalog;
mod error;
pub mod lens;
pub mod predict;
pub mod runner;
pub mod series;
pub mod submission;

pub use api::{ApiClient, ApiError, LensApi, PreCheck, PreRecord, Submission};
pub use catalog::Catalog;
pub use error::Error;
pub use lens::{parse_lens_id, Aperture, Lens, LensId, Region, Sample};
pub use predict::predict_score;
pub use runner::{SynthesisParams, SynthesisRunner};
pub use series::{
    build_series, synthesize, Color, DisplayWindow, Palette, Series, SeriesKind, Synthesis,
};
pub use submission::{reduce_records, FormStatus, SubmissionError, SubmissionForm};

pub type Result<T> = std::result::Result<T, Error>;
