#[cfg(feature = "plot")]
use crate::series::PlotError;
use crate::{api::ApiError, lens::SelectorError, submission::SubmissionError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `api` module")]
    Api(#[from] ApiError),
    #[error("Error in the `submission` module")]
    Submission(#[from] SubmissionError),
    #[error("Invalid lens selector")]
    Selector(#[from] SelectorError),
    #[cfg(feature = "plot")]
    #[error("Error in the `plot` module")]
    Plot(#[from] PlotError),
    #[error("Failed to export the series")]
    Csv(#[from] csv::Error),
}
