use thiserror::Error;

/// Errors raised by the scoring functions and the record sources.
///
/// Insufficient data is not an error: it shows up as `None` fields in
/// [`crate::scoring::ScoreSummary`].
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error(
        "episode sequences must have equal length, but have {lengths} lengths, \
         {rewards} rewards and {timestamps} timestamps"
    )]
    ShapeMismatch {
        lengths: usize,
        rewards: usize,
        timestamps: usize,
    },

    #[error("trial window must be positive")]
    InvalidWindow,

    #[error("bucket count must be positive")]
    InvalidBuckets,

    #[error("failed to retrieve run record: {0}")]
    Retrieval(String),

    #[error("unknown environment {0:?}")]
    Lookup(String),
}

impl From<reqwest::Error> for ScoreError {
    fn from(error: reqwest::Error) -> Self {
        ScoreError::Retrieval(error.to_string())
    }
}
