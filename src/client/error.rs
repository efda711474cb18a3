use thiserror::Error;

use crate::flight::NormalizeError;

/// Failure to get a prediction job accepted by the service. Not retried;
/// surfaced to the caller immediately.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("invalid launch parameters: {0}")]
    Invalid(String),
    #[error("submit request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("predictor returned error: {0}")]
    Rejected(String),
    #[error("unexpected submit response: {0}")]
    Malformed(String),
}

/// Outcome of a single status poll. A timeout is a recognized,
/// non-fatal event absorbed by the adaptive policy; it never terminates
/// the poll cycle on its own.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("status request timed out")]
    Timeout,
    #[error("status request failed: {0}")]
    Transport(reqwest::Error),
    #[error("unreadable status payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for PollError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PollError::Timeout
        } else if err.is_decode() {
            PollError::Malformed(err.to_string())
        } else {
            PollError::Transport(err)
        }
    }
}

/// Failure to retrieve a completed job's flight path.
#[derive(Debug, Clone, Error)]
#[error("flight path request failed: {0}")]
pub struct FetchError(pub String);

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError(err.to_string())
    }
}

/// Terminal failure of a poll cycle, delivered exactly once to the
/// observer and from `wait`.
#[derive(Debug, Clone, Error)]
pub enum PredictionError {
    #[error("prediction failed: {0}")]
    RemoteJob(String),
    #[error(transparent)]
    ResultFetch(#[from] FetchError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error("a poll cycle is already active")]
    AlreadyPolling,
}
