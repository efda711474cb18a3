use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

use super::error::{FetchError, PollError, SubmitError};
use super::types::{JobHandle, LaunchParameters, ProgressReport};
use crate::flight::{Leg, RawResultPayload};

/// Remote prediction service operations driven by the poll cycle.
/// Implemented over HTTP below; tests substitute a scripted variant.
pub trait PredictionService: Send + Sync + 'static {
    fn submit(
        &self,
        params: &LaunchParameters,
    ) -> impl Future<Output = Result<Submission, SubmitError>> + Send;

    fn progress(
        &self,
        handle: &JobHandle,
        timeout: Duration,
    ) -> impl Future<Output = Result<ProgressReport, PollError>> + Send;

    fn flight_path(
        &self,
        handle: &JobHandle,
        timeout: Duration,
    ) -> impl Future<Output = Result<RawResultPayload, FetchError>> + Send;
}

/// An accepted prediction job. Current servers answer the submit call
/// with the whole trajectory inline; older ones return a job id to poll.
pub struct Submission {
    pub handle: JobHandle,
    pub inline: Option<RawResultPayload>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    error: Option<ErrorBody>,
    #[serde(default)]
    prediction: Option<Vec<Leg>>,
    #[serde(default)]
    metadata: Option<RunMetadata>,
    #[serde(default)]
    request: Option<RequestEcho>,
    #[serde(default)]
    uuid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    description: String,
}

#[derive(Debug, Deserialize)]
struct RunMetadata {
    #[serde(default)]
    complete_datetime: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RequestEcho {
    #[serde(default)]
    dataset: Option<String>,
}

/// HTTP client for the prediction API.
pub struct HttpPredictionService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpPredictionService {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        HttpPredictionService {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn progress_url(&self, handle: &JobHandle) -> String {
        format!("{}/preds/{}/progress.json", self.base_url, handle)
    }

    fn flight_path_url(&self, handle: &JobHandle) -> String {
        format!("{}/preds/{}/flight_path.csv", self.base_url, handle)
    }
}

impl PredictionService for HttpPredictionService {
    async fn submit(&self, params: &LaunchParameters) -> Result<Submission, SubmitError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&params.to_query())
            .send()
            .await?
            .error_for_status()?;
        let body: SubmitResponse = response.json().await?;

        if let Some(error) = body.error {
            return Err(SubmitError::Rejected(error.description));
        }

        if let Some(legs) = body.prediction {
            if let Some(run_time) = body.metadata.and_then(|m| m.complete_datetime) {
                log::info!("prediction run completed at {}", run_time);
            }
            if let Some(dataset) = body.request.and_then(|r| r.dataset) {
                log::info!("prediction used wind dataset {}", dataset);
            }
            let handle = JobHandle::generate();
            log::debug!("service answered inline, assigned local job id {}", handle);
            return Ok(Submission {
                handle,
                inline: Some(RawResultPayload::Trajectory(legs)),
            });
        }

        match body.uuid {
            Some(id) => Ok(Submission {
                handle: JobHandle::new(id),
                inline: None,
            }),
            None => Err(SubmitError::Malformed(
                "response carried neither a prediction nor a job id".into(),
            )),
        }
    }

    async fn progress(
        &self,
        handle: &JobHandle,
        timeout: Duration,
    ) -> Result<ProgressReport, PollError> {
        let response = self
            .client
            .get(self.progress_url(handle))
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn flight_path(
        &self,
        handle: &JobHandle,
        timeout: Duration,
    ) -> Result<RawResultPayload, FetchError> {
        let response = self
            .client
            .get(self.flight_path_url(handle))
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;
        let rows = text.lines().map(str::to_string).collect();
        Ok(RawResultPayload::Tabular(rows))
    }
}
