use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::error::SubmitError;

/// Flight profile requested from the predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum Profile {
    #[serde(rename = "standard_profile")]
    #[value(name = "standard_profile")]
    Standard,
    #[serde(rename = "float_profile")]
    #[value(name = "float_profile")]
    Float,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Standard => "standard_profile",
            Profile::Float => "float_profile",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied launch scenario. Immutable once submitted.
#[derive(Debug, Clone)]
pub struct LaunchParameters {
    pub profile: Profile,
    pub launch_datetime: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub launch_altitude: f64,
    pub ascent_rate: f64,
    pub burst_altitude: Option<f64>,
    pub descent_rate: Option<f64>,
    pub float_altitude: Option<f64>,
    pub stop_datetime: Option<DateTime<Utc>>,
}

impl LaunchParameters {
    pub fn validate(&self) -> Result<(), SubmitError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Self::invalid("latitude must be within -90..90");
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Self::invalid("longitude must be within -180..180");
        }
        if self.launch_altitude < 0.0 {
            return Self::invalid("launch altitude must not be negative");
        }
        if self.ascent_rate <= 0.0 {
            return Self::invalid("ascent rate must be positive");
        }
        match self.profile {
            Profile::Standard => {
                match self.burst_altitude {
                    Some(burst) if burst > self.launch_altitude => {}
                    Some(_) => return Self::invalid("burst altitude must exceed launch altitude"),
                    None => return Self::invalid("standard profile requires a burst altitude"),
                }
                match self.descent_rate {
                    Some(rate) if rate > 0.0 => {}
                    Some(_) => return Self::invalid("descent rate must be positive"),
                    None => return Self::invalid("standard profile requires a descent rate"),
                }
            }
            Profile::Float => {
                match self.float_altitude {
                    Some(float) if float > self.launch_altitude => {}
                    Some(_) => return Self::invalid("float altitude must exceed launch altitude"),
                    None => return Self::invalid("float profile requires a float altitude"),
                }
                match self.stop_datetime {
                    Some(stop) if stop > self.launch_datetime => {}
                    Some(_) => return Self::invalid("stop time must be after launch"),
                    None => return Self::invalid("float profile requires a stop time"),
                }
            }
        }
        Ok(())
    }

    fn invalid(message: &str) -> Result<(), SubmitError> {
        Err(SubmitError::Invalid(message.to_string()))
    }

    /// Flat key/value form sent to the submit endpoint.
    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let rfc3339 = |dt: &DateTime<Utc>| dt.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut query = vec![
            ("profile", self.profile.to_string()),
            ("launch_datetime", rfc3339(&self.launch_datetime)),
            ("launch_latitude", self.latitude.to_string()),
            ("launch_longitude", self.longitude.to_string()),
            ("launch_altitude", self.launch_altitude.to_string()),
            ("ascent_rate", self.ascent_rate.to_string()),
        ];
        if let Some(burst) = self.burst_altitude {
            query.push(("burst_altitude", burst.to_string()));
        }
        if let Some(rate) = self.descent_rate {
            query.push(("descent_rate", rate.to_string()));
        }
        if let Some(float) = self.float_altitude {
            query.push(("float_altitude", float.to_string()));
        }
        if let Some(stop) = &self.stop_datetime {
            query.push(("stop_datetime", rfc3339(stop)));
        }
        query
    }
}

/// Opaque identifier correlating a submission with its eventual result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        JobHandle(id.into())
    }

    /// Locally assigned id for jobs the service answered at submit time.
    pub(crate) fn generate() -> Self {
        JobHandle(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Progress payload served by the status endpoint. Missing fields
/// default, so partial payloads from older servers still classify.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressReport {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub pred_complete: bool,
    #[serde(default)]
    pub pred_running: bool,
    #[serde(default)]
    pub run_time: Option<String>,
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub pred_output: Vec<String>,
    #[serde(default)]
    pub warnings: bool,
}

impl ProgressReport {
    /// Classifies the job state. A reported error always wins, whatever
    /// the completion flags claim.
    pub fn status(&self) -> JobStatus {
        if let Some(description) = &self.error {
            JobStatus::Failed {
                description: description.clone(),
            }
        } else if self.pred_complete {
            JobStatus::Completed
        } else if self.pred_running {
            JobStatus::Running
        } else {
            JobStatus::Queued
        }
    }
}

/// Job state as reported by the service; never invented locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed { description: String },
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => f.write_str("waiting for predictor to run"),
            JobStatus::Running => f.write_str("predictor running"),
            JobStatus::Completed => f.write_str("prediction finished"),
            JobStatus::Failed { description } => {
                write!(f, "prediction failed: {}", description)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn standard_params() -> LaunchParameters {
        LaunchParameters {
            profile: Profile::Standard,
            launch_datetime: Utc.with_ymd_and_hms(2026, 8, 5, 10, 0, 0).unwrap(),
            latitude: 52.2135,
            longitude: 0.0964,
            launch_altitude: 0.0,
            ascent_rate: 5.0,
            burst_altitude: Some(30000.0),
            descent_rate: Some(5.0),
            float_altitude: None,
            stop_datetime: None,
        }
    }

    #[test]
    fn valid_standard_parameters_pass() {
        assert!(standard_params().validate().is_ok());
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let mut params = standard_params();
        params.latitude = 95.0;
        assert!(matches!(
            params.validate(),
            Err(SubmitError::Invalid(_))
        ));
    }

    #[test]
    fn standard_profile_requires_burst_altitude() {
        let mut params = standard_params();
        params.burst_altitude = None;
        assert!(params.validate().is_err());
    }

    #[test]
    fn float_profile_requires_stop_after_launch() {
        let mut params = standard_params();
        params.profile = Profile::Float;
        params.float_altitude = Some(28000.0);
        params.stop_datetime = Some(params.launch_datetime);
        assert!(params.validate().is_err());

        params.stop_datetime = Some(params.launch_datetime + chrono::Duration::days(1));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn query_carries_profile_fields() {
        let query = standard_params().to_query();
        let get = |key: &str| {
            query
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("profile"), Some("standard_profile"));
        assert_eq!(get("launch_datetime"), Some("2026-08-05T10:00:00Z"));
        assert_eq!(get("burst_altitude"), Some("30000"));
        assert_eq!(get("float_altitude"), None);
    }

    #[test]
    fn error_field_always_wins_classification() {
        let report = ProgressReport {
            error: Some("no wind data".into()),
            pred_complete: true,
            pred_running: true,
            ..ProgressReport::default()
        };
        assert_eq!(
            report.status(),
            JobStatus::Failed {
                description: "no wind data".into()
            }
        );
    }

    #[test]
    fn completion_flags_classify_in_order() {
        let mut report = ProgressReport::default();
        assert_eq!(report.status(), JobStatus::Queued);

        report.pred_running = true;
        assert_eq!(report.status(), JobStatus::Running);

        report.pred_complete = true;
        assert_eq!(report.status(), JobStatus::Completed);
    }

    #[test]
    fn progress_report_tolerates_missing_fields() {
        let report: ProgressReport =
            serde_json::from_str(r#"{"pred_running": true}"#).unwrap();
        assert_eq!(report.status(), JobStatus::Running);
        assert!(report.pred_output.is_empty());
    }
}
