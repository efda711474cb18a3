use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Profile;

/// One sample of a service-supplied trajectory leg.
#[derive(Debug, Clone, Deserialize)]
pub struct TrajectorySample {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub datetime: DateTime<Utc>,
}

/// A contiguous segment of the predicted flight as delivered by the
/// service: the ascent, then either a descent or a float.
#[derive(Debug, Clone, Deserialize)]
pub struct Leg {
    pub stage: String,
    pub trajectory: Vec<TrajectorySample>,
}

/// Raw result payload of a completed job, in whichever encoding the
/// service produced it.
#[derive(Debug, Clone)]
pub enum RawResultPayload {
    /// Structured two-leg trajectory from the JSON API.
    Trajectory(Vec<Leg>),
    /// Comma-delimited `timestamp,lat,lon,alt,...` rows.
    Tabular(Vec<String>),
}

/// A position on the flight track. Longitude is always within [-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// A named point of the flight (launch, burst or landing).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Landmark {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub datetime: DateTime<Utc>,
}

/// Canonical flight path, produced once per completed prediction job
/// regardless of which raw encoding the service returned.
#[derive(Debug, Clone, Serialize)]
pub struct FlightPath {
    pub points: Vec<TrackPoint>,
    pub launch: Landmark,
    pub burst: Landmark,
    pub landing: Landmark,
    /// Known only for trajectory results, where the service declares the
    /// second leg's stage.
    pub profile: Option<Profile>,
    pub flight_duration_seconds: i64,
    pub range_km: f64,
    /// Predictor output lines attached when the job completed with
    /// warnings. Empty for a clean run.
    pub diagnostics: Vec<String>,
}

impl TrajectorySample {
    pub(crate) fn landmark(&self) -> Landmark {
        Landmark {
            latitude: self.latitude,
            longitude: crate::geo::normalize_longitude(self.longitude),
            altitude: self.altitude,
            datetime: self.datetime,
        }
    }
}

impl Landmark {
    pub(crate) fn point(&self) -> TrackPoint {
        TrackPoint {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
        }
    }
}
