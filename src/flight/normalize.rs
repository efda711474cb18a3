use chrono::DateTime;

use super::error::NormalizeError;
use super::types::{FlightPath, Landmark, Leg, RawResultPayload, TrackPoint};
use crate::client::Profile;
use crate::geo;

/// Decimal digits kept on the launch-to-landing range.
const RANGE_PRECISION: i32 = 1;

/// What to do with a tabular row whose first four fields do not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowPolicy {
    /// Skip the row and keep going. A single corrupt line must not
    /// discard an entire flight.
    #[default]
    Skip,
    /// Abort the whole parse on the first bad row.
    Abort,
}

/// Converts a raw result payload into the canonical flight path,
/// skipping malformed tabular rows.
pub fn normalize(payload: &RawResultPayload) -> Result<FlightPath, NormalizeError> {
    normalize_with(payload, RowPolicy::default())
}

pub fn normalize_with(
    payload: &RawResultPayload,
    policy: RowPolicy,
) -> Result<FlightPath, NormalizeError> {
    match payload {
        RawResultPayload::Trajectory(legs) => normalize_trajectory(legs),
        RawResultPayload::Tabular(rows) => normalize_tabular(rows, policy),
    }
}

/// The service marks the ascent/descent (or ascent/float) transition by
/// splitting the track into legs, so the burst point is the first sample
/// of the second leg. In a float profile the maximum-altitude sample is
/// not necessarily that transition.
fn normalize_trajectory(legs: &[Leg]) -> Result<FlightPath, NormalizeError> {
    let (ascent, remainder) = legs.split_first().ok_or(NormalizeError::EmptyResult)?;
    let transition = remainder.first().ok_or(NormalizeError::EmptyResult)?;
    let final_leg = remainder.last().unwrap_or(transition);

    let launch = ascent
        .trajectory
        .first()
        .ok_or(NormalizeError::EmptyResult)?
        .landmark();
    let burst = transition
        .trajectory
        .first()
        .ok_or(NormalizeError::EmptyResult)?
        .landmark();
    let landing = final_leg
        .trajectory
        .last()
        .ok_or(NormalizeError::EmptyResult)?
        .landmark();

    let points = legs
        .iter()
        .flat_map(|leg| leg.trajectory.iter())
        .map(|sample| sample.landmark().point())
        .collect();

    let profile = if transition.stage == "descent" {
        Profile::Standard
    } else {
        Profile::Float
    };

    Ok(assemble(points, launch, burst, landing, Some(profile)))
}

/// The tabular encoding carries no leg boundary, so the greatest altitude
/// seen is the only available burst signal. Ties keep the earliest row.
fn normalize_tabular(rows: &[String], policy: RowPolicy) -> Result<FlightPath, NormalizeError> {
    let mut points = Vec::new();
    let mut launch: Option<Landmark> = None;
    let mut landing: Option<Landmark> = None;
    let mut burst: Option<Landmark> = None;
    let mut discarded = 0usize;

    for (idx, row) in rows.iter().enumerate() {
        let mark = match parse_row(row) {
            Some(mark) => mark,
            None => match policy {
                RowPolicy::Skip => {
                    discarded += 1;
                    continue;
                }
                RowPolicy::Abort => {
                    return Err(NormalizeError::MalformedRow {
                        line: idx + 1,
                        content: row.clone(),
                    })
                }
            },
        };

        if launch.is_none() {
            launch = Some(mark.clone());
        }
        if burst.as_ref().map_or(true, |b| mark.altitude > b.altitude) {
            burst = Some(mark.clone());
        }
        points.push(mark.point());
        // overwritten on every valid row, so the last one wins
        landing = Some(mark);
    }

    if discarded > 0 {
        log::warn!("skipped {} malformed flight path rows", discarded);
    }

    let launch = launch.ok_or(NormalizeError::EmptyResult)?;
    let landing = landing.ok_or(NormalizeError::EmptyResult)?;
    let burst = burst.ok_or(NormalizeError::EmptyResult)?;

    Ok(assemble(points, launch, burst, landing, None))
}

fn assemble(
    points: Vec<TrackPoint>,
    launch: Landmark,
    burst: Landmark,
    landing: Landmark,
    profile: Option<Profile>,
) -> FlightPath {
    let range_km = geo::distance_km_rounded(
        (launch.latitude, launch.longitude),
        (landing.latitude, landing.longitude),
        RANGE_PRECISION,
    );
    let flight_duration_seconds = (landing.datetime - launch.datetime).num_seconds();

    FlightPath {
        points,
        launch,
        burst,
        landing,
        profile,
        flight_duration_seconds,
        range_km,
        diagnostics: Vec::new(),
    }
}

/// A row is valid iff it has at least four comma-separated fields and the
/// first four parse as POSIX timestamp, latitude, longitude and altitude.
fn parse_row(row: &str) -> Option<Landmark> {
    let mut fields = row.split(',');
    let timestamp: f64 = fields.next()?.trim().parse().ok()?;
    let latitude: f64 = fields.next()?.trim().parse().ok()?;
    let longitude: f64 = fields.next()?.trim().parse().ok()?;
    let altitude: f64 = fields.next()?.trim().parse().ok()?;

    if !timestamp.is_finite() {
        return None;
    }
    let datetime = DateTime::from_timestamp(timestamp.trunc() as i64, 0)?;

    Some(Landmark {
        latitude,
        longitude: geo::normalize_longitude(longitude),
        altitude,
        datetime,
    })
}
