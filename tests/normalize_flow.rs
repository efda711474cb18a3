use chrono::{TimeZone, Utc};

use habpredict::flight::{normalize, Leg, NormalizeError, RawResultPayload};
use habpredict::client::Profile;
use habpredict::geo;

// Abridged from a real API response: a standard profile flight with the
// longitude reported past 180 degrees.
const TRAJECTORY_JSON: &str = r#"[
    {
        "stage": "ascent",
        "trajectory": [
            {"altitude": 0.0, "datetime": "2026-08-05T10:00:00Z",
             "latitude": 52.2135, "longitude": 0.0964},
            {"altitude": 15000.0, "datetime": "2026-08-05T10:50:00Z",
             "latitude": 52.25, "longitude": 0.31},
            {"altitude": 30000.0, "datetime": "2026-08-05T11:40:00Z",
             "latitude": 52.31, "longitude": 0.62}
        ]
    },
    {
        "stage": "descent",
        "trajectory": [
            {"altitude": 29500.0, "datetime": "2026-08-05T11:41:00Z",
             "latitude": 52.32, "longitude": 0.64},
            {"altitude": 12000.0, "datetime": "2026-08-05T12:00:00Z",
             "latitude": 52.36, "longitude": 0.71},
            {"altitude": 150.0, "datetime": "2026-08-05T12:25:00Z",
             "latitude": 52.41, "longitude": 200.79}
        ]
    }
]"#;

#[test]
fn trajectory_response_normalizes_end_to_end() {
    let legs: Vec<Leg> = serde_json::from_str(TRAJECTORY_JSON).unwrap();
    let path = normalize(&RawResultPayload::Trajectory(legs)).unwrap();

    assert_eq!(path.profile, Some(Profile::Standard));
    assert_eq!(path.points.len(), 6);

    assert_eq!(path.launch.latitude, 52.2135);
    assert_eq!(
        path.launch.datetime,
        Utc.with_ymd_and_hms(2026, 8, 5, 10, 0, 0).unwrap()
    );

    // burst is the service-declared transition, not the ascent maximum
    assert_eq!(path.burst.altitude, 29500.0);
    assert_eq!(
        path.burst.datetime,
        Utc.with_ymd_and_hms(2026, 8, 5, 11, 41, 0).unwrap()
    );

    assert_eq!(path.landing.longitude, -159.21);
    assert_eq!(path.flight_duration_seconds, 2 * 3600 + 25 * 60);

    let expected_range = geo::distance_km_rounded(
        (path.launch.latitude, path.launch.longitude),
        (path.landing.latitude, path.landing.longitude),
        1,
    );
    assert_eq!(path.range_km, expected_range);
}

#[test]
fn tabular_response_normalizes_end_to_end() {
    let csv = "\
1754388000,52.2135,0.0964,0\n\
1754391000,52.2500,0.3100,15000\n\
garbage line that the server should never have written\n\
1754394000,52.3100,0.6200,30000\n\
1754395500,52.3600,0.7100,12000\n\
1754397000,52.4100,0.7900,150\n";

    let rows: Vec<String> = csv.lines().map(str::to_string).collect();
    let path = normalize(&RawResultPayload::Tabular(rows)).unwrap();

    assert_eq!(path.points.len(), 5);
    assert_eq!(path.burst.altitude, 30000.0);
    assert_eq!(path.launch.altitude, 0.0);
    assert_eq!(path.landing.altitude, 150.0);
    assert_eq!(path.flight_duration_seconds, 9000);
    assert_eq!(path.profile, None);
}

#[test]
fn unusable_payloads_stay_typed_errors() {
    let empty = RawResultPayload::Tabular(Vec::new());
    assert!(matches!(
        normalize(&empty),
        Err(NormalizeError::EmptyResult)
    ));

    let one_leg: Vec<Leg> = serde_json::from_str(
        r#"[{"stage": "ascent", "trajectory": [
            {"altitude": 0.0, "datetime": "2026-08-05T10:00:00Z",
             "latitude": 52.0, "longitude": 0.1}
        ]}]"#,
    )
    .unwrap();
    assert!(matches!(
        normalize(&RawResultPayload::Trajectory(one_leg)),
        Err(NormalizeError::EmptyResult)
    ));
}
