/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const DEFAULT_PRECISION: i32 = 3;

/// Haversine great-circle distance in kilometres between two (lat, lon)
/// points in decimal degrees, rounded to three decimal digits.
pub fn distance_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    distance_km_rounded(a, b, DEFAULT_PRECISION)
}

/// Haversine distance rounded to the given number of decimal digits.
pub fn distance_km_rounded(a: (f64, f64), b: (f64, f64), digits: i32) -> f64 {
    let (lat1, lon1) = a;
    let (lat2, lon2) = b;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    round_to(EARTH_RADIUS_KM * c, digits)
}

/// Maps longitudes the service reports past 180 degrees back into
/// [-180, 180]. The API is observed to emit values up to 360, so a single
/// subtraction is all that is ever needed; in-range values pass through.
pub fn normalize_longitude(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else {
        lon
    }
}

pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
