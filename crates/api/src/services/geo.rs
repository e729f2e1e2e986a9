//! Great-circle distances for radius search.

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

/// Haversine distance between two coordinates, in miles.
pub fn distance_miles(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * a.sqrt().clamp(-1.0, 1.0).asin()
}

pub fn within_radius(
    center_lat: f64,
    center_lng: f64,
    lat: f64,
    lng: f64,
    radius_miles: f64,
) -> bool {
    distance_miles(center_lat, center_lng, lat, lng) <= radius_miles
}
