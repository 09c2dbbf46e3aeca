//! Spatial math for conflict detection and route interpolation.
//!
//! Distances are great-circle on a spherical earth. The engine works in
//! nautical miles; meters are kept for the underlying formulas.

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const METERS_PER_NM: f64 = 1_852.0;

/// Great-circle angle between two positions in radians.
fn central_angle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let half_dphi = (phi2 - phi1) / 2.0;
    let half_dlambda = (lon2 - lon1).to_radians() / 2.0;
    let h = half_dphi.sin().powi(2) + phi1.cos() * phi2.cos() * half_dlambda.sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// Haversine distance in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    central_angle(lat1, lon1, lat2, lon2) * EARTH_RADIUS_M
}

/// Haversine distance in nautical miles. Separation thresholds use this.
pub fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_distance(lat1, lon1, lat2, lon2) / METERS_PER_NM
}

/// Initial great-circle course from point 1 to point 2 in radians,
/// clockwise from true north, in (-π, π].
pub fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dlambda = (lon2 - lon1).to_radians();
    let east = dlambda.sin() * phi2.cos();
    let north = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    east.atan2(north)
}

/// Initial bearing in degrees, normalized to [0, 360).
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    bearing(lat1, lon1, lat2, lon2).to_degrees().rem_euclid(360.0)
}

/// Eight-point compass label for a bearing in degrees.
pub fn compass_point(bearing_deg: f64) -> &'static str {
    const POINTS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];
    let sector = ((bearing_deg.rem_euclid(360.0) + 22.5) / 45.0).floor() as usize % 8;
    POINTS[sector]
}

/// Position reached from (`lat`, `lon`) after `distance_m` meters on
/// initial course `bearing_rad` (0 = north, π/2 = east). Longitude is
/// wrapped to [-180, 180).
pub fn offset_by_bearing(lat: f64, lon: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    use std::f64::consts::{PI, TAU};

    if distance_m.abs() <= f64::EPSILON {
        return (lat, lon);
    }

    let phi1 = lat.to_radians();
    let delta = distance_m / EARTH_RADIUS_M;
    let (sin_phi1, cos_phi1) = phi1.sin_cos();
    let (sin_delta, cos_delta) = delta.sin_cos();

    let sin_phi2 = (sin_phi1 * cos_delta + cos_phi1 * sin_delta * bearing_rad.cos()).clamp(-1.0, 1.0);
    let phi2 = sin_phi2.asin();
    let dlambda = (bearing_rad.sin() * sin_delta * cos_phi1).atan2(cos_delta - sin_phi1 * sin_phi2);
    let lambda2 = (lon.to_radians() + dlambda + PI).rem_euclid(TAU) - PI;

    (phi2.to_degrees(), lambda2.to_degrees())
}

/// Point at `fraction` of the great-circle arc from point 1 to point 2.
///
/// `fraction` is a share of the arc length, so evenly spaced fractions give
/// evenly spaced points along the arc.
pub fn intermediate_point(lat1: f64, lon1: f64, lat2: f64, lon2: f64, fraction: f64) -> (f64, f64) {
    let phi1 = lat1.to_radians();
    let lambda1 = lon1.to_radians();
    let phi2 = lat2.to_radians();
    let lambda2 = lon2.to_radians();

    let delta = haversine_distance(lat1, lon1, lat2, lon2) / EARTH_RADIUS_M;
    let sin_delta = delta.sin();
    if sin_delta.abs() <= f64::EPSILON {
        return (lat1, lon1);
    }

    let a = ((1.0 - fraction) * delta).sin() / sin_delta;
    let b = (fraction * delta).sin() / sin_delta;

    let x = a * phi1.cos() * lambda1.cos() + b * phi2.cos() * lambda2.cos();
    let y = a * phi1.cos() * lambda1.sin() + b * phi2.cos() * lambda2.sin();
    let z = a * phi1.sin() + b * phi2.sin();

    let phi = z.atan2((x * x + y * y).sqrt());
    let lambda = y.atan2(x);
    (phi.to_degrees(), lambda.to_degrees())
}

/// Midpoint of two positions. Adequate for the few-mile spans compared here.
pub fn midpoint(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> (f64, f64) {
    intermediate_point(lat1, lon1, lat2, lon2, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_latitude_is_about_sixty_nm() {
        let nm = haversine_nm(40.0, -75.0, 41.0, -75.0);
        assert!((nm - 60.04).abs() < 0.05, "got {nm}");
        assert!((haversine_distance(40.0, -75.0, 41.0, -75.0) - nm * METERS_PER_NM).abs() < 1e-6);
    }

    #[test]
    fn nm_distance_is_symmetric_and_zero_at_same_fix() {
        assert_eq!(haversine_nm(40.64, -73.78, 40.64, -73.78), 0.0);
        let there = haversine_nm(40.64, -73.78, 33.94, -118.41);
        let back = haversine_nm(33.94, -118.41, 40.64, -73.78);
        assert!((there - back).abs() < 1e-9);
        // JFK to LAX is roughly 2,150 nm on the great circle.
        assert!((there - 2150.0).abs() < 15.0, "got {there}");
    }

    #[test]
    fn lateral_threshold_is_strict_near_three_nm() {
        let (lat, lon) = offset_by_bearing(40.0, -75.0, 2.99 * METERS_PER_NM, 0.3);
        assert!(haversine_nm(40.0, -75.0, lat, lon) < 3.0);
        let (lat, lon) = offset_by_bearing(40.0, -75.0, 3.01 * METERS_PER_NM, 0.3);
        assert!(haversine_nm(40.0, -75.0, lat, lon) > 3.0);
    }

    #[test]
    fn bearing_deg_is_normalized() {
        assert!((bearing_deg(0.0, 0.0, 1.0, 0.0) - 0.0).abs() < 1e-6);
        assert!((bearing_deg(0.0, 0.0, 0.0, 1.0) - 90.0).abs() < 1e-6);
        assert!((bearing_deg(0.0, 0.0, 0.0, -1.0) - 270.0).abs() < 1e-6);
    }

    #[test]
    fn compass_point_sectors() {
        assert_eq!(compass_point(0.0), "N");
        assert_eq!(compass_point(350.0), "N");
        assert_eq!(compass_point(44.0), "NE");
        assert_eq!(compass_point(180.0), "S");
        assert_eq!(compass_point(292.0), "W");
        assert_eq!(compass_point(300.0), "NW");
    }

    #[test]
    fn intermediate_point_splits_arc_evenly() {
        let (lat1, lon1, lat2, lon2) = (40.0, -75.0, 41.0, -73.0);
        let total = haversine_nm(lat1, lon1, lat2, lon2);
        let (mid_lat, mid_lon) = intermediate_point(lat1, lon1, lat2, lon2, 0.25);
        let first_leg = haversine_nm(lat1, lon1, mid_lat, mid_lon);
        assert!((first_leg - total * 0.25).abs() < 0.01);

        let end = intermediate_point(lat1, lon1, lat2, lon2, 1.0);
        assert!((end.0 - lat2).abs() < 1e-9 && (end.1 - lon2).abs() < 1e-9);
    }

    #[test]
    fn offset_by_bearing_round_trips_distance() {
        let (lat, lon) = offset_by_bearing(40.0, -75.0, 2.0 * METERS_PER_NM, std::f64::consts::FRAC_PI_2);
        assert!((haversine_nm(40.0, -75.0, lat, lon) - 2.0).abs() < 1e-6);
    }
}
