//! Spherical-earth geodetic primitives
//!
//! Every function here is total: non-finite input, coincident points or
//! floating-point overshoot degrade to a neutral value (0) instead of
//! propagating NaN into sequences, metrics or exported data.

use crate::core::{COMPASS_SECTOR_DEG, EARTH_RADIUS_M};

const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE",
    "S", "SSW", "SW", "WSW", "W", "WNW", "NW", "NNW",
];

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Great-circle distance in meters (haversine, R = 6 371 000 m)
pub fn distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    if !all_finite(&[lat1, lng1, lat2, lng2]) {
        return 0.0;
    }

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push the half-chord slightly outside [0,1]
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    let d = EARTH_RADIUS_M * c;
    if d.is_finite() {
        d
    } else {
        0.0
    }
}

/// Initial bearing from point 1 to point 2, degrees in [0,360)
pub fn bearing(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    if !all_finite(&[lat1, lng1, lat2, lng2]) {
        return 0.0;
    }

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();

    normalize_angle(y.atan2(x).to_degrees())
}

/// Reduce any angle into [0,360). Non-finite input yields 0.
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut r = angle % 360.0;
    if r < 0.0 {
        r += 360.0;
    }
    if r >= 360.0 || r == 0.0 {
        0.0
    } else {
        r
    }
}

/// Signed difference `to - from` reduced into (-180,180]
///
/// Positive means `to` lies clockwise of `from`.
pub fn signed_angle_difference(from: f64, to: f64) -> f64 {
    let d = normalize_angle(to - from);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// The 16-point compass name for an angle
pub fn cardinal(angle: f64) -> &'static str {
    let angle = normalize_angle(angle);
    let sector = ((angle / COMPASS_SECTOR_DEG).round() as i64).rem_euclid(16) as usize;
    COMPASS_POINTS[sector]
}

/// Format a bearing as `"<cardinal> <deg>°<min>'"`, truncating degrees and minutes
pub fn format_bearing(angle: f64) -> String {
    let angle = normalize_angle(angle);
    let degrees = angle.trunc();
    let minutes = ((angle - degrees) * 60.0).trunc();
    format!("{} {}°{}'", cardinal(angle), degrees as u32, minutes as u32)
}

/// Point reached by travelling `distance_m` from a start along an initial bearing
///
/// Returns the start unchanged when any input is non-finite.
pub fn destination(lat: f64, lng: f64, bearing_deg: f64, distance_m: f64) -> (f64, f64) {
    if !all_finite(&[lat, lng, bearing_deg, distance_m]) {
        return (lat, lng);
    }

    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = lat.to_radians();
    let lambda1 = lng.to_radians();

    let sin_phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).clamp(-1.0, 1.0);
    let phi2 = sin_phi2.asin();
    let y = theta.sin() * delta.sin() * phi1.cos();
    let x = delta.cos() - phi1.sin() * sin_phi2;
    let lambda2 = lambda1 + y.atan2(x);

    // keep longitude in [-180, 180]
    let lng2 = (lambda2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    (phi2.to_degrees(), lng2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rel_err(actual: f64, expected: f64) -> f64 {
        ((actual - expected) / expected).abs()
    }

    #[test]
    fn test_coincident_points() {
        assert_eq!(distance(12.5, -3.25, 12.5, -3.25), 0.0);
        assert_eq!(bearing(12.5, -3.25, 12.5, -3.25), 0.0);
    }

    #[test]
    fn test_nan_inputs_degrade_to_zero() {
        assert_eq!(distance(f64::NAN, 0.0, 1.0, 1.0), 0.0);
        assert_eq!(distance(0.0, 0.0, 1.0, f64::INFINITY), 0.0);
        assert_eq!(bearing(0.0, f64::NAN, 1.0, 1.0), 0.0);
        assert_eq!(normalize_angle(f64::NAN), 0.0);
    }

    #[test]
    fn test_known_distances_and_bearings() {
        // 0.001 degree of arc on the mean sphere
        let expected = EARTH_RADIUS_M * 0.001_f64.to_radians();
        assert!((expected - 111.195).abs() < 0.01);

        let east = distance(0.0, 0.0, 0.0, 0.001);
        assert!(rel_err(east, expected) < 0.001);
        assert!((bearing(0.0, 0.0, 0.0, 0.001) - 90.0).abs() < 1e-9);

        let north = distance(0.0, 0.0, 0.001, 0.0);
        assert!(rel_err(north, expected) < 0.001);
        assert!(bearing(0.0, 0.0, 0.001, 0.0).abs() < 1e-9);

        assert!((bearing(0.0, 0.0, -0.001, 0.0) - 180.0).abs() < 1e-9);
        assert!((bearing(0.0, 0.0, 0.0, -0.001) - 270.0).abs() < 1e-9);

        // one degree of longitude on the equator
        assert!((distance(0.0, 0.0, 0.0, 1.0) - 111_194.93).abs() < 0.5);
    }

    #[test]
    fn test_antipodal_distance_is_half_circumference() {
        let d = distance(0.0, 0.0, 0.0, 180.0);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1e-3);
    }

    #[test]
    fn test_normalize_angle() {
        assert_eq!(normalize_angle(0.0), 0.0);
        assert_eq!(normalize_angle(360.0), 0.0);
        assert_eq!(normalize_angle(-90.0), 270.0);
        assert_eq!(normalize_angle(725.0), 5.0);
        assert_eq!(normalize_angle(-720.0), 0.0);
        assert_eq!(normalize_angle(-1e-15), 0.0);
    }

    #[test]
    fn test_signed_angle_difference() {
        assert_eq!(signed_angle_difference(10.0, 15.0), 5.0);
        assert_eq!(signed_angle_difference(15.0, 10.0), -5.0);
        assert_eq!(signed_angle_difference(350.0, 5.0), 15.0);
        assert_eq!(signed_angle_difference(5.0, 350.0), -15.0);
        assert_eq!(signed_angle_difference(0.0, 180.0), 180.0);
    }

    #[test]
    fn test_format_bearing() {
        assert_eq!(format_bearing(0.0), "N 0°0'");
        assert_eq!(format_bearing(45.5), "NE 45°30'");
        assert_eq!(format_bearing(359.99), "N 359°59'");
        assert_eq!(format_bearing(11.24), "N 11°14'");
        assert_eq!(format_bearing(11.25), "NNE 11°15'");
        assert_eq!(format_bearing(-90.0), "W 270°0'");
        assert_eq!(format_bearing(202.5), "SSW 202°30'");
    }

    #[test]
    fn test_destination_inverts_distance_and_bearing() {
        let (lat, lng) = destination(47.0, 8.0, 63.0, 250.0);
        assert!((distance(47.0, 8.0, lat, lng) - 250.0).abs() < 1e-6);
        assert!((bearing(47.0, 8.0, lat, lng) - 63.0).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_normalize_idempotent(angle in -1.0e6f64..1.0e6) {
            let once = normalize_angle(angle);
            prop_assert!((0.0..360.0).contains(&once));
            prop_assert_eq!(normalize_angle(once), once);
        }

        #[test]
        fn prop_reverse_bearing_differs_by_half_turn(
            lat in -60.0f64..60.0,
            lng in -170.0f64..170.0,
            dlat in -0.01f64..0.01,
            dlng in -0.01f64..0.01,
        ) {
            prop_assume!(dlat.abs() > 1e-5 || dlng.abs() > 1e-5);
            let forward = bearing(lat, lng, lat + dlat, lng + dlng);
            let back = bearing(lat + dlat, lng + dlng, lat, lng);
            // meridian convergence bounds the departure from an exact half turn
            let convergence = 1.01 * dlng.abs() * (lat.abs() + 0.01).to_radians().sin() + 1e-6;
            let diff = signed_angle_difference(forward, back).abs();
            prop_assert!((diff - 180.0).abs() <= convergence + 1e-6);
        }

        #[test]
        fn prop_distance_is_symmetric_and_non_negative(
            lat1 in -89.0f64..89.0, lng1 in -179.0f64..179.0,
            lat2 in -89.0f64..89.0, lng2 in -179.0f64..179.0,
        ) {
            let d = distance(lat1, lng1, lat2, lng2);
            prop_assert!(d >= 0.0);
            prop_assert!((d - distance(lat2, lng2, lat1, lng1)).abs() < 1e-6);
        }
    }
}
