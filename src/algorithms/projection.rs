//! Planar projection of geodetic coordinates
//!
//! The projector is a capability chosen once when a survey session is built:
//! - `TrueProjection`: transverse Mercator on the WGS84 ellipsoid, keyed by
//!   6-degree zones (UTM layout)
//! - `ApproximateFallback`: equirectangular scaling, monotonic and stable but
//!   only meaningful for relative measurements over small areas
//!
//! Projection failures never panic: they return a zeroed coordinate with
//! `valid = false` and the caller falls back to the spherical path.

use crate::core::{
    is_valid_coordinate, APPROX_METERS_PER_DEGREE_LAT, APPROX_METERS_PER_DEGREE_LNG,
    UTM_FALSE_EASTING_M, UTM_FALSE_NORTHING_SOUTH_M, UTM_SCALE_FACTOR,
    WGS84_ECCENTRICITY_SQUARED, WGS84_SEMI_MAJOR_AXIS_M,
};
use serde::{Deserialize, Serialize};

/// Hemisphere of a projected coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    pub fn from_latitude(lat: f64) -> Self {
        if lat >= 0.0 {
            Hemisphere::North
        } else {
            Hemisphere::South
        }
    }
}

/// Easting/northing in meters within a zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarCoordinate {
    pub easting: f64,
    pub northing: f64,
    pub zone: u8,
    pub hemisphere: Hemisphere,
    /// False when the projection failed and the values are zeroed
    pub valid: bool,
}

impl PlanarCoordinate {
    fn failed() -> Self {
        Self {
            easting: 0.0,
            northing: 0.0,
            zone: 0,
            hemisphere: Hemisphere::North,
            valid: false,
        }
    }
}

/// Projection capability, selected once at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projector {
    /// Transverse Mercator (UTM zones)
    #[default]
    #[serde(rename = "transverse_mercator", alias = "true_projection")]
    TrueProjection,
    /// Equirectangular scaling, used when no true projection is wanted
    #[serde(rename = "approximate", alias = "approximate_fallback")]
    ApproximateFallback,
}

impl Projector {
    pub fn is_true_projection(&self) -> bool {
        matches!(self, Projector::TrueProjection)
    }

    /// Project into the zone containing the coordinate
    pub fn to_planar(&self, lat: f64, lng: f64) -> PlanarCoordinate {
        self.to_planar_in_zone(lat, lng, zone_for_longitude(lng))
    }

    /// Project into a fixed zone, so that a whole polygon shares one frame
    pub fn to_planar_in_zone(&self, lat: f64, lng: f64, zone: u8) -> PlanarCoordinate {
        if !is_valid_coordinate(lat, lng) || !(1..=60).contains(&zone) {
            log::debug!("projection rejected input lat={} lng={} zone={}", lat, lng, zone);
            return PlanarCoordinate::failed();
        }

        let hemisphere = Hemisphere::from_latitude(lat);
        let (easting, northing) = match self {
            Projector::TrueProjection => transverse_mercator(lat, lng, zone),
            Projector::ApproximateFallback => (
                lng * APPROX_METERS_PER_DEGREE_LNG,
                lat * APPROX_METERS_PER_DEGREE_LAT,
            ),
        };

        if !easting.is_finite() || !northing.is_finite() {
            log::warn!("projection produced non-finite output for lat={} lng={}", lat, lng);
            return PlanarCoordinate::failed();
        }

        PlanarCoordinate {
            easting,
            northing,
            zone,
            hemisphere,
            valid: true,
        }
    }
}

/// 6-degree zone number, clamped into 1..=60
pub fn zone_for_longitude(lng: f64) -> u8 {
    if !lng.is_finite() {
        return 0;
    }
    let zone = ((lng + 180.0) / 6.0).floor() as i64 + 1;
    zone.clamp(1, 60) as u8
}

/// Central meridian of a zone (degrees)
pub fn central_meridian(zone: u8) -> f64 {
    (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
}

fn transverse_mercator(lat: f64, lng: f64, zone: u8) -> (f64, f64) {
    let e2 = WGS84_ECCENTRICITY_SQUARED;
    let a_axis = WGS84_SEMI_MAJOR_AXIS_M;
    let k0 = UTM_SCALE_FACTOR;

    let lat_rad = lat.to_radians();
    let lon_diff = (lng - central_meridian(zone)).to_radians();
    let ep2 = e2 / (1.0 - e2);

    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let n = a_axis / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let t = lat_rad.tan().powi(2);
    let c = ep2 * cos_lat * cos_lat;
    let a = cos_lat * lon_diff;

    let m = a_axis
        * ((1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0) * lat_rad
            - (3.0 * e2 / 8.0 + 3.0 * e2.powi(2) / 32.0 + 45.0 * e2.powi(3) / 1024.0) * (2.0 * lat_rad).sin()
            + (15.0 * e2.powi(2) / 256.0 + 45.0 * e2.powi(3) / 1024.0) * (4.0 * lat_rad).sin()
            - (35.0 * e2.powi(3) / 3072.0) * (6.0 * lat_rad).sin());

    let easting = UTM_FALSE_EASTING_M
        + k0 * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0);

    let false_northing = if lat < 0.0 { UTM_FALSE_NORTHING_SOUTH_M } else { 0.0 };
    let northing = false_northing
        + k0 * (m
            + n * lat_rad.tan()
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));

    (easting, northing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_calculation() {
        assert_eq!(zone_for_longitude(-122.4194), 10); // San Francisco
        assert_eq!(zone_for_longitude(0.0), 31); // Greenwich
        assert_eq!(zone_for_longitude(139.6917), 54); // Tokyo
        assert_eq!(zone_for_longitude(180.0), 60);
        assert_eq!(zone_for_longitude(-180.0), 1);
        assert_eq!(central_meridian(31), 3.0);
    }

    #[test]
    fn test_central_meridian_on_equator() {
        let p = Projector::TrueProjection.to_planar(0.0, 3.0);
        assert!(p.valid);
        assert!((p.easting - 500_000.0).abs() < 1e-6);
        assert!(p.northing.abs() < 1e-6);
        assert_eq!(p.zone, 31);
        assert_eq!(p.hemisphere, Hemisphere::North);
    }

    #[test]
    fn test_known_utm_coordinate() {
        // Statue of Liberty, 40.6892 N 74.0445 W -> 18T 580736 E 4504695 N
        let p = Projector::TrueProjection.to_planar(40.6892, -74.0445);
        assert_eq!(p.zone, 18);
        assert!((p.easting - 580_736.0).abs() < 2.0, "easting {}", p.easting);
        assert!((p.northing - 4_504_695.0).abs() < 2.0, "northing {}", p.northing);
    }

    #[test]
    fn test_southern_hemisphere_false_northing() {
        let p = Projector::TrueProjection.to_planar(-33.8688, 151.2093);
        assert_eq!(p.hemisphere, Hemisphere::South);
        assert_eq!(p.zone, 56);
        assert!(p.northing > 6_000_000.0 && p.northing < 10_000_000.0);
    }

    #[test]
    fn test_approximate_fallback_scaling() {
        let p = Projector::ApproximateFallback.to_planar(1.0, 2.0);
        assert!(p.valid);
        assert_eq!(p.easting, 2.0 * 111_320.0);
        assert_eq!(p.northing, 110_574.0);
    }

    #[test]
    fn test_invalid_input_is_flagged_not_thrown() {
        for projector in [Projector::TrueProjection, Projector::ApproximateFallback] {
            let p = projector.to_planar(f64::NAN, 0.0);
            assert!(!p.valid);
            assert_eq!(p.easting, 0.0);
            assert_eq!(p.northing, 0.0);

            let p = projector.to_planar(95.0, 0.0);
            assert!(!p.valid);
        }
        assert!(!Projector::TrueProjection.to_planar_in_zone(0.0, 0.0, 0).valid);
    }

    #[test]
    fn test_projected_distance_matches_ground_distance() {
        let projector = Projector::TrueProjection;
        let a = projector.to_planar(46.5, 6.6);
        let b = projector.to_planar_in_zone(46.5, 6.6 + 0.01, a.zone);
        let planar = ((b.easting - a.easting).powi(2) + (b.northing - a.northing).powi(2)).sqrt();
        let ground = crate::algorithms::geodesy::distance(46.5, 6.6, 46.5, 6.61);
        // sphere vs ellipsoid plus grid scale stay well under half a percent
        assert!(((planar - ground) / ground).abs() < 0.005);
    }
}
