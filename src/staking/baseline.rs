//! Baseline segments and intermediate-point snapping

use crate::algorithms::geodesy::{bearing, distance};
use crate::core::{GeoPoint, PointId, EARTH_RADIUS_M};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// A two-point reference segment with its geometry cached at selection time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub start: PointId,
    pub end: PointId,
    /// Bearing start → end (degrees)
    pub bearing: f64,
    /// Great-circle length (m)
    pub length_m: f64,
}

impl Baseline {
    pub fn between(start: &GeoPoint, end: &GeoPoint) -> Self {
        Self {
            start: start.id.clone(),
            end: end.id.clone(),
            bearing: bearing(start.lat, start.lng, end.lat, end.lng),
            length_m: distance(start.lat, start.lng, end.lat, end.lng),
        }
    }

    /// Resolve both endpoints in a point list; `None` when either id is gone
    pub fn endpoints<'a>(&self, points: &'a [GeoPoint]) -> Option<(&'a GeoPoint, &'a GeoPoint)> {
        let start = points.iter().find(|p| p.id == self.start)?;
        let end = points.iter().find(|p| p.id == self.end)?;
        Some((start, end))
    }
}

/// Result of projecting a position onto a baseline segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snap {
    pub lat: f64,
    pub lng: f64,
    /// Position along the segment, 0 at the start and 1 at the end
    pub t: f64,
}

const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// Equirectangular east/north offsets (m) of a position from an origin
fn to_local(origin_lat: f64, origin_lng: f64, lat: f64, lng: f64) -> Vector2<f64> {
    Vector2::new(
        (lng - origin_lng) * origin_lat.to_radians().cos() * METERS_PER_DEGREE,
        (lat - origin_lat) * METERS_PER_DEGREE,
    )
}

fn from_local(origin_lat: f64, origin_lng: f64, v: Vector2<f64>) -> (f64, f64) {
    let cos_lat = origin_lat.to_radians().cos();
    let lng = if cos_lat.abs() > f64::EPSILON {
        origin_lng + v.x / (cos_lat * METERS_PER_DEGREE)
    } else {
        origin_lng
    };
    (origin_lat + v.y / METERS_PER_DEGREE, lng)
}

/// Project a position onto the segment `start`–`end`, clamped between the endpoints
///
/// A zero-length segment or non-finite input snaps to `start` with `t = 0`.
pub fn snap_to_segment(start: &GeoPoint, end: &GeoPoint, lat: f64, lng: f64) -> Snap {
    let at_start = Snap {
        lat: start.lat,
        lng: start.lng,
        t: 0.0,
    };
    if !lat.is_finite() || !lng.is_finite() {
        return at_start;
    }

    let ab = to_local(start.lat, start.lng, end.lat, end.lng);
    let ap = to_local(start.lat, start.lng, lat, lng);
    let len_sq = ab.norm_squared();
    if len_sq <= 0.0 || !len_sq.is_finite() {
        return at_start;
    }

    let t = (ap.dot(&ab) / len_sq).clamp(0.0, 1.0);
    if t == 1.0 {
        return Snap {
            lat: end.lat,
            lng: end.lng,
            t,
        };
    }
    let (snap_lat, snap_lng) = from_local(start.lat, start.lng, ab * t);
    Snap {
        lat: snap_lat,
        lng: snap_lng,
        t,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PointKind;

    fn pt(id: &str, lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::with_id(PointId::new(id), lat, lng, PointKind::Staked)
    }

    #[test]
    fn test_baseline_caches_geometry() {
        let a = pt("a", 0.0, 0.0);
        let b = pt("b", 0.0, 0.001);
        let baseline = Baseline::between(&a, &b);
        assert!((baseline.bearing - 90.0).abs() < 1e-9);
        assert!((baseline.length_m - 111.195).abs() < 0.01);

        let points = vec![a.clone(), b.clone()];
        assert!(baseline.endpoints(&points).is_some());
        assert!(baseline.endpoints(&points[..1]).is_none());
    }

    #[test]
    fn test_midpoint_is_fixed() {
        let a = pt("a", 48.0, 11.0);
        let b = pt("b", 48.001, 11.002);
        let mid_lat = (a.lat + b.lat) / 2.0;
        let mid_lng = (a.lng + b.lng) / 2.0;

        let snap = snap_to_segment(&a, &b, mid_lat, mid_lng);
        assert!((snap.t - 0.5).abs() < 1e-9);
        assert!((snap.lat - mid_lat).abs() < 1e-12);
        assert!((snap.lng - mid_lng).abs() < 1e-12);
    }

    #[test]
    fn test_projection_clamps_to_endpoints() {
        let a = pt("a", 10.0, 10.0);
        let b = pt("b", 10.0, 10.001);

        let before = snap_to_segment(&a, &b, 10.0001, 9.998);
        assert_eq!(before.t, 0.0);
        assert_eq!((before.lat, before.lng), (a.lat, a.lng));

        let beyond = snap_to_segment(&a, &b, 9.9999, 10.005);
        assert_eq!(beyond.t, 1.0);
        assert_eq!((beyond.lat, beyond.lng), (b.lat, b.lng));
    }

    #[test]
    fn test_offset_point_drops_onto_line() {
        let a = pt("a", 0.0, 0.0);
        let b = pt("b", 0.0, 0.002);
        // 0.0005 north of the quarter point
        let snap = snap_to_segment(&a, &b, 0.0005, 0.0005);
        assert!((snap.t - 0.25).abs() < 1e-9);
        assert!(snap.lat.abs() < 1e-12);
        assert!((snap.lng - 0.0005).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_baseline_snaps_to_start() {
        let a = pt("a", 1.0, 1.0);
        let same = pt("b", 1.0, 1.0);
        let snap = snap_to_segment(&a, &same, 1.001, 1.001);
        assert_eq!(snap.t, 0.0);
        assert_eq!((snap.lat, snap.lng), (1.0, 1.0));

        let b = pt("c", 1.0, 1.001);
        let nan = snap_to_segment(&a, &b, f64::NAN, 1.0);
        assert_eq!((nan.lat, nan.lng, nan.t), (1.0, 1.0, 0.0));
    }
}
