//! Area and perimeter of an ordered point sequence
//!
//! Area uses the shoelace formula over one of two planar frames, picked once
//! per call:
//! - projected: every vertex through the transverse Mercator projector, all in
//!   the zone of the first vertex
//! - spherical tangent plane: east/north offsets from the bounding-box centre built
//!   from haversine distances and the sign of the coordinate difference
//!
//! The tangent-plane path is documented valid while every vertex lies within
//! `max_fallback_extent_m` of the first vertex and below
//! `max_fallback_latitude_deg`. Outside that region the area is still returned
//! but flagged.

use crate::algorithms::geodesy::distance;
use crate::algorithms::projection::Projector;
use crate::core::GeoPoint;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Default radius around the first vertex inside which the tangent plane holds (m)
pub const DEFAULT_FALLBACK_EXTENT_M: f64 = 10_000.0;

/// Default latitude limit for the tangent plane (degrees)
pub const DEFAULT_FALLBACK_MAX_LATITUDE_DEG: f64 = 80.0;

/// Frame the area was computed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricPath {
    Projected,
    SphericalTangent,
}

/// Area and perimeter of one polygon computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolygonSummary {
    pub area_m2: f64,
    pub perimeter_m: f64,
    pub path: MetricPath,
    /// Valid vertices the metrics were computed over
    pub vertex_count: usize,
    /// False when the tangent-plane path ran outside its documented region
    pub within_valid_region: bool,
}

/// Polygon metrics bound to one projector capability
#[derive(Debug, Clone, Copy)]
pub struct PolygonMetrics {
    projector: Projector,
    max_fallback_extent_m: f64,
    max_fallback_latitude_deg: f64,
}

impl Default for PolygonMetrics {
    fn default() -> Self {
        Self::new(Projector::default())
    }
}

/// Signed shoelace area of a closed ring: `Σ (x_i·y_{i+1} - x_{i+1}·y_i) / 2`
///
/// Positive for counter-clockwise rings. Coordinates are taken relative to the
/// first vertex to keep large projected values from cancelling.
pub fn shoelace(ring: &[Vector2<f64>]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let origin = ring[0];
    let twice_area: f64 = ring
        .iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(p, q)| {
            let p = p - origin;
            let q = q - origin;
            p.x * q.y - q.x * p.y
        })
        .sum();
    twice_area / 2.0
}

impl PolygonMetrics {
    pub fn new(projector: Projector) -> Self {
        Self {
            projector,
            max_fallback_extent_m: DEFAULT_FALLBACK_EXTENT_M,
            max_fallback_latitude_deg: DEFAULT_FALLBACK_MAX_LATITUDE_DEG,
        }
    }

    /// Override the documented valid region of the tangent-plane path
    pub fn with_fallback_limits(mut self, max_extent_m: f64, max_latitude_deg: f64) -> Self {
        self.max_fallback_extent_m = max_extent_m;
        self.max_fallback_latitude_deg = max_latitude_deg;
        self
    }

    pub fn projector(&self) -> Projector {
        self.projector
    }

    /// Enclosed area in square meters; 0 with fewer than 3 valid points
    pub fn area(&self, points: &[GeoPoint]) -> f64 {
        self.signed_area(points).abs()
    }

    /// Area with winding sign, positive when counter-clockwise seen from above
    pub fn signed_area(&self, points: &[GeoPoint]) -> f64 {
        let valid = valid_points(points);
        self.signed_area_of(&valid).0
    }

    /// Sum of consecutive great-circle edges, closed when more than 2 points
    pub fn perimeter(&self, points: &[GeoPoint]) -> f64 {
        perimeter_of(&valid_points(points))
    }

    pub fn summarize(&self, points: &[GeoPoint]) -> PolygonSummary {
        let valid = valid_points(points);
        let (signed, path) = self.signed_area_of(&valid);
        let within_valid_region = match path {
            MetricPath::Projected => true,
            MetricPath::SphericalTangent => self.fallback_region_holds(&valid),
        };
        if !within_valid_region {
            log::warn!(
                "tangent-plane area over {} vertices exceeds the valid region ({} m, {} deg)",
                valid.len(),
                self.max_fallback_extent_m,
                self.max_fallback_latitude_deg
            );
        }

        PolygonSummary {
            area_m2: signed.abs(),
            perimeter_m: perimeter_of(&valid),
            path,
            vertex_count: valid.len(),
            within_valid_region,
        }
    }

    fn signed_area_of(&self, valid: &[&GeoPoint]) -> (f64, MetricPath) {
        if valid.len() < 3 {
            let path = if self.projector.is_true_projection() {
                MetricPath::Projected
            } else {
                MetricPath::SphericalTangent
            };
            return (0.0, path);
        }

        if self.projector.is_true_projection() {
            if let Some(ring) = self.projected_ring(valid) {
                return (shoelace(&ring), MetricPath::Projected);
            }
            log::warn!("projection failed for part of the polygon, using the tangent plane for all of it");
        }

        (shoelace(&tangent_plane_ring(valid)), MetricPath::SphericalTangent)
    }

    fn projected_ring(&self, valid: &[&GeoPoint]) -> Option<Vec<Vector2<f64>>> {
        let zone = self.projector.to_planar(valid[0].lat, valid[0].lng).zone;
        valid
            .iter()
            .map(|p| {
                let planar = self.projector.to_planar_in_zone(p.lat, p.lng, zone);
                planar.valid.then(|| Vector2::new(planar.easting, planar.northing))
            })
            .collect()
    }

    fn fallback_region_holds(&self, valid: &[&GeoPoint]) -> bool {
        let Some(first) = valid.first() else {
            return true;
        };
        valid.iter().all(|p| {
            p.lat.abs() <= self.max_fallback_latitude_deg
                && distance(first.lat, first.lng, p.lat, p.lng) <= self.max_fallback_extent_m
        })
    }
}

fn valid_points(points: &[GeoPoint]) -> Vec<&GeoPoint> {
    points.iter().filter(|p| p.is_valid()).collect()
}

fn perimeter_of(valid: &[&GeoPoint]) -> f64 {
    let open: f64 = valid
        .windows(2)
        .map(|w| distance(w[0].lat, w[0].lng, w[1].lat, w[1].lng))
        .sum();
    match (valid.first(), valid.last()) {
        (Some(first), Some(last)) if valid.len() > 2 => open + distance(last.lat, last.lng, first.lat, first.lng),
        _ => open,
    }
}

/// East/north offsets from the bounding-box centre using haversine legs along each axis
///
/// The anchor depends only on the vertex set, so the area does not change when
/// the ring is listed from a different starting vertex.
fn tangent_plane_ring(valid: &[&GeoPoint]) -> Vec<Vector2<f64>> {
    let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_lng, mut max_lng) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in valid {
        min_lat = min_lat.min(p.lat);
        max_lat = max_lat.max(p.lat);
        min_lng = min_lng.min(p.lng);
        max_lng = max_lng.max(p.lng);
    }
    let (lat0, lng0) = ((min_lat + max_lat) / 2.0, (min_lng + max_lng) / 2.0);

    valid
        .iter()
        .map(|p| {
            let x = distance(lat0, lng0, lat0, p.lng) * (p.lng - lng0).signum();
            let y = distance(lat0, lng0, p.lat, lng0) * (p.lat - lat0).signum();
            Vector2::new(x, y)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::geodesy::destination;
    use crate::algorithms::projection::central_meridian;
    use crate::core::PointKind;
    use proptest::prelude::*;

    fn pt(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng, PointKind::Manual)
    }

    /// 100 m east by 50 m north, counter-clockwise from the south-west corner
    fn rectangle(lat: f64, lng: f64) -> Vec<GeoPoint> {
        let sw = (lat, lng);
        let se = destination(sw.0, sw.1, 90.0, 100.0);
        let ne = destination(se.0, se.1, 0.0, 50.0);
        let nw = destination(sw.0, sw.1, 0.0, 50.0);
        vec![pt(sw.0, sw.1), pt(se.0, se.1), pt(ne.0, ne.1), pt(nw.0, nw.1)]
    }

    #[test]
    fn test_shoelace_square() {
        let d = 37.5;
        let square = [
            Vector2::new(0.0, 0.0),
            Vector2::new(0.0, d),
            Vector2::new(d, d),
            Vector2::new(d, 0.0),
        ];
        assert_eq!(shoelace(&square).abs(), d * d);
        // clockwise listing gives the negative sign
        assert_eq!(shoelace(&square), -d * d);
    }

    #[test]
    fn test_rectangle_tangent_plane() {
        let metrics = PolygonMetrics::new(Projector::ApproximateFallback);
        let summary = metrics.summarize(&rectangle(45.0, 7.0));
        assert_eq!(summary.path, MetricPath::SphericalTangent);
        assert!(summary.within_valid_region);
        assert_eq!(summary.vertex_count, 4);
        assert!((summary.area_m2 - 5000.0).abs() < 5.0, "area {}", summary.area_m2);
        assert!((summary.perimeter_m - 300.0).abs() < 0.3, "perimeter {}", summary.perimeter_m);
    }

    #[test]
    fn test_rectangle_projected() {
        let metrics = PolygonMetrics::new(Projector::TrueProjection);
        let summary = metrics.summarize(&rectangle(45.0, 7.0));
        assert_eq!(summary.path, MetricPath::Projected);
        // ellipsoid and grid scale against the spherical construction
        assert!((summary.area_m2 - 5000.0).abs() < 50.0, "area {}", summary.area_m2);
        assert!((summary.perimeter_m - 300.0).abs() < 0.3);
    }

    #[test]
    fn test_fewer_than_three_points() {
        let metrics = PolygonMetrics::default();
        assert_eq!(metrics.area(&[]), 0.0);
        assert_eq!(metrics.perimeter(&[]), 0.0);

        let two = vec![pt(0.0, 0.0), pt(0.0, 0.001)];
        assert_eq!(metrics.area(&two), 0.0);
        // open polyline, no closing edge
        let d = distance(0.0, 0.0, 0.0, 0.001);
        assert!((metrics.perimeter(&two) - d).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_points_are_excluded() {
        let metrics = PolygonMetrics::new(Projector::ApproximateFallback);
        let clean = rectangle(10.0, 20.0);
        let mut dirty = clean.clone();
        dirty.insert(2, pt(f64::NAN, 20.0));
        dirty.push(pt(95.0, 0.0));

        assert_eq!(metrics.area(&dirty), metrics.area(&clean));
        assert_eq!(metrics.perimeter(&dirty), metrics.perimeter(&clean));
        assert_eq!(metrics.summarize(&dirty).vertex_count, 4);

        let mostly_bad = vec![pt(0.0, 0.0), pt(f64::NAN, 0.0), pt(0.0, 0.001), pt(0.0, 200.0)];
        assert_eq!(metrics.area(&mostly_bad), 0.0);
    }

    #[test]
    fn test_duplicate_consecutive_points() {
        for projector in [Projector::TrueProjection, Projector::ApproximateFallback] {
            let metrics = PolygonMetrics::new(projector);
            let base = rectangle(-20.0, 30.0);
            let mut doubled = base.clone();
            doubled.insert(1, base[0].clone());
            doubled.insert(3, base[1].clone());

            assert!((metrics.area(&doubled) - metrics.area(&base)).abs() < 1e-6);
            assert!((metrics.perimeter(&doubled) - metrics.perimeter(&base)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_collinear_points_have_zero_area() {
        let metrics = PolygonMetrics::new(Projector::ApproximateFallback);
        let line = vec![pt(5.0, 1.0), pt(5.0, 1.001), pt(5.0, 1.002), pt(5.0, 1.003)];
        assert_eq!(metrics.area(&line), 0.0);

        let equator = vec![pt(0.0, 1.0), pt(0.0, 1.001), pt(0.0, 1.002)];
        assert!(PolygonMetrics::new(Projector::TrueProjection).area(&equator) < 1e-6);
    }

    #[test]
    fn test_reversal_flips_sign_only() {
        for projector in [Projector::TrueProjection, Projector::ApproximateFallback] {
            let metrics = PolygonMetrics::new(projector);
            let ccw = rectangle(52.0, 13.0);
            // same starting vertex, opposite winding
            let mut cw = ccw.clone();
            cw[1..].reverse();

            let a = metrics.signed_area(&ccw);
            let b = metrics.signed_area(&cw);
            assert!(a > 0.0);
            assert!(b < 0.0);
            assert!((a + b).abs() < 1e-3);
            assert!((metrics.perimeter(&ccw) - metrics.perimeter(&cw)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tangent_plane_area_ignores_start_vertex() {
        let square = vec![pt(45.0, 7.0), pt(45.0, 7.05), pt(45.05, 7.05), pt(45.05, 7.0)];
        let mut from_ne = square.clone();
        from_ne.rotate_left(2);

        let metrics = PolygonMetrics::new(Projector::ApproximateFallback);
        let a = metrics.area(&square);
        let b = metrics.area(&from_ne);
        assert!((a - b).abs() < 1e-6 * a, "{} vs {}", a, b);
    }

    #[test]
    fn test_fallback_region_flag() {
        let metrics = PolygonMetrics::new(Projector::ApproximateFallback).with_fallback_limits(1_000.0, 80.0);
        let large = vec![pt(0.0, 0.0), pt(0.0, 0.1), pt(0.1, 0.1)];
        assert!(!metrics.summarize(&large).within_valid_region);

        let polar = PolygonMetrics::new(Projector::ApproximateFallback).summarize(&rectangle(85.0, 0.0));
        assert!(!polar.within_valid_region);

        let projected = PolygonMetrics::new(Projector::TrueProjection).summarize(&large);
        assert!(projected.within_valid_region);
    }

    proptest! {
        #[test]
        fn prop_rotation_invariance(
            zone in 2u8..59,
            u in -2.0f64..2.0,
            lat in -60.0f64..60.0,
            offsets in prop::collection::vec((-0.005f64..0.005, -0.005f64..0.005), 3..8),
            shift in 0usize..8,
        ) {
            let lng = central_meridian(zone) + u;
            let points: Vec<GeoPoint> = offsets.iter().map(|(dy, dx)| pt(lat + dy, lng + dx)).collect();
            let mut rotated = points.clone();
            rotated.rotate_left(shift % points.len());

            let metrics = PolygonMetrics::new(Projector::TrueProjection);
            let a = metrics.area(&points);
            let b = metrics.area(&rotated);
            prop_assert!((a - b).abs() <= 1e-6 * a.max(1.0));

            let pa = metrics.perimeter(&points);
            let pb = metrics.perimeter(&rotated);
            prop_assert!((pa - pb).abs() <= 1e-6 * pa.max(1.0));
        }

        #[test]
        fn prop_tangent_plane_rotation_invariance(
            lat in -70.0f64..70.0,
            lng in -170.0f64..170.0,
            offsets in prop::collection::vec((-0.04f64..0.04, -0.04f64..0.04), 3..8),
            shift in 0usize..8,
        ) {
            let points: Vec<GeoPoint> = offsets.iter().map(|(dy, dx)| pt(lat + dy, lng + dx)).collect();
            let mut rotated = points.clone();
            rotated.rotate_left(shift % points.len());

            // same frame for both listings, only summation order differs
            let metrics = PolygonMetrics::new(Projector::ApproximateFallback);
            let a = metrics.area(&points);
            let b = metrics.area(&rotated);
            prop_assert!((a - b).abs() <= 1e-6 + 1e-9 * a, "{} vs {}", a, b);
        }
    }
}
