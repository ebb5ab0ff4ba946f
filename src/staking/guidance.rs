//! Live guidance relative to a directional staking line

use crate::algorithms::geodesy::{bearing, distance, signed_angle_difference};
use crate::core::TurnDirection;
use serde::{Deserialize, Serialize};

/// Offset of a live fix from the line leaving `origin` along a target bearing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossTrack {
    /// Signed perpendicular offset (m), positive to the right of the line
    pub offset_m: f64,
    /// Which side of the line the fix is on
    pub side: TurnDirection,
    /// Distance travelled along the line from the origin (m), negative behind it
    pub along_track_m: f64,
    pub distance_to_fix_m: f64,
    pub bearing_to_fix: f64,
    /// Signed angle from the target bearing to the fix (degrees)
    pub bearing_difference: f64,
}

impl CrossTrack {
    pub fn neutral() -> Self {
        Self {
            offset_m: 0.0,
            side: TurnDirection::Left,
            along_track_m: 0.0,
            distance_to_fix_m: 0.0,
            bearing_to_fix: 0.0,
            bearing_difference: 0.0,
        }
    }

    pub fn magnitude_m(&self) -> f64 {
        self.offset_m.abs()
    }
}

/// Cross-track offset `distance(origin, fix) * sin(bearing difference)`
///
/// Coincident origin and fix, or non-finite input, give the neutral result.
pub fn cross_track(
    origin_lat: f64,
    origin_lng: f64,
    target_bearing: f64,
    fix_lat: f64,
    fix_lng: f64,
) -> CrossTrack {
    let d = distance(origin_lat, origin_lng, fix_lat, fix_lng);
    if d == 0.0 || !target_bearing.is_finite() {
        return CrossTrack::neutral();
    }

    let to_fix = bearing(origin_lat, origin_lng, fix_lat, fix_lng);
    let diff = signed_angle_difference(target_bearing, to_fix);
    let offset = d * diff.to_radians().sin();
    let along = d * diff.to_radians().cos();

    CrossTrack {
        offset_m: offset,
        side: TurnDirection::from_signed_difference(diff),
        along_track_m: along,
        distance_to_fix_m: d,
        bearing_to_fix: to_fix,
        bearing_difference: diff,
    }
}
