//! Staking state machine
//!
//! Phases: `Idle` → `SingleAnchor` (staking on, no bearing yet) → `Tracking`
//! (the second point staked in this session fixed a running bearing). Baseline selection runs
//! as an orthogonal sub-state. Every operation is synchronous; a rejected
//! point leaves the session exactly as it was.

use crate::algorithms::geodesy::{bearing, distance, normalize_angle, signed_angle_difference};
use crate::core::{GeoPoint, PointId, PointKind, TurnDirection, DEFAULT_CORNER_ANGLE_DEG};
use crate::staking::baseline::{snap_to_segment, Baseline};
use crate::staking::guidance::{cross_track, CrossTrack};
use crate::staking::session::{BaselineState, StakingPhase, StakingSession};

/// What happened to a point offered to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum StakeOutcome {
    /// Ready to append, derived fields filled in
    Accepted(GeoPoint),
    /// Moved onto the active baseline and tagged intermediate
    Snapped { point: GeoPoint, t: f64 },
    /// Strict collinearity violated; nothing may be appended
    Rejected {
        error_degrees: f64,
        tolerance_degrees: f64,
        turn_direction: TurnDirection,
    },
}

impl StakeOutcome {
    pub fn point(&self) -> Option<&GeoPoint> {
        match self {
            StakeOutcome::Accepted(point) | StakeOutcome::Snapped { point, .. } => Some(point),
            StakeOutcome::Rejected { .. } => None,
        }
    }

    pub fn into_point(self) -> Option<GeoPoint> {
        match self {
            StakeOutcome::Accepted(point) | StakeOutcome::Snapped { point, .. } => Some(point),
            StakeOutcome::Rejected { .. } => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, StakeOutcome::Rejected { .. })
    }
}

/// Angular deviation of the leg `from → (lat, lng)` from a reference bearing
///
/// Returns the absolute error in degrees and the side. A zero-length leg or
/// non-finite input gives `(0, Left)`.
pub fn collinearity_error(reference_bearing: f64, from: &GeoPoint, lat: f64, lng: f64) -> (f64, TurnDirection) {
    let d = distance(from.lat, from.lng, lat, lng);
    if d == 0.0 || !reference_bearing.is_finite() {
        return (0.0, TurnDirection::Left);
    }
    let achieved = bearing(from.lat, from.lng, lat, lng);
    let diff = signed_angle_difference(reference_bearing, achieved);
    (diff.abs(), TurnDirection::from_signed_difference(diff))
}

/// Staking state machine over a borrowed point list
#[derive(Debug, Clone, Default)]
pub struct StakingEngine {
    session: StakingSession,
}

impl StakingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: StakingSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &StakingSession {
        &self.session
    }

    pub fn phase(&self) -> StakingPhase {
        self.session.phase()
    }

    pub fn activate(&mut self) {
        if !self.session.active {
            self.session.active = true;
            self.session.staked_count = 0;
            log::debug!("staking activated");
        }
    }

    /// Switch staking off; target, baseline and running bearing are forgotten
    pub fn deactivate(&mut self) {
        if self.session.active {
            log::debug!("staking deactivated after {} points", self.session.staked_count);
        }
        self.session.active = false;
        self.session.reset_line();
    }

    /// Flip staking on/off, returning the new state
    pub fn toggle(&mut self) -> bool {
        if self.session.active {
            self.deactivate();
        } else {
            self.activate();
        }
        self.session.active
    }

    /// Clear target, baseline and running bearing while staying active
    pub fn clear(&mut self) {
        self.session.reset_line();
    }

    pub fn set_target_bearing(&mut self, target: Option<f64>) {
        self.session.target_bearing = target.filter(|b| b.is_finite()).map(normalize_angle);
    }

    pub fn set_strictness(&mut self, strict: bool, tolerance_degrees: f64) {
        self.session.strict_collinearity = strict;
        if tolerance_degrees.is_finite() && tolerance_degrees >= 0.0 {
            self.session.tolerance_degrees = tolerance_degrees;
        }
    }

    /// Rotate the running bearing at a corner; returns the new bearing
    ///
    /// `None` while no bearing has been established. No point is added.
    pub fn turn_corner(&mut self, direction: TurnDirection, angle_degrees: Option<f64>) -> Option<f64> {
        let current = self.session.current_bearing?;
        let angle = angle_degrees.filter(|a| a.is_finite()).unwrap_or(DEFAULT_CORNER_ANGLE_DEG);
        let rotated = match direction {
            TurnDirection::Right => normalize_angle(current + angle),
            TurnDirection::Left => normalize_angle(current - angle),
        };
        log::debug!("corner turn {:?} {}: bearing {:.2} -> {:.2}", direction, angle, current, rotated);
        self.session.current_bearing = Some(rotated);
        Some(rotated)
    }

    /// Feed a point selection into the baseline sub-state
    ///
    /// First selection arms the start, the second sets the segment, any further
    /// selection starts over from the newly selected point.
    pub fn select_baseline_point(&mut self, id: &PointId, points: &[GeoPoint]) -> &BaselineState {
        let Some(selected) = points.iter().find(|p| &p.id == id) else {
            log::warn!("baseline selection of unknown point {}", id);
            return &self.session.baseline;
        };

        let next = match std::mem::take(&mut self.session.baseline) {
            BaselineState::Armed { start } => match points.iter().find(|p| p.id == start) {
                Some(start_point) => {
                    let baseline = Baseline::between(start_point, selected);
                    log::debug!(
                        "baseline set {} -> {} ({:.2} m at {:.2} deg)",
                        baseline.start,
                        baseline.end,
                        baseline.length_m,
                        baseline.bearing
                    );
                    BaselineState::Set(baseline)
                }
                None => BaselineState::Armed { start: id.clone() },
            },
            BaselineState::None | BaselineState::Set(_) => BaselineState::Armed { start: id.clone() },
        };
        self.session.baseline = next;
        &self.session.baseline
    }

    pub fn clear_baseline(&mut self) {
        self.session.baseline = BaselineState::None;
    }

    /// Offer a new point that would follow `previous`
    ///
    /// The caller appends the returned point; on rejection neither the session
    /// nor anything the caller holds may change.
    pub fn stake(&mut self, previous: &[GeoPoint], candidate: GeoPoint) -> StakeOutcome {
        let mut point = candidate;
        point.clear_derived();

        if !point.is_valid() {
            log::warn!("point {} has invalid coordinates, staking skipped", point.id);
            return StakeOutcome::Accepted(point);
        }
        if !self.session.active {
            return StakeOutcome::Accepted(with_leg(point, previous));
        }

        let mut baseline_lost = false;
        if let BaselineState::Set(baseline) = &self.session.baseline {
            match baseline.endpoints(previous) {
                Some((start, end)) => {
                    let snap = snap_to_segment(start, end, point.lat, point.lng);
                    point.lat = snap.lat;
                    point.lng = snap.lng;
                    point.kind = PointKind::Intermediate;
                    self.session.staked_count += 1;
                    log::info!("point {} snapped onto baseline at t={:.3}", point.id, snap.t);
                    return StakeOutcome::Snapped {
                        point: with_leg(point, previous),
                        t: snap.t,
                    };
                }
                None => {
                    log::warn!("baseline {} -> {} lost an endpoint", baseline.start, baseline.end);
                    baseline_lost = true;
                }
            }
        }

        if matches!(point.kind, PointKind::Gps | PointKind::Manual) {
            point.kind = PointKind::Staked;
        }

        let Some(prev) = last_valid(previous) else {
            self.accept(baseline_lost);
            return StakeOutcome::Accepted(point);
        };

        let leg_bearing = bearing(prev.lat, prev.lng, point.lat, point.lng);
        let leg_distance = distance(prev.lat, prev.lng, point.lat, point.lng);

        if let Some(reference) = self.session.reference_bearing() {
            let (error, turn) = collinearity_error(reference, prev, point.lat, point.lng);
            if self.session.strict_collinearity && error > self.session.tolerance_degrees {
                log::info!(
                    "point {} rejected: {:.2} deg off line (tolerance {:.2})",
                    point.id,
                    error,
                    self.session.tolerance_degrees
                );
                return StakeOutcome::Rejected {
                    error_degrees: error,
                    tolerance_degrees: self.session.tolerance_degrees,
                    turn_direction: turn,
                };
            }
            point.collinearity_error = Some(error);
            point.turn_direction = Some(turn);
        }

        point.bearing_from_previous = Some(leg_bearing);
        point.distance_from_previous = Some(leg_distance);

        // the line needs two points staked in this session
        if self.session.current_bearing.is_none() && self.session.staked_count >= 1 && leg_distance > 0.0 {
            log::debug!("staking line established at {:.2} deg", leg_bearing);
            self.session.current_bearing = Some(leg_bearing);
        }
        self.accept(baseline_lost);
        StakeOutcome::Accepted(point)
    }

    fn accept(&mut self, baseline_lost: bool) {
        if baseline_lost {
            self.session.baseline = BaselineState::None;
        }
        self.session.staked_count += 1;
    }

    /// Live offset of a fix from the line leaving the last point
    ///
    /// `None` without a last point or without any reference bearing.
    pub fn guidance(&self, previous: &[GeoPoint], lat: f64, lng: f64) -> Option<CrossTrack> {
        let origin = last_valid(previous)?;
        let reference = self.session.reference_bearing()?;
        Some(cross_track(origin.lat, origin.lng, reference, lat, lng))
    }
}

fn last_valid(points: &[GeoPoint]) -> Option<&GeoPoint> {
    points.iter().rev().find(|p| p.is_valid())
}

fn with_leg(mut point: GeoPoint, previous: &[GeoPoint]) -> GeoPoint {
    if let Some(prev) = last_valid(previous) {
        point.bearing_from_previous = Some(bearing(prev.lat, prev.lng, point.lat, point.lng));
        point.distance_from_previous = Some(distance(prev.lat, prev.lng, point.lat, point.lng));
    }
    point
}
